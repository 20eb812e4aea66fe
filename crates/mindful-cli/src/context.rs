//! Per-invocation wiring: database, config and a timer that logs every
//! session it sees complete.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use mindful_core::storage::ACTIVE_SESSION_META_KEY;
use mindful_core::timer::TimerListener;
use mindful_core::{
    CompletedSession, Config, Database, Event, KeyValueStore, NewCompletedSession,
    RecoveryOutcome, SessionCompletion, SessionTimer, SystemClock, TickUpdate,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Log details for the active session, captured at `session start` and
/// consumed when it completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub session_id: String,
    pub title: String,
    pub language_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,
}

impl SessionMeta {
    pub fn save(&self, store: &dyn KeyValueStore) -> CliResult {
        store.save(ACTIVE_SESSION_META_KEY, &serde_json::to_vec(self)?)?;
        Ok(())
    }

    fn take(store: &dyn KeyValueStore) -> Option<Self> {
        let bytes = match store.load(ACTIVE_SESSION_META_KEY) {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(error = %e, "could not read session metadata");
                return None;
            }
        };
        Self::clear(store);
        serde_json::from_slice(&bytes)
            .map_err(|e| tracing::warn!(error = %e, "ignoring undecodable session metadata"))
            .ok()
    }

    pub fn clear(store: &dyn KeyValueStore) {
        if let Err(e) = store.remove(ACTIVE_SESSION_META_KEY) {
            tracing::warn!(error = %e, "could not clear session metadata");
        }
    }
}

/// Forwards completions and events to the invocation and optionally
/// prints ticks.
struct CliListener {
    completions: mpsc::UnboundedSender<SessionCompletion>,
    events: mpsc::UnboundedSender<Event>,
    print_ticks: bool,
}

impl TimerListener for CliListener {
    fn on_tick(&self, update: &TickUpdate) {
        if self.print_ticks {
            if let Ok(line) = serde_json::to_string(update) {
                println!("{line}");
            }
        }
    }

    fn on_complete(&self, completion: &SessionCompletion) {
        // Receivers live as long as the context.
        let _ = self.completions.send(completion.clone());
    }

    fn on_event(&self, event: &Event) {
        let _ = self.events.send(event.clone());
    }
}

pub struct Context {
    pub config: Config,
    pub db: Arc<Database>,
    pub timer: SessionTimer,
    completions: mpsc::UnboundedReceiver<SessionCompletion>,
    events: mpsc::UnboundedReceiver<Event>,
}

impl Context {
    pub fn open(config: Config, print_ticks: bool) -> CliResult<Self> {
        let db = Arc::new(Database::open()?);
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        // Other invocations write the same record while `watch` runs.
        let mut timer_config = config.timer_config();
        timer_config.follow_store = true;
        let timer = SessionTimer::builder(Arc::new(SystemClock), db.clone())
            .config(timer_config)
            .listener(Arc::new(CliListener {
                completions: completion_tx,
                events: event_tx,
                print_ticks,
            }))
            .build();
        Ok(Self {
            config,
            db,
            timer,
            completions,
            events,
        })
    }

    /// Open and recover, for commands that only read the log.
    pub async fn settled(config: Config) -> CliResult<Self> {
        let mut ctx = Self::open(config, false)?;
        if let RecoveryOutcome::CompletedWhileAway(completion) = ctx.recover().await? {
            tracing::debug!(session_id = %completion.session_id, "logged session that completed while away");
        }
        Ok(ctx)
    }

    /// Recover the persisted session. A session that finished while no
    /// process was running is logged here.
    pub async fn recover(&mut self) -> CliResult<RecoveryOutcome> {
        let outcome = self.timer.recover().await;
        self.record_completions()?;
        Ok(outcome)
    }

    /// Follow the running session until it completes and is logged, or
    /// until another invocation pauses or ends it. Ticks are driven here
    /// when the background ticker is disabled.
    pub async fn follow(&mut self) -> CliResult {
        let ticker = self.config.timer_config().tick_interval;
        let mut poll = tokio::time::interval(ticker.unwrap_or(Duration::from_secs(1)));
        loop {
            let delivered = tokio::select! {
                completion = self.completions.recv() => Some(completion),
                _ = poll.tick() => None,
            };
            match delivered {
                Some(Some(completion)) => {
                    self.record(&completion)?;
                    return Ok(());
                }
                Some(None) => return Ok(()),
                None => {
                    if ticker.is_none() {
                        self.timer.tick().await;
                    }
                    if !self.timer.is_active() || self.timer.is_paused_now() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Print every timer event raised so far, oldest first.
    pub fn flush_events(&mut self) -> CliResult<usize> {
        let mut printed = 0;
        while let Ok(event) = self.events.try_recv() {
            emit(&event)?;
            printed += 1;
        }
        Ok(printed)
    }

    /// Log every completion delivered so far.
    pub fn record_completions(&mut self) -> CliResult<Vec<CompletedSession>> {
        let mut logged = Vec::new();
        while let Ok(completion) = self.completions.try_recv() {
            logged.push(self.record(&completion)?);
        }
        Ok(logged)
    }

    fn record(&self, completion: &SessionCompletion) -> CliResult<CompletedSession> {
        let meta = SessionMeta::take(self.db.as_ref())
            .filter(|meta| meta.session_id == completion.session_id);
        let (title, language_code, intention) = match meta {
            Some(meta) => (meta.title, meta.language_code, meta.intention),
            None => (
                self.config.session.default_title.clone(),
                self.config.session.language_code.clone(),
                None,
            ),
        };

        let mut entry = NewCompletedSession::new(
            title,
            completion.completed_at.with_timezone(&Local),
            completion.total_duration_seconds,
            language_code,
        );
        if let Some(intention) = intention {
            entry = entry.with_intention(intention);
        }
        let session = self.db.append_session(entry)?;
        tracing::info!(
            session_id = %completion.session_id,
            log_id = session.id,
            "completed session logged"
        );
        Ok(session)
    }
}

/// One compact JSON document per line.
pub fn emit<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
