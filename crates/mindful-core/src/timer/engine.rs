//! Session timer engine.
//!
//! The engine is a wall-clock-based state machine over a single persisted
//! [`SessionTimerState`]. Elapsed time is never accumulated from ticks: every
//! query recomputes it from the stored timestamps, so missed ticks and a
//! suspended process cause no drift.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |            |
//!           +-> Completed +-> Idle   (stop / natural completion)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let timer = SessionTimer::builder(clock, store).listener(ui).build();
//! timer.resume_from_persisted_state().await; // once, at process start
//! let session_id = timer.start(600).await?;
//! // The background ticker calls `tick()`; callers may also call it directly.
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};

use super::hooks::{
    CompletionReason, CompletionScheduler, KeepAlive, ScheduleHandle, SessionCompletion,
    TickUpdate, TimerConfig, TimerListener,
};
use super::state::SessionTimerState;
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::Event;
use crate::storage::{KeyValueStore, TIMER_STATE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    /// Reached zero; teardown in progress.
    Completed,
}

/// What [`SessionTimer::recover`] found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No record, an unreadable store, or a corrupt record.
    NothingToRecover,
    /// The session was re-adopted and is active again.
    Resumed { session_id: String, is_paused: bool },
    /// The session ran out while the process was away. The completion
    /// listener has already been notified.
    CompletedWhileAway(SessionCompletion),
}

impl RecoveryOutcome {
    pub fn is_resumed(&self) -> bool {
        matches!(self, RecoveryOutcome::Resumed { .. })
    }
}

struct ActiveSession {
    state: SessionTimerState,
    /// In-memory identity of this session; delayed teardown only clears a
    /// session whose epoch still matches.
    epoch: u64,
    /// Identity of the current run-segment; stale tickers exit on mismatch.
    segment: u64,
    schedule: Option<ScheduleHandle>,
    /// Last successful write. `None` forces a re-persist on the next tick.
    persisted_at: Option<DateTime<Utc>>,
    completing: bool,
    stopping: bool,
}

#[derive(Default)]
struct Inner {
    session: Option<ActiveSession>,
    next_token: u64,
}

impl Inner {
    fn token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    fn live(&self) -> Option<&ActiveSession> {
        self.session.as_ref().filter(|s| !s.stopping)
    }

    fn live_mut(&mut self) -> Option<&mut ActiveSession> {
        self.session.as_mut().filter(|s| !s.stopping)
    }

    fn phase(&self) -> TimerPhase {
        match self.session.as_ref() {
            None => TimerPhase::Idle,
            Some(s) if s.completing => TimerPhase::Completed,
            Some(s) if s.stopping => TimerPhase::Idle,
            Some(s) if s.state.is_paused => TimerPhase::Paused,
            Some(_) => TimerPhase::Running,
        }
    }
}

struct Shared {
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    config: TimerConfig,
    listener: Option<Arc<dyn TimerListener>>,
    keep_alive: Option<Arc<dyn KeepAlive>>,
    scheduler: Option<Arc<dyn CompletionScheduler>>,
    inner: Mutex<Inner>,
}

/// Runs exactly one meditation session at a time.
///
/// Cheap to clone; clones drive the same session. `start`, `pause`,
/// `resume_from_pause` and `stop` are serialized through an internal lock
/// that is never held across an await.
#[derive(Clone)]
pub struct SessionTimer {
    shared: Arc<Shared>,
}

pub struct SessionTimerBuilder {
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    config: TimerConfig,
    listener: Option<Arc<dyn TimerListener>>,
    keep_alive: Option<Arc<dyn KeepAlive>>,
    scheduler: Option<Arc<dyn CompletionScheduler>>,
}

impl SessionTimerBuilder {
    pub fn config(mut self, config: TimerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn TimerListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn keep_alive(mut self, keep_alive: Arc<dyn KeepAlive>) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn CompletionScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> SessionTimer {
        SessionTimer {
            shared: Arc::new(Shared {
                clock: self.clock,
                store: self.store,
                config: self.config,
                listener: self.listener,
                keep_alive: self.keep_alive,
                scheduler: self.scheduler,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }
}

/// Outcome of a pause or resume decided under the lock.
enum Transition {
    Paused(Event, Option<ScheduleHandle>),
    Resumed {
        event: Event,
        epoch: u64,
        segment: u64,
        remaining: u64,
    },
    /// The session had already run out; complete it instead.
    Finished(u64, SessionCompletion),
}

enum Recovered {
    Nothing,
    Finished(SessionCompletion),
    Adopted {
        session_id: String,
        segment: u64,
        is_paused: bool,
        remaining_seconds: u64,
        due: Option<DateTime<Utc>>,
    },
}

impl SessionTimer {
    pub fn builder(clock: Arc<dyn Clock>, store: Arc<dyn KeyValueStore>) -> SessionTimerBuilder {
        SessionTimerBuilder {
            clock,
            store,
            config: TimerConfig::default(),
            listener: None,
            keep_alive: None,
            scheduler: None,
        }
    }

    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::builder(clock, store).build()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> TimerPhase {
        self.lock().phase()
    }

    pub fn is_active(&self) -> bool {
        self.lock().live().is_some()
    }

    pub fn is_paused_now(&self) -> bool {
        self.lock().live().is_some_and(|s| s.state.is_paused)
    }

    pub fn current_session_id(&self) -> Option<String> {
        self.lock().live().map(|s| s.state.session_id.clone())
    }

    pub fn remaining_seconds(&self) -> u64 {
        let now = self.now();
        self.lock()
            .live()
            .map(|s| s.state.remaining_at(now))
            .unwrap_or(0)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        let now = self.now();
        self.lock()
            .live()
            .map(|s| s.state.elapsed_at(now).min(s.state.total_duration_seconds))
            .unwrap_or(0)
    }

    pub fn total_duration_seconds(&self) -> u64 {
        self.lock()
            .live()
            .map(|s| s.state.total_duration_seconds)
            .unwrap_or(0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let now = self.now();
        let inner = self.lock();
        let state = inner.phase();
        let session = inner.live();
        let total = session.map(|s| s.state.total_duration_seconds).unwrap_or(0);
        let elapsed = session
            .map(|s| s.state.elapsed_at(now).min(total))
            .unwrap_or(0);
        let progress_pct = if total == 0 {
            0.0
        } else {
            (elapsed as f64 / total as f64 * 100.0).min(100.0)
        };
        Event::StateSnapshot {
            state,
            session_id: session.map(|s| s.state.session_id.clone()),
            remaining_seconds: total - elapsed,
            elapsed_seconds: elapsed,
            total_duration_seconds: total,
            progress_pct,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a new session, replacing any active one.
    ///
    /// # Errors
    /// Rejects a zero duration before touching any state.
    pub async fn start(&self, total_duration_seconds: u64) -> Result<String, ValidationError> {
        if total_duration_seconds == 0 {
            return Err(ValidationError::InvalidDuration { seconds: 0 });
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let now = self.now();
        let (epoch, replaced) = {
            let mut inner = self.lock();
            let epoch = inner.token();
            let replaced = inner.session.take();
            let mut session = ActiveSession {
                state: SessionTimerState::new(session_id.clone(), now, total_duration_seconds),
                epoch,
                segment: epoch,
                schedule: None,
                persisted_at: None,
                completing: false,
                stopping: false,
            };
            self.persist(&mut session, now);
            inner.session = Some(session);
            (epoch, replaced)
        };

        let mut replaced_session_id = None;
        if let Some(previous) = replaced {
            if !previous.stopping {
                tracing::info!(
                    replaced = %previous.state.session_id,
                    session_id = %session_id,
                    "new session replaces the active one"
                );
                replaced_session_id = Some(previous.state.session_id);
            }
            if let Some(handle) = previous.schedule {
                self.cancel_scheduled(handle).await;
            }
        }

        tracing::debug!(session_id = %session_id, total_duration_seconds, "session started");
        self.spawn_ticker(epoch);
        self.notify_started().await;
        self.schedule_completion(
            epoch,
            epoch,
            seconds_after(now, total_duration_seconds),
            &session_id,
        )
        .await;

        self.emit(&Event::SessionStarted {
            session_id: session_id.clone(),
            total_duration_seconds,
            replaced_session_id,
            at: now,
        });
        Ok(session_id)
    }

    /// Close the current run-segment. No-op without a running session.
    ///
    /// A session whose time already ran out (no tick landed since the
    /// deadline) completes instead, and the `SessionCompleted` event is
    /// returned.
    pub async fn pause(&self) -> Option<Event> {
        let now = self.now();
        let transition = {
            let mut inner = self.lock();
            let session = inner
                .live_mut()
                .filter(|s| !s.state.is_paused && !s.completing)?;
            if session.state.is_finished_at(now) {
                session.completing = true;
                Transition::Finished(
                    session.epoch,
                    completion_of(&session.state, now, CompletionReason::Natural),
                )
            } else {
                session.state.pause_at(now);
                self.persist(session, now);
                let event = Event::SessionPaused {
                    session_id: session.state.session_id.clone(),
                    elapsed_seconds: session.state.elapsed_before_pause_seconds,
                    remaining_seconds: session.state.remaining_at(now),
                    at: now,
                };
                Transition::Paused(event, session.schedule.take())
            }
        };

        let (event, handle) = match transition {
            Transition::Paused(event, handle) => (event, handle),
            Transition::Resumed { event, .. } => return Some(event),
            Transition::Finished(epoch, completion) => {
                return Some(self.finish(epoch, completion).await);
            }
        };
        if let Some(handle) = handle {
            self.cancel_scheduled(handle).await;
        }
        tracing::debug!(session_id = ?event.session_id(), "session paused");
        self.emit(&event);
        Some(event)
    }

    /// Open a new run-segment. No-op unless a session is paused.
    pub async fn resume_from_pause(&self) -> Option<Event> {
        let now = self.now();
        let transition = {
            let mut inner = self.lock();
            if !inner
                .live()
                .is_some_and(|s| s.state.is_paused && !s.completing)
            {
                return None;
            }
            let segment = inner.token();
            let session = inner.live_mut()?;
            if session.state.is_finished_at(now) {
                session.completing = true;
                Transition::Finished(
                    session.epoch,
                    completion_of(&session.state, now, CompletionReason::Natural),
                )
            } else {
                session.state.resume_at(now);
                session.segment = segment;
                self.persist(session, now);
                let remaining = session.state.remaining_at(now);
                let event = Event::SessionResumed {
                    session_id: session.state.session_id.clone(),
                    remaining_seconds: remaining,
                    at: now,
                };
                Transition::Resumed {
                    event,
                    epoch: session.epoch,
                    segment,
                    remaining,
                }
            }
        };

        let (event, epoch, segment, remaining) = match transition {
            Transition::Resumed {
                event,
                epoch,
                segment,
                remaining,
            } => (event, epoch, segment, remaining),
            Transition::Paused(event, _) => return Some(event),
            Transition::Finished(epoch, completion) => {
                return Some(self.finish(epoch, completion).await);
            }
        };

        tracing::debug!(session_id = ?event.session_id(), remaining, "session resumed");
        self.spawn_ticker(segment);
        if let Some(session_id) = event.session_id() {
            self.schedule_completion(epoch, segment, seconds_after(now, remaining), session_id)
                .await;
        }
        self.emit(&event);
        Some(event)
    }

    /// End the active session and clear its persisted state.
    pub async fn stop(&self) -> Option<Event> {
        let epoch = self
            .lock()
            .live()
            .filter(|s| !s.completing)
            .map(|s| s.epoch)?;
        let event = self.teardown(epoch).await?;
        self.emit(&event);
        Some(event)
    }

    /// Drive one recomputation. Returns `None` when nothing is running.
    ///
    /// On reaching zero this runs the natural-completion path once: teardown,
    /// then `on_complete`.
    pub async fn tick(&self) -> Option<TickUpdate> {
        self.tick_segment(None).await
    }

    /// Re-adopt or discard the persisted session. Call once at process start.
    pub async fn recover(&self) -> RecoveryOutcome {
        let now = self.now();
        let recovered = {
            let mut inner = self.lock();
            if let Some(active) = inner.live() {
                tracing::debug!(session_id = %active.state.session_id, "session already active; nothing to recover");
                return RecoveryOutcome::Resumed {
                    session_id: active.state.session_id.clone(),
                    is_paused: active.state.is_paused,
                };
            }
            self.load_persisted(&mut inner, now)
        };

        match recovered {
            Recovered::Nothing => RecoveryOutcome::NothingToRecover,
            Recovered::Finished(completion) => {
                tracing::info!(
                    session_id = %completion.session_id,
                    completed_at = %completion.completed_at,
                    "persisted session finished while the process was away"
                );
                self.emit(&Event::SessionCompleted {
                    session_id: completion.session_id.clone(),
                    total_duration_seconds: completion.total_duration_seconds,
                    reason: completion.reason,
                    at: completion.completed_at,
                });
                if let Some(listener) = &self.shared.listener {
                    listener.on_complete(&completion);
                }
                RecoveryOutcome::CompletedWhileAway(completion)
            }
            Recovered::Adopted {
                session_id,
                segment,
                is_paused,
                remaining_seconds,
                due,
            } => {
                tracing::info!(session_id = %session_id, remaining_seconds, is_paused, "recovered persisted session");
                if !is_paused {
                    self.spawn_ticker(segment);
                    self.notify_started().await;
                    self.schedule_completion(segment, segment, due, &session_id)
                        .await;
                }
                self.emit(&Event::SessionRecovered {
                    session_id: session_id.clone(),
                    remaining_seconds,
                    is_paused,
                    at: now,
                });
                RecoveryOutcome::Resumed {
                    session_id,
                    is_paused,
                }
            }
        }
    }

    /// `true` when a persisted session was re-adopted.
    pub async fn resume_from_persisted_state(&self) -> bool {
        self.recover().await.is_resumed()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    fn emit(&self, event: &Event) {
        if let Some(listener) = &self.shared.listener {
            listener.on_event(event);
        }
    }

    fn load_persisted(&self, inner: &mut Inner, now: DateTime<Utc>) -> Recovered {
        let bytes = match self.shared.store.load(TIMER_STATE_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Recovered::Nothing,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted timer state; starting idle");
                return Recovered::Nothing;
            }
        };

        let state = match SessionTimerState::decode(&bytes) {
            Ok(state) => state,
            Err(reason) => {
                tracing::warn!(%reason, "discarding corrupt timer state");
                self.remove_persisted();
                return Recovered::Nothing;
            }
        };

        if state.is_finished_at(now) {
            self.remove_persisted();
            return Recovered::Finished(completion_of(
                &state,
                now,
                CompletionReason::ElapsedWhileAway,
            ));
        }

        let segment = inner.token();
        let remaining_seconds = state.remaining_at(now);
        let adopted = Recovered::Adopted {
            session_id: state.session_id.clone(),
            segment,
            is_paused: state.is_paused,
            remaining_seconds,
            due: seconds_after(now, remaining_seconds),
        };
        inner.session = Some(ActiveSession {
            state,
            epoch: segment,
            segment,
            schedule: None,
            persisted_at: Some(now),
            completing: false,
            stopping: false,
        });
        adopted
    }

    fn persist(&self, session: &mut ActiveSession, now: DateTime<Utc>) {
        let result = session
            .state
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                self.shared
                    .store
                    .save(TIMER_STATE_KEY, &bytes)
                    .map_err(|e| e.to_string())
            });
        match result {
            Ok(()) => session.persisted_at = Some(now),
            Err(error) => {
                tracing::warn!(
                    session_id = %session.state.session_id,
                    %error,
                    "failed to persist timer state; continuing in memory"
                );
                session.persisted_at = None;
            }
        }
    }

    fn persist_due(&self, session: &ActiveSession, now: DateTime<Utc>) -> bool {
        match session.persisted_at {
            None => true,
            Some(at) => (now - at)
                .to_std()
                .map(|since| since >= self.shared.config.persist_interval)
                .unwrap_or(false),
        }
    }

    fn remove_persisted(&self) {
        if let Err(e) = self.shared.store.remove(TIMER_STATE_KEY) {
            tracing::warn!(error = %e, "failed to clear persisted timer state");
        }
    }

    async fn tick_segment(&self, segment: Option<u64>) -> Option<TickUpdate> {
        if self.shared.config.follow_store && !self.follow_store(segment).await {
            return None;
        }
        let now = self.now();
        let (update, completion, epoch) = {
            let mut inner = self.lock();
            let session = inner.live_mut()?;
            if session.state.is_paused || session.completing {
                return None;
            }
            if segment.is_some_and(|seg| seg != session.segment) {
                return None;
            }
            if self.persist_due(session, now) {
                self.persist(session, now);
            }

            let total = session.state.total_duration_seconds;
            let elapsed = session.state.elapsed_at(now).min(total);
            let update = TickUpdate {
                session_id: session.state.session_id.clone(),
                remaining_seconds: total - elapsed,
                elapsed_seconds: elapsed,
            };
            let completion = (elapsed >= total).then(|| {
                session.completing = true;
                completion_of(&session.state, now, CompletionReason::Natural)
            });
            (update, completion, session.epoch)
        };

        if let Some(listener) = &self.shared.listener {
            listener.on_tick(&update);
        }

        if let Some(completion) = completion {
            self.finish(epoch, completion).await;
        }
        Some(update)
    }

    /// Natural-completion path for a session already marked `completing`:
    /// teardown, then `on_complete` exactly once.
    async fn finish(&self, epoch: u64, completion: SessionCompletion) -> Event {
        tracing::debug!(session_id = %completion.session_id, "session reached its end");
        self.teardown(epoch).await;
        let event = Event::SessionCompleted {
            session_id: completion.session_id.clone(),
            total_duration_seconds: completion.total_duration_seconds,
            reason: completion.reason,
            at: completion.completed_at,
        };
        self.emit(&event);
        if let Some(listener) = &self.shared.listener {
            listener.on_complete(&completion);
        }
        event
    }

    /// Pick up a change another process wrote to the shared record.
    /// Returns `false` when the running session is gone or now paused, so
    /// the tick must not go on.
    ///
    /// Memory stays authoritative while our own last write failed, and an
    /// unreadable or undecodable record is ignored.
    async fn follow_store(&self, segment: Option<u64>) -> bool {
        let now = self.now();
        let (event, handle, released) = {
            let mut inner = self.lock();
            let Some(session) = inner.live() else {
                return false;
            };
            if session.state.is_paused
                || session.completing
                || session.persisted_at.is_none()
                || segment.is_some_and(|seg| seg != session.segment)
            {
                return true;
            }
            let stored = match self.shared.store.load(TIMER_STATE_KEY) {
                Ok(Some(bytes)) => match SessionTimerState::decode(&bytes) {
                    Ok(state) => Some(state),
                    Err(reason) => {
                        tracing::warn!(%reason, "ignoring undecodable shared timer state");
                        return true;
                    }
                },
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "could not re-read shared timer state");
                    return true;
                }
            };

            match stored {
                Some(state) if state == session.state => return true,
                None => {
                    let Some(gone) = inner.session.take() else {
                        return false;
                    };
                    tracing::info!(
                        session_id = %gone.state.session_id,
                        "session was ended by another process"
                    );
                    (None, gone.schedule, true)
                }
                Some(state) => {
                    let Some(session) = inner.live_mut() else {
                        return false;
                    };
                    tracing::info!(
                        session_id = %state.session_id,
                        previous = %session.state.session_id,
                        is_paused = state.is_paused,
                        "following session state written by another process"
                    );
                    session.state = state;
                    session.persisted_at = Some(now);
                    let is_paused = session.state.is_paused;
                    let event = Event::SessionRecovered {
                        session_id: session.state.session_id.clone(),
                        remaining_seconds: session.state.remaining_at(now),
                        is_paused,
                        at: now,
                    };
                    let handle = if is_paused {
                        session.schedule.take()
                    } else {
                        None
                    };
                    (Some(event), handle, false)
                }
            }
        };

        if let Some(handle) = handle {
            self.cancel_scheduled(handle).await;
        }
        if released {
            self.notify_stopped().await;
        }
        match event {
            Some(event) => {
                let keep_ticking = matches!(
                    event,
                    Event::SessionRecovered {
                        is_paused: false,
                        ..
                    }
                );
                self.emit(&event);
                keep_ticking
            }
            None => false,
        }
    }

    /// Stop the session with `epoch`, then run the async cleanup with the
    /// lock released. A `start` that lands during cleanup wins: the final
    /// clear only applies if the epoch still matches.
    async fn teardown(&self, epoch: u64) -> Option<Event> {
        let now = self.now();
        let (event, handle) = {
            let mut inner = self.lock();
            let session = inner
                .session
                .as_mut()
                .filter(|s| s.epoch == epoch && !s.stopping)?;
            session.stopping = true;
            self.remove_persisted();
            let event = Event::SessionStopped {
                session_id: session.state.session_id.clone(),
                elapsed_seconds: session
                    .state
                    .elapsed_at(now)
                    .min(session.state.total_duration_seconds),
                at: now,
            };
            (event, session.schedule.take())
        };

        if let Some(handle) = handle {
            self.cancel_scheduled(handle).await;
        }
        // A session started meanwhile owns the keep-alive now.
        if self.holds_epoch(epoch) {
            self.notify_stopped().await;
            if self.superseded(epoch) {
                self.notify_started().await;
            }
        }

        let mut inner = self.lock();
        if inner.session.as_ref().is_some_and(|s| s.epoch == epoch) {
            inner.session = None;
            tracing::debug!(session_id = ?event.session_id(), "session stopped");
        } else {
            tracing::debug!(
                stopped = ?event.session_id(),
                "newer session started during teardown; leaving it in place"
            );
        }
        Some(event)
    }

    fn holds_epoch(&self, epoch: u64) -> bool {
        self.lock().session.as_ref().is_some_and(|s| s.epoch == epoch)
    }

    fn superseded(&self, epoch: u64) -> bool {
        self.lock().live().is_some_and(|s| s.epoch != epoch)
    }

    fn spawn_ticker(&self, segment: u64) {
        let Some(period) = self.shared.config.tick_interval else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no async runtime; ticks must be driven by the caller");
            return;
        };

        let shared = Arc::downgrade(&self.shared);
        runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let timer = SessionTimer { shared };
                if timer.tick_segment(Some(segment)).await.is_none() {
                    break;
                }
            }
        });
    }

    async fn notify_started(&self) {
        if let Some(hook) = &self.shared.keep_alive {
            if let Err(e) = hook.notify_started().await {
                tracing::warn!(error = %e, "keep-alive start hook failed");
            }
        }
    }

    async fn notify_stopped(&self) {
        if let Some(hook) = &self.shared.keep_alive {
            if let Err(e) = hook.notify_stopped().await {
                tracing::warn!(error = %e, "keep-alive stop hook failed");
            }
        }
    }

    async fn cancel_scheduled(&self, handle: ScheduleHandle) {
        if let Some(scheduler) = &self.shared.scheduler {
            if let Err(e) = scheduler.cancel(handle).await {
                tracing::warn!(error = %e, "failed to cancel scheduled completion notice");
            }
        }
    }

    /// Ask the external scheduler for a completion notice and attach the
    /// handle, unless the segment it was computed for is gone by then.
    async fn schedule_completion(
        &self,
        epoch: u64,
        segment: u64,
        due: Option<DateTime<Utc>>,
        session_id: &str,
    ) {
        let (Some(scheduler), Some(due)) = (&self.shared.scheduler, due) else {
            return;
        };
        let handle = match scheduler.schedule_at(due, session_id).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "failed to schedule completion notice");
                return;
            }
        };

        let stale = {
            let mut inner = self.lock();
            match inner.live_mut() {
                Some(s) if s.epoch == epoch && s.segment == segment && !s.state.is_paused => {
                    s.schedule.replace(handle)
                }
                _ => Some(handle),
            }
        };
        if let Some(stale) = stale {
            self.cancel_scheduled(stale).await;
        }
    }
}

fn seconds_after(at: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    at.checked_add_signed(ChronoDuration::try_seconds(secs)?)
}

fn completion_of(
    state: &SessionTimerState,
    now: DateTime<Utc>,
    reason: CompletionReason,
) -> SessionCompletion {
    SessionCompletion {
        session_id: state.session_id.clone(),
        total_duration_seconds: state.total_duration_seconds,
        completed_at: finish_instant(state, now),
        reason,
    }
}

/// The instant the session's remaining time reached zero, capped at `now`.
fn finish_instant(state: &SessionTimerState, now: DateTime<Utc>) -> DateTime<Utc> {
    if state.is_paused {
        return state.paused_at_timestamp.unwrap_or(now);
    }
    let left = state
        .total_duration_seconds
        .saturating_sub(state.elapsed_before_pause_seconds);
    seconds_after(state.start_timestamp, left)
        .map(|due| due.min(now))
        .unwrap_or(now)
}
