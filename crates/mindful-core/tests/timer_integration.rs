//! Integration tests for the session timer.
//!
//! Suspension is simulated by moving a `ManualClock` forward; a process
//! kill is simulated by dropping the timer and building a new one over the
//! same store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use mindful_core::storage::{KeyValueStore, MemoryStore, TIMER_STATE_KEY};
use mindful_core::timer::{
    CompletionScheduler, KeepAlive, ScheduleHandle, SessionTimerState,
};
use mindful_core::{
    CompletionReason, Event, HookError, ManualClock, RecoveryOutcome, SessionCompletion,
    SessionTimer, TickUpdate, TimerConfig, TimerListener, TimerPhase,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 6, 30, 0).unwrap()
}

fn manual_ticks() -> TimerConfig {
    TimerConfig {
        tick_interval: None,
        persist_interval: Duration::from_secs(15),
        follow_store: false,
    }
}

#[derive(Default)]
struct Recorder {
    ticks: Mutex<Vec<TickUpdate>>,
    completions: Mutex<Vec<SessionCompletion>>,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn completions(&self) -> Vec<SessionCompletion> {
        self.completions.lock().unwrap().clone()
    }

    fn tick_count(&self) -> usize {
        self.ticks.lock().unwrap().len()
    }
}

impl TimerListener for Recorder {
    fn on_tick(&self, update: &TickUpdate) {
        self.ticks.lock().unwrap().push(update.clone());
    }

    fn on_complete(&self, completion: &SessionCompletion) {
        self.completions.lock().unwrap().push(completion.clone());
    }

    fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Harness {
    clock: ManualClock,
    store: Arc<MemoryStore>,
    recorder: Arc<Recorder>,
    timer: SessionTimer,
}

impl Harness {
    fn new() -> Self {
        let clock = ManualClock::new(t0());
        let store = Arc::new(MemoryStore::new());
        Self::over(clock, store)
    }

    fn over(clock: ManualClock, store: Arc<MemoryStore>) -> Self {
        let recorder = Arc::new(Recorder::default());
        let timer = SessionTimer::builder(Arc::new(clock.clone()), store.clone())
            .config(manual_ticks())
            .listener(recorder.clone())
            .build();
        Self {
            clock,
            store,
            recorder,
            timer,
        }
    }

    /// Drop the in-memory engine and start a fresh one over the same store.
    fn restart(self) -> Self {
        Self::over(self.clock, self.store)
    }

    fn persisted(&self) -> Option<SessionTimerState> {
        self.store
            .load(TIMER_STATE_KEY)
            .unwrap()
            .map(|bytes| SessionTimerState::decode(&bytes).unwrap())
    }
}

#[tokio::test]
async fn remaining_counts_only_run_segments() {
    let h = Harness::new();
    h.timer.start(600).await.unwrap();

    h.clock.advance_secs(100);
    h.timer.pause().await.unwrap();
    h.clock.advance_secs(3_000);
    h.timer.resume_from_pause().await.unwrap();
    h.clock.advance_secs(50);
    h.timer.pause().await.unwrap();
    h.clock.advance_secs(20);
    h.timer.resume_from_pause().await.unwrap();
    h.clock.advance_secs(25);

    assert_eq!(h.timer.elapsed_seconds(), 175);
    assert_eq!(h.timer.remaining_seconds(), 425);
    assert_eq!(h.recorder.tick_count(), 0);
}

#[tokio::test]
async fn restart_while_running_keeps_remaining_time() {
    let h = Harness::new();
    let id = h.timer.start(900).await.unwrap();
    h.clock.advance_secs(200);

    let h = h.restart();
    assert!(!h.timer.is_active());
    h.clock.advance_secs(300);

    assert!(h.timer.resume_from_persisted_state().await);
    assert_eq!(h.timer.current_session_id(), Some(id));
    assert_eq!(h.timer.remaining_seconds(), 400);
    assert_eq!(h.timer.phase(), TimerPhase::Running);
}

#[tokio::test]
async fn restart_while_paused_stays_paused() {
    let h = Harness::new();
    h.timer.start(900).await.unwrap();
    h.clock.advance_secs(120);
    h.timer.pause().await.unwrap();

    let h = h.restart();
    h.clock.advance_secs(86_400);

    let outcome = h.timer.recover().await;
    assert!(matches!(
        outcome,
        RecoveryOutcome::Resumed {
            is_paused: true,
            ..
        }
    ));
    assert!(h.timer.is_paused_now());
    assert_eq!(h.timer.remaining_seconds(), 780);

    h.timer.resume_from_pause().await.unwrap();
    h.clock.advance_secs(80);
    assert_eq!(h.timer.remaining_seconds(), 700);
}

#[tokio::test]
async fn session_finished_while_away_completes_once() {
    let h = Harness::new();
    let id = h.timer.start(600).await.unwrap();
    h.clock.advance_secs(60);

    let h = h.restart();
    h.clock.advance_secs(3_600);

    match h.timer.recover().await {
        RecoveryOutcome::CompletedWhileAway(completion) => {
            assert_eq!(completion.session_id, id);
            assert_eq!(completion.reason, CompletionReason::ElapsedWhileAway);
            assert_eq!(completion.completed_at, t0() + chrono::Duration::seconds(600));
        }
        other => panic!("expected CompletedWhileAway, got {other:?}"),
    }
    assert_eq!(h.recorder.completions().len(), 1);
    assert!(!h.timer.is_active());
    assert!(h.persisted().is_none());

    assert_eq!(h.timer.recover().await, RecoveryOutcome::NothingToRecover);
    assert_eq!(h.recorder.completions().len(), 1);
}

#[tokio::test]
async fn exactly_at_duration_counts_as_finished() {
    let h = Harness::new();
    h.timer.start(300).await.unwrap();
    let h = h.restart();
    h.clock.advance_secs(300);
    assert!(!h.timer.resume_from_persisted_state().await);
    assert!(h.persisted().is_none());
}

#[tokio::test]
async fn nothing_persisted_means_nothing_to_recover() {
    let h = Harness::new();
    assert_eq!(h.timer.recover().await, RecoveryOutcome::NothingToRecover);
    assert_eq!(h.timer.phase(), TimerPhase::Idle);
}

#[tokio::test]
async fn corrupt_state_is_discarded() {
    let h = Harness::new();
    h.store.save(TIMER_STATE_KEY, b"{\"sessionId\": 12").unwrap();
    assert!(!h.timer.resume_from_persisted_state().await);
    assert!(!h.store.contains(TIMER_STATE_KEY));

    let mut bogus = SessionTimerState::new("x".into(), t0(), 60);
    bogus.elapsed_before_pause_seconds = 5_000;
    bogus.is_paused = true;
    bogus.paused_at_timestamp = Some(t0());
    h.store
        .save(TIMER_STATE_KEY, &serde_json::to_vec(&bogus).unwrap())
        .unwrap();
    assert_eq!(h.timer.recover().await, RecoveryOutcome::NothingToRecover);
    assert!(h.recorder.completions().is_empty());
}

#[tokio::test]
async fn unreadable_store_degrades_to_idle() {
    let h = Harness::new();
    h.timer.start(600).await.unwrap();
    let h = h.restart();
    h.store.fail_reads(true);

    assert_eq!(h.timer.recover().await, RecoveryOutcome::NothingToRecover);
    assert!(!h.timer.is_active());
}

#[tokio::test]
async fn failed_writes_keep_memory_authoritative_and_retry_on_tick() {
    let h = Harness::new();
    h.store.fail_writes(true);

    let id = h.timer.start(600).await.unwrap();
    assert!(h.timer.is_active());
    assert!(h.persisted().is_none());

    h.clock.advance_secs(30);
    assert_eq!(h.timer.remaining_seconds(), 570);
    h.timer.tick().await.unwrap();
    assert!(h.persisted().is_none());

    h.store.fail_writes(false);
    h.clock.advance_secs(1);
    h.timer.tick().await.unwrap();
    assert_eq!(h.persisted().unwrap().session_id, id);
}

#[tokio::test]
async fn natural_completion_fires_once() {
    let h = Harness::new();
    let id = h.timer.start(10).await.unwrap();

    h.clock.advance_secs(4);
    let update = h.timer.tick().await.unwrap();
    assert_eq!(update.remaining_seconds, 6);
    assert_eq!(update.elapsed_seconds, 4);
    assert!(h.recorder.completions().is_empty());

    h.clock.advance_secs(30);
    let last = h.timer.tick().await.unwrap();
    assert_eq!(last.remaining_seconds, 0);
    assert!(h.timer.tick().await.is_none());

    let completions = h.recorder.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].session_id, id);
    assert_eq!(completions[0].reason, CompletionReason::Natural);
    assert_eq!(completions[0].completed_at, t0() + chrono::Duration::seconds(10));
    assert!(!h.timer.is_active());
    assert!(h.persisted().is_none());
}

#[tokio::test]
async fn paused_session_never_completes_on_tick() {
    let h = Harness::new();
    h.timer.start(10).await.unwrap();
    h.clock.advance_secs(5);
    h.timer.pause().await.unwrap();
    h.clock.advance_secs(60);
    assert!(h.timer.tick().await.is_none());
    assert!(h.recorder.completions().is_empty());
    assert_eq!(h.timer.remaining_seconds(), 5);
}

#[tokio::test]
async fn pause_after_unnoticed_end_completes_instead() {
    let h = Harness::new();
    let id = h.timer.start(60).await.unwrap();
    // Suspended past the end; no tick ran before the user hit pause.
    h.clock.advance_secs(100);

    let event = h.timer.pause().await;
    assert!(matches!(
        event,
        Some(Event::SessionCompleted {
            reason: CompletionReason::Natural,
            ..
        })
    ));
    assert_eq!(h.timer.phase(), TimerPhase::Idle);
    assert!(h.timer.tick().await.is_none());
    assert!(h.persisted().is_none());

    let completions = h.recorder.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].session_id, id);
    assert_eq!(completions[0].completed_at, t0() + chrono::Duration::seconds(60));

    let events = h.recorder.events.lock().unwrap().clone();
    assert!(!events
        .iter()
        .any(|e| matches!(e, Event::SessionPaused { .. })));

    let h = h.restart();
    assert_eq!(h.timer.recover().await, RecoveryOutcome::NothingToRecover);
    assert!(h.recorder.completions().is_empty());
}

#[tokio::test]
async fn paused_record_at_full_duration_recovers_as_completed() {
    let h = Harness::new();
    let mut state = SessionTimerState::new("overran".into(), t0(), 60);
    state.pause_at(t0() + chrono::Duration::seconds(100));
    h.store
        .save(TIMER_STATE_KEY, &state.encode().unwrap())
        .unwrap();

    let h = h.restart();
    h.clock.advance_secs(500);
    match h.timer.recover().await {
        RecoveryOutcome::CompletedWhileAway(completion) => {
            assert_eq!(completion.session_id, "overran");
            assert_eq!(completion.completed_at, t0() + chrono::Duration::seconds(60));
        }
        other => panic!("expected CompletedWhileAway, got {other:?}"),
    }
    assert_eq!(h.recorder.completions().len(), 1);
    assert!(h.persisted().is_none());
}

#[tokio::test]
async fn start_replaces_active_session() {
    let h = Harness::new();
    let first = h.timer.start(600).await.unwrap();
    h.clock.advance_secs(100);
    let second = h.timer.start(300).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(h.timer.current_session_id(), Some(second.clone()));
    assert_eq!(h.timer.remaining_seconds(), 300);
    assert_eq!(h.persisted().unwrap().session_id, second);

    let events = h.recorder.events.lock().unwrap().clone();
    let replaced = events.iter().find_map(|e| match e {
        Event::SessionStarted {
            replaced_session_id: Some(old),
            ..
        } => Some(old.clone()),
        _ => None,
    });
    assert_eq!(replaced, Some(first));

    h.clock.advance_secs(1_000);
    h.timer.tick().await.unwrap();
    let completions = h.recorder.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].session_id, second);
}

// ── Stop/start race ──────────────────────────────────────────────────

/// Keep-alive hook whose stop notification suspends until released.
#[derive(Default)]
struct GatedKeepAlive {
    entered: Notify,
    release: Notify,
    started: Mutex<u32>,
}

#[async_trait]
impl KeepAlive for GatedKeepAlive {
    async fn notify_started(&self) -> Result<(), HookError> {
        *self.started.lock().unwrap() += 1;
        Ok(())
    }

    async fn notify_stopped(&self) -> Result<(), HookError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn start_during_stop_teardown_survives() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(MemoryStore::new());
    let gate = Arc::new(GatedKeepAlive::default());
    let timer = SessionTimer::builder(Arc::new(clock.clone()), store.clone())
        .config(manual_ticks())
        .keep_alive(gate.clone())
        .build();

    let a = timer.start(600).await.unwrap();
    clock.advance_secs(30);

    let stopping = tokio::spawn({
        let timer = timer.clone();
        async move { timer.stop().await }
    });
    gate.entered.notified().await;

    let b = timer.start(900).await.unwrap();
    gate.release.notify_one();
    let stopped = stopping.await.unwrap().unwrap();

    assert_eq!(stopped.session_id(), Some(a.as_str()));
    assert!(timer.is_active());
    assert_eq!(timer.current_session_id(), Some(b.clone()));
    assert_eq!(timer.remaining_seconds(), 900);

    let persisted = store.load(TIMER_STATE_KEY).unwrap().unwrap();
    assert_eq!(SessionTimerState::decode(&persisted).unwrap().session_id, b);
    // a, b, then b again once a's stop hook returned.
    assert_eq!(*gate.started.lock().unwrap(), 3);
}

#[tokio::test]
async fn concurrent_stops_tear_down_once() {
    let clock = ManualClock::new(t0());
    let gate = Arc::new(GatedKeepAlive::default());
    let timer = SessionTimer::builder(Arc::new(clock.clone()), Arc::new(MemoryStore::new()))
        .config(manual_ticks())
        .keep_alive(gate.clone())
        .build();
    timer.start(60).await.unwrap();

    let first = tokio::spawn({
        let timer = timer.clone();
        async move { timer.stop().await }
    });
    gate.entered.notified().await;

    assert!(timer.stop().await.is_none());
    assert!(!timer.is_active());

    gate.release.notify_one();
    assert!(first.await.unwrap().is_some());
    assert_eq!(timer.phase(), TimerPhase::Idle);
}

/// Scheduler whose cancellation suspends until released.
#[derive(Default)]
struct GatedScheduler {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CompletionScheduler for GatedScheduler {
    async fn schedule_at(
        &self,
        _at: DateTime<Utc>,
        token: &str,
    ) -> Result<ScheduleHandle, HookError> {
        Ok(ScheduleHandle(token.to_string()))
    }

    async fn cancel(&self, _handle: ScheduleHandle) -> Result<(), HookError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[derive(Default)]
struct HookLog(Mutex<Vec<&'static str>>);

#[async_trait]
impl KeepAlive for HookLog {
    async fn notify_started(&self) -> Result<(), HookError> {
        self.0.lock().unwrap().push("started");
        Ok(())
    }

    async fn notify_stopped(&self) -> Result<(), HookError> {
        self.0.lock().unwrap().push("stopped");
        Ok(())
    }
}

#[tokio::test]
async fn keep_alive_stays_on_for_session_started_during_teardown() {
    let clock = ManualClock::new(t0());
    let scheduler = Arc::new(GatedScheduler::default());
    let hooks = Arc::new(HookLog::default());
    let timer = SessionTimer::builder(Arc::new(clock.clone()), Arc::new(MemoryStore::new()))
        .config(manual_ticks())
        .scheduler(scheduler.clone())
        .keep_alive(hooks.clone())
        .build();

    timer.start(600).await.unwrap();
    let stopping = tokio::spawn({
        let timer = timer.clone();
        async move { timer.stop().await }
    });
    scheduler.entered.notified().await;

    let b = timer.start(300).await.unwrap();
    scheduler.release.notify_one();
    assert!(stopping.await.unwrap().is_some());

    assert_eq!(timer.current_session_id(), Some(b));
    assert_eq!(*hooks.0.lock().unwrap(), vec!["started", "started"]);
}

/// Listener whose tick callback blocks until released, holding a session
/// between reaching zero and its teardown.
struct StallingListener {
    entered: std::sync::mpsc::SyncSender<()>,
    release: Mutex<std::sync::mpsc::Receiver<()>>,
    recorder: Recorder,
}

impl TimerListener for StallingListener {
    fn on_tick(&self, update: &TickUpdate) {
        let _ = self.entered.send(());
        let _ = self.release.lock().unwrap().recv();
        self.recorder.on_tick(update);
    }

    fn on_complete(&self, completion: &SessionCompletion) {
        self.recorder.on_complete(completion);
    }

    fn on_event(&self, event: &Event) {
        self.recorder.on_event(event);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commands_while_completing_are_ignored() {
    let (entered_tx, entered_rx) = std::sync::mpsc::sync_channel(1);
    let (release_tx, release_rx) = std::sync::mpsc::channel();
    let listener = Arc::new(StallingListener {
        entered: entered_tx,
        release: Mutex::new(release_rx),
        recorder: Recorder::default(),
    });
    let clock = ManualClock::new(t0());
    let timer = SessionTimer::builder(Arc::new(clock.clone()), Arc::new(MemoryStore::new()))
        .config(manual_ticks())
        .listener(listener.clone())
        .build();

    timer.start(10).await.unwrap();
    clock.advance_secs(10);
    let ticking = tokio::spawn({
        let timer = timer.clone();
        async move { timer.tick().await }
    });
    tokio::task::spawn_blocking(move || entered_rx.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(timer.phase(), TimerPhase::Completed);
    assert!(timer.pause().await.is_none());
    assert!(timer.resume_from_pause().await.is_none());
    assert!(timer.stop().await.is_none());

    release_tx.send(()).unwrap();
    assert_eq!(ticking.await.unwrap().unwrap().remaining_seconds, 0);

    assert_eq!(listener.recorder.completions().len(), 1);
    let events = listener.recorder.events.lock().unwrap().clone();
    assert!(matches!(events.as_slice(), [
        Event::SessionStarted { .. },
        Event::SessionCompleted { .. },
    ]));
    assert_eq!(timer.phase(), TimerPhase::Idle);
}

// ── Shared store ─────────────────────────────────────────────────────

/// An engine as a CLI invocation runs it: other processes write the store.
fn following(clock: &ManualClock, store: Arc<MemoryStore>, recorder: Arc<Recorder>) -> SessionTimer {
    SessionTimer::builder(Arc::new(clock.clone()), store)
        .config(TimerConfig {
            follow_store: true,
            ..manual_ticks()
        })
        .listener(recorder)
        .build()
}

#[tokio::test]
async fn follower_adopts_pause_written_by_another_process() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(MemoryStore::new());
    let watched = Arc::new(Recorder::default());
    let watcher = following(&clock, store.clone(), watched.clone());
    let id = watcher.start(6).await.unwrap();
    clock.advance_secs(2);
    watcher.tick().await.unwrap();

    let other = following(&clock, store.clone(), Arc::new(Recorder::default()));
    assert!(other.resume_from_persisted_state().await);
    other.pause().await.unwrap();

    clock.advance_secs(1);
    assert!(watcher.tick().await.is_none());
    assert!(watcher.is_paused_now());
    assert_eq!(watcher.remaining_seconds(), 4);

    // Long past the original end, and past the persist interval.
    clock.advance_secs(60);
    assert!(watcher.tick().await.is_none());
    assert!(watched.completions().is_empty());

    let stored = SessionTimerState::decode(&store.load(TIMER_STATE_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.session_id, id);
    assert!(stored.is_paused);

    let events = watched.events.lock().unwrap().clone();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::SessionRecovered {
            is_paused: true,
            remaining_seconds: 4,
            ..
        }
    )));
}

#[tokio::test]
async fn follower_drops_session_stopped_by_another_process() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(MemoryStore::new());
    let watched = Arc::new(Recorder::default());
    let watcher = following(&clock, store.clone(), watched.clone());
    watcher.start(6).await.unwrap();

    let other = following(&clock, store.clone(), Arc::new(Recorder::default()));
    other.recover().await;
    other.stop().await.unwrap();

    clock.advance_secs(30);
    assert!(watcher.tick().await.is_none());
    assert!(!watcher.is_active());
    assert!(watched.completions().is_empty());
    assert!(!store.contains(TIMER_STATE_KEY));
}

#[tokio::test]
async fn follower_keeps_memory_after_its_own_failed_write() {
    let clock = ManualClock::new(t0());
    let store = Arc::new(MemoryStore::new());
    let watcher = following(&clock, store.clone(), Arc::new(Recorder::default()));
    store.fail_writes(true);
    watcher.start(60).await.unwrap();

    clock.advance_secs(5);
    assert_eq!(watcher.tick().await.unwrap().remaining_seconds, 55);
    assert!(watcher.is_active());

    store.fail_writes(false);
    clock.advance_secs(1);
    watcher.tick().await.unwrap();
    assert!(store.contains(TIMER_STATE_KEY));
    clock.advance_secs(1);
    assert_eq!(watcher.tick().await.unwrap().remaining_seconds, 53);
}

// ── External collaborators ───────────────────────────────────────────

#[derive(Default)]
struct RecordingScheduler {
    scheduled: Mutex<Vec<(DateTime<Utc>, String)>>,
    cancelled: Mutex<Vec<ScheduleHandle>>,
}

#[async_trait]
impl CompletionScheduler for RecordingScheduler {
    async fn schedule_at(
        &self,
        at: DateTime<Utc>,
        token: &str,
    ) -> Result<ScheduleHandle, HookError> {
        let mut scheduled = self.scheduled.lock().unwrap();
        scheduled.push((at, token.to_string()));
        Ok(ScheduleHandle(format!("notice-{}", scheduled.len())))
    }

    async fn cancel(&self, handle: ScheduleHandle) -> Result<(), HookError> {
        self.cancelled.lock().unwrap().push(handle);
        Ok(())
    }
}

#[tokio::test]
async fn completion_notice_follows_pause_and_resume() {
    let clock = ManualClock::new(t0());
    let scheduler = Arc::new(RecordingScheduler::default());
    let timer = SessionTimer::builder(Arc::new(clock.clone()), Arc::new(MemoryStore::new()))
        .config(manual_ticks())
        .scheduler(scheduler.clone())
        .build();

    let id = timer.start(600).await.unwrap();
    clock.advance_secs(100);
    timer.pause().await.unwrap();
    clock.advance_secs(50);
    timer.resume_from_pause().await.unwrap();
    timer.stop().await.unwrap();

    let scheduled = scheduler.scheduled.lock().unwrap().clone();
    assert_eq!(
        scheduled,
        vec![
            (t0() + chrono::Duration::seconds(600), id.clone()),
            (t0() + chrono::Duration::seconds(650), id),
        ]
    );
    assert_eq!(
        *scheduler.cancelled.lock().unwrap(),
        vec![
            ScheduleHandle("notice-1".into()),
            ScheduleHandle("notice-2".into()),
        ]
    );
}

struct BrokenHooks;

#[async_trait]
impl KeepAlive for BrokenHooks {
    async fn notify_started(&self) -> Result<(), HookError> {
        Err(HookError::Unavailable("no audio session".into()))
    }

    async fn notify_stopped(&self) -> Result<(), HookError> {
        Err(HookError::Failed("already gone".into()))
    }
}

#[async_trait]
impl CompletionScheduler for BrokenHooks {
    async fn schedule_at(&self, _at: DateTime<Utc>, _token: &str) -> Result<ScheduleHandle, HookError> {
        Err(HookError::Unavailable("notifications denied".into()))
    }

    async fn cancel(&self, _handle: ScheduleHandle) -> Result<(), HookError> {
        Err(HookError::Failed("unreachable".into()))
    }
}

#[tokio::test]
async fn failing_hooks_do_not_affect_timing() {
    let clock = ManualClock::new(t0());
    let hooks = Arc::new(BrokenHooks);
    let timer = SessionTimer::builder(Arc::new(clock.clone()), Arc::new(MemoryStore::new()))
        .config(manual_ticks())
        .keep_alive(hooks.clone())
        .scheduler(hooks)
        .build();

    timer.start(120).await.unwrap();
    clock.advance_secs(45);
    timer.pause().await.unwrap();
    timer.resume_from_pause().await.unwrap();
    clock.advance_secs(15);
    assert_eq!(timer.remaining_seconds(), 60);
    assert!(timer.stop().await.is_some());
    assert!(!timer.is_active());
}

// ── Background ticker ────────────────────────────────────────────────

fn ticking(clock: &ManualClock, recorder: Arc<Recorder>) -> SessionTimer {
    SessionTimer::builder(Arc::new(clock.clone()), Arc::new(MemoryStore::new()))
        .config(TimerConfig {
            tick_interval: Some(Duration::from_secs(1)),
            persist_interval: Duration::from_secs(15),
            follow_store: false,
        })
        .listener(recorder)
        .build()
}

#[tokio::test(start_paused = true)]
async fn ticker_detects_completion_after_suspension() {
    let clock = ManualClock::new(t0());
    let recorder = Arc::new(Recorder::default());
    let timer = ticking(&clock, recorder.clone());

    timer.start(3).await.unwrap();
    // The process was "asleep" for ten seconds before the next tick.
    clock.advance_secs(10);
    tokio::time::sleep(Duration::from_millis(1_100)).await;

    let completions = recorder.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].completed_at, t0() + chrono::Duration::seconds(3));
    assert!(!timer.is_active());
}

#[tokio::test(start_paused = true)]
async fn ticker_stops_while_paused() {
    let clock = ManualClock::new(t0());
    let recorder = Arc::new(Recorder::default());
    let timer = ticking(&clock, recorder.clone());

    timer.start(600).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(recorder.tick_count(), 2);

    timer.pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(recorder.tick_count(), 2);

    timer.resume_from_pause().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(recorder.tick_count(), 3);
}

// ── Properties ───────────────────────────────────────────────────────

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #[test]
        fn remaining_ignores_tick_count(
            segments in prop::collection::vec((0u64..500, 0u64..5_000, 0usize..5), 1..8)
        ) {
            block_on(async {
                let h = Harness::new();
                let total = 10_000;
                h.timer.start(total).await.unwrap();

                let mut ran = 0;
                for (run, idle, ticks) in &segments {
                    for _ in 0..*ticks {
                        h.timer.tick().await;
                    }
                    h.clock.advance_secs(*run as i64);
                    ran += run;
                    h.timer.pause().await.unwrap();
                    h.clock.advance_secs(*idle as i64);
                    h.timer.resume_from_pause().await.unwrap();
                }
                assert_eq!(h.timer.remaining_seconds(), total - ran);
            });
        }

        #[test]
        fn recovery_matches_uninterrupted_run(
            before in 0i64..1_000,
            paused in any::<bool>(),
            gap in 0i64..1_000,
        ) {
            block_on(async {
                let total = 3_000;
                let killed = Harness::new();
                let survivor = Harness::over(killed.clock.clone(), Arc::new(MemoryStore::new()));
                killed.timer.start(total).await.unwrap();
                survivor.timer.start(total).await.unwrap();

                killed.clock.advance_secs(before);
                if paused {
                    killed.timer.pause().await.unwrap();
                    survivor.timer.pause().await.unwrap();
                }

                let revived = killed.restart();
                revived.clock.advance_secs(gap);
                assert!(revived.timer.resume_from_persisted_state().await);
                assert_eq!(
                    revived.timer.remaining_seconds(),
                    survivor.timer.remaining_seconds()
                );
            });
        }
    }
}
