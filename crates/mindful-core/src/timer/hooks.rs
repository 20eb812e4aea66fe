//! Callback and collaborator contracts around the session timer.
//!
//! Only the listener is part of the engine's observable behaviour. The
//! keep-alive and completion-scheduler hooks are best-effort: the timer
//! stays accurate when they are missing or fail.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HookError;
use crate::events::Event;

/// Engine cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// How often the background ticker fires. `None` disables it and leaves
    /// driving [`super::SessionTimer::tick`] to the caller.
    pub tick_interval: Option<Duration>,
    /// Minimum gap between re-persists while running.
    pub persist_interval: Duration,
    /// Re-read the persisted record on every tick and follow pauses, stops
    /// and restarts written by another process sharing the store. Leave off
    /// when this engine is the store's only writer.
    pub follow_store: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Some(Duration::from_secs(1)),
            persist_interval: Duration::from_secs(15),
            follow_store: false,
        }
    }
}

/// Progress snapshot handed to [`TimerListener::on_tick`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickUpdate {
    pub session_id: String,
    pub remaining_seconds: u64,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The timer reached zero while this process was running.
    Natural,
    /// The session ran out while the process was suspended or dead, and was
    /// found finished during recovery.
    ElapsedWhileAway,
}

/// Delivered exactly once per session that runs to its end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompletion {
    pub session_id: String,
    pub total_duration_seconds: u64,
    pub completed_at: DateTime<Utc>,
    pub reason: CompletionReason,
}

/// UI-facing callbacks. All default to no-ops.
pub trait TimerListener: Send + Sync {
    /// At most once per tick interval while running.
    fn on_tick(&self, _update: &TickUpdate) {}

    /// Exactly once per session that reaches its end.
    fn on_complete(&self, _completion: &SessionCompletion) {}

    /// Every state change (start, pause, resume, stop, recovery, completion).
    fn on_event(&self, _event: &Event) {}
}

/// Keeps the process schedulable while a session runs (silent audio, a
/// foreground service, ...).
#[async_trait]
pub trait KeepAlive: Send + Sync {
    async fn notify_started(&self) -> Result<(), HookError>;

    async fn notify_stopped(&self) -> Result<(), HookError>;
}

/// Opaque handle returned by a [`CompletionScheduler`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleHandle(pub String);

/// Fires a user-visible "session finished" signal at an instant, even if
/// this process is suspended by then.
#[async_trait]
pub trait CompletionScheduler: Send + Sync {
    async fn schedule_at(
        &self,
        at: DateTime<Utc>,
        token: &str,
    ) -> Result<ScheduleHandle, HookError>;

    async fn cancel(&self, handle: ScheduleHandle) -> Result<(), HookError>;
}

/// Listener that forwards to closures; handy for embedding and tests.
pub struct FnListener<T, C>
where
    T: Fn(&TickUpdate) + Send + Sync,
    C: Fn(&SessionCompletion) + Send + Sync,
{
    on_tick: T,
    on_complete: C,
}

impl<T, C> FnListener<T, C>
where
    T: Fn(&TickUpdate) + Send + Sync,
    C: Fn(&SessionCompletion) + Send + Sync,
{
    pub fn new(on_tick: T, on_complete: C) -> Self {
        Self {
            on_tick,
            on_complete,
        }
    }
}

impl<T, C> TimerListener for FnListener<T, C>
where
    T: Fn(&TickUpdate) + Send + Sync,
    C: Fn(&SessionCompletion) + Send + Sync,
{
    fn on_tick(&self, update: &TickUpdate) {
        (self.on_tick)(update)
    }

    fn on_complete(&self, completion: &SessionCompletion) {
        (self.on_complete)(completion)
    }
}
