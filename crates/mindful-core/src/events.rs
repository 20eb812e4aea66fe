use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{CompletionReason, TimerPhase};

/// Every state change of the session timer produces an Event.
/// The CLI prints them; embedders can forward them to a UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        total_duration_seconds: u64,
        /// Id of the session this start replaced, if one was active.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replaced_session_id: Option<String>,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: String,
        elapsed_seconds: u64,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: String,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Ended before (or exactly at) its natural completion.
    SessionStopped {
        session_id: String,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        total_duration_seconds: u64,
        reason: CompletionReason,
        at: DateTime<Utc>,
    },
    /// A persisted session was re-adopted after a restart.
    SessionRecovered {
        session_id: String,
        remaining_seconds: u64,
        is_paused: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerPhase,
        session_id: Option<String>,
        remaining_seconds: u64,
        elapsed_seconds: u64,
        total_duration_seconds: u64,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Event::SessionStarted { session_id, .. }
            | Event::SessionPaused { session_id, .. }
            | Event::SessionResumed { session_id, .. }
            | Event::SessionStopped { session_id, .. }
            | Event::SessionCompleted { session_id, .. }
            | Event::SessionRecovered { session_id, .. } => Some(session_id),
            Event::StateSnapshot { session_id, .. } => session_id.as_deref(),
        }
    }
}
