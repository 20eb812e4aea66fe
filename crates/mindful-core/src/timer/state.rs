//! The persisted record of the single active session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::elapsed_secs;

/// Everything needed to re-derive elapsed time after a process restart.
///
/// Overwritten in place on every state change; `start` replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimerState {
    pub session_id: String,
    /// Origin of the current run-segment.
    pub start_timestamp: DateTime<Utc>,
    pub total_duration_seconds: u64,
    /// Elapsed time accumulated across all finished run-segments.
    pub elapsed_before_pause_seconds: u64,
    pub is_paused: bool,
    #[serde(default)]
    pub paused_at_timestamp: Option<DateTime<Utc>>,
}

impl SessionTimerState {
    pub fn new(session_id: String, now: DateTime<Utc>, total_duration_seconds: u64) -> Self {
        Self {
            session_id,
            start_timestamp: now,
            total_duration_seconds,
            elapsed_before_pause_seconds: 0,
            is_paused: false,
            paused_at_timestamp: None,
        }
    }

    /// Elapsed session time at `now`, never derived from tick counts.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> u64 {
        if self.is_paused {
            self.elapsed_before_pause_seconds
        } else {
            self.elapsed_before_pause_seconds
                .saturating_add(elapsed_secs(self.start_timestamp, now))
        }
    }

    pub fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        self.total_duration_seconds
            .saturating_sub(self.elapsed_at(now))
    }

    pub fn is_finished_at(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_at(now) >= self.total_duration_seconds
    }

    /// Close the current run-segment.
    ///
    /// A segment that ran past the end is cut at the zero crossing, so the
    /// record stays valid and reads as finished.
    pub fn pause_at(&mut self, now: DateTime<Utc>) {
        let elapsed = self.elapsed_at(now);
        let overrun = elapsed.saturating_sub(self.total_duration_seconds);
        self.elapsed_before_pause_seconds = elapsed - overrun;
        self.is_paused = true;
        self.paused_at_timestamp = Some(
            i64::try_from(overrun)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|back| now.checked_sub_signed(back))
                .unwrap_or(now),
        );
    }

    /// Open a new run-segment starting at `now`.
    pub fn resume_at(&mut self, now: DateTime<Utc>) {
        self.start_timestamp = now;
        self.is_paused = false;
        self.paused_at_timestamp = None;
    }

    /// Why this record cannot be trusted, if it can't.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_id.trim().is_empty() {
            return Err("empty session id".into());
        }
        if self.total_duration_seconds == 0 {
            return Err("zero total duration".into());
        }
        if self.elapsed_before_pause_seconds > self.total_duration_seconds {
            return Err(format!(
                "elapsed {}s exceeds total {}s",
                self.elapsed_before_pause_seconds, self.total_duration_seconds
            ));
        }
        if self.is_paused != self.paused_at_timestamp.is_some() {
            return Err("paused flag disagrees with paused_at".into());
        }
        Ok(())
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode and validate in one step; anything unusable is an error string.
    pub fn decode(bytes: &[u8]) -> Result<Self, String> {
        let state: Self = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        state.validate()?;
        Ok(state)
    }
}
