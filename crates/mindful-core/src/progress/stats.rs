use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::day_key::DayKey;

/// Summary statistics derived from the session log. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    pub total_sessions: u64,
    pub total_minutes: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Completion time of the last well-formed record in log order.
    pub last_session_date: Option<DateTime<FixedOffset>>,
}

/// Per-day rollup for history views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotal {
    pub day: DayKey,
    pub sessions: u32,
    pub minutes: u64,
}
