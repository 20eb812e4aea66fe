//! Streak and summary statistics over the completed-session log.
//!
//! The aggregator is stateless between calls: the log is the source of
//! truth and every query recomputes from it. Records whose `completed_at`
//! does not parse are skipped by every aggregate.

mod bonus;
mod day_key;
mod session;
mod stats;
pub mod streak;

pub use bonus::ImportedStreakBonus;
pub use day_key::DayKey;
pub use session::{CompletedSession, NewCompletedSession};
pub use stats::{DayTotal, ProgressStats};
pub use streak::StreakSummary;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Local, TimeZone};

use crate::clock::Clock;

/// Computes streaks in a fixed calendar timezone (the device's local one
/// by default).
pub struct ProgressAggregator<Tz: TimeZone = Local> {
    clock: Arc<dyn Clock>,
    tz: Tz,
}

impl ProgressAggregator<Local> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, tz: Local }
    }
}

impl<Tz: TimeZone> ProgressAggregator<Tz> {
    pub fn with_timezone(clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self { clock, tz }
    }

    pub fn today(&self) -> DayKey {
        DayKey::from_instant(&self.clock.now().with_timezone(&self.tz))
    }

    /// Sorted calendar days that hold at least one session.
    pub fn unique_session_days(&self, sessions: &[CompletedSession]) -> Vec<DayKey> {
        streak::unique_days(sessions.iter().filter_map(|s| s.day_key(&self.tz)))
    }

    pub fn current_streak(&self, sessions: &[CompletedSession], today: DayKey) -> u32 {
        streak::current_streak(&self.unique_session_days(sessions), today)
    }

    pub fn longest_streak(&self, sessions: &[CompletedSession]) -> u32 {
        streak::longest_streak(&self.unique_session_days(sessions))
    }

    pub fn total_streak(
        &self,
        sessions: &[CompletedSession],
        bonus: Option<&ImportedStreakBonus>,
        today: DayKey,
    ) -> StreakSummary {
        streak::total_streak(self.current_streak(sessions, today), bonus)
    }

    pub fn stats(&self, sessions: &[CompletedSession]) -> ProgressStats {
        let valid: Vec<&CompletedSession> = sessions
            .iter()
            .filter(|s| s.completed_instant().is_some())
            .collect();
        if valid.len() < sessions.len() {
            tracing::debug!(
                skipped = sessions.len() - valid.len(),
                "sessions without a parseable completion time left out of stats"
            );
        }

        let total_seconds: u64 = valid.iter().map(|s| s.duration_seconds).sum();
        let days = self.unique_session_days(sessions);

        ProgressStats {
            total_sessions: valid.len() as u64,
            total_minutes: total_seconds / 60,
            current_streak: streak::current_streak(&days, self.today()),
            longest_streak: streak::longest_streak(&days),
            last_session_date: valid.last().and_then(|s| s.completed_instant()),
        }
    }

    /// Sessions and minutes per calendar day, oldest first.
    pub fn daily_totals(&self, sessions: &[CompletedSession]) -> Vec<DayTotal> {
        let mut by_day: BTreeMap<DayKey, (u32, u64)> = BTreeMap::new();
        for session in sessions {
            if let Some(day) = session.day_key(&self.tz) {
                let entry = by_day.entry(day).or_default();
                entry.0 += 1;
                entry.1 += session.duration_seconds;
            }
        }
        by_day
            .into_iter()
            .map(|(day, (count, seconds))| DayTotal {
                day,
                sessions: count,
                minutes: seconds / 60,
            })
            .collect()
    }

    /// Mean of the recorded moods, if any session carries one.
    pub fn average_mood(&self, sessions: &[CompletedSession]) -> Option<f64> {
        let moods: Vec<f64> = sessions
            .iter()
            .filter(|s| s.completed_instant().is_some())
            .filter_map(|s| s.mood.map(f64::from))
            .collect();
        if moods.is_empty() {
            None
        } else {
            Some(moods.iter().sum::<f64>() / moods.len() as f64)
        }
    }
}
