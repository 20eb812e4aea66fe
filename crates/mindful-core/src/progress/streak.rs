//! Streak algorithms over calendar-day keys.
//!
//! Everything here is pure: callers convert sessions to [`DayKey`]s first
//! (see [`super::ProgressAggregator`]) and pass `today` explicitly.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::bonus::ImportedStreakBonus;
use super::day_key::DayKey;

/// Result of combining the live streak with an imported bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub total: u32,
    pub current: u32,
    pub imported_days: u32,
    pub has_active_streak: bool,
}

/// Deduplicate and sort ascending.
pub fn unique_days<I>(days: I) -> Vec<DayKey>
where
    I: IntoIterator<Item = DayKey>,
{
    days.into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Consecutive days ending today or yesterday. `days` must be sorted and unique.
pub fn current_streak(days: &[DayKey], today: DayKey) -> u32 {
    let Some(&latest) = days.last() else {
        return 0;
    };
    if latest != today && latest != today.pred() {
        return 0;
    }

    let mut streak = 1;
    let mut expected = latest;
    for &day in days.iter().rev().skip(1) {
        if !day.is_day_before(expected) {
            break;
        }
        streak += 1;
        expected = day;
    }
    streak
}

/// Longest run of consecutive days anywhere in history. `days` must be sorted and unique.
pub fn longest_streak(days: &[DayKey]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<DayKey> = None;

    for &day in days {
        run = match previous {
            Some(prev) if prev.is_day_before(day) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

/// Add the imported bonus to the current streak, but only while it is alive.
pub fn total_streak(current: u32, bonus: Option<&ImportedStreakBonus>) -> StreakSummary {
    let imported_days = bonus.map(|b| b.days).unwrap_or(0);
    let has_active_streak = current > 0;
    let total = if has_active_streak {
        current.saturating_add(imported_days)
    } else {
        0
    };
    StreakSummary {
        total,
        current,
        imported_days,
        has_active_streak,
    }
}
