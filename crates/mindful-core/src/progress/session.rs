//! Completed-session log records.

use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use super::day_key::DayKey;
use crate::error::ValidationError;

/// One finished meditation. Append-only: written once, never mutated.
///
/// `completed_at` is kept as the raw ISO-8601 string it was logged with; a
/// record whose timestamp does not parse is left out of every aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub id: i64,
    pub title: String,
    pub completed_at: String,
    pub duration_seconds: u64,
    pub language_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,
}

impl CompletedSession {
    pub fn completed_instant(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.completed_at.trim()).ok()
    }

    /// Calendar day this session counts toward, in `tz`.
    pub fn day_key<Tz: TimeZone>(&self, tz: &Tz) -> Option<DayKey> {
        self.completed_instant()
            .map(|at| DayKey::from_instant(&at.with_timezone(tz)))
    }
}

/// A session about to be appended to the log. The log assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompletedSession {
    pub title: String,
    pub completed_at: String,
    pub duration_seconds: u64,
    pub language_code: String,
    #[serde(default)]
    pub mood: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub intention: Option<String>,
}

impl NewCompletedSession {
    pub fn new<Tz: TimeZone>(
        title: impl Into<String>,
        completed_at: DateTime<Tz>,
        duration_seconds: u64,
        language_code: impl Into<String>,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            title: title.into(),
            completed_at: completed_at.to_rfc3339(),
            duration_seconds,
            language_code: language_code.into(),
            mood: None,
            notes: None,
            intention: None,
        }
    }

    pub fn with_mood(mut self, mood: u8) -> Self {
        self.mood = Some(mood);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_intention(mut self, intention: impl Into<String>) -> Self {
        self.intention = Some(intention.into());
        self
    }

    /// # Errors
    /// Rejects zero durations, moods outside `1..=5` and unparseable timestamps.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.duration_seconds == 0 {
            return Err(ValidationError::InvalidDuration { seconds: 0 });
        }
        if let Some(mood) = self.mood {
            if !(1..=5).contains(&mood) {
                return Err(ValidationError::InvalidValue {
                    field: "mood".into(),
                    message: format!("{mood} is outside 1..=5"),
                });
            }
        }
        if DateTime::parse_from_rfc3339(&self.completed_at).is_err() {
            return Err(ValidationError::InvalidValue {
                field: "completed_at".into(),
                message: format!("'{}' is not an RFC 3339 timestamp", self.completed_at),
            });
        }
        Ok(())
    }

    pub fn into_record(self, id: i64) -> CompletedSession {
        CompletedSession {
            id,
            title: self.title,
            completed_at: self.completed_at,
            duration_seconds: self.duration_seconds,
            language_code: self.language_code,
            mood: self.mood,
            notes: self.notes,
            intention: self.intention,
        }
    }
}
