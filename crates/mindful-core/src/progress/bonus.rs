//! Streak days imported from a meditation habit kept elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::storage::{KeyValueStore, STREAK_BONUS_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedStreakBonus {
    pub days: u32,
    pub imported_at: DateTime<Utc>,
    /// Where the streak came from (another app, a paper journal, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ImportedStreakBonus {
    pub fn new(days: u32, imported_at: DateTime<Utc>) -> Self {
        Self {
            days,
            imported_at,
            source: None,
            note: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Load the stored bonus. An undecodable record reads as no bonus.
    ///
    /// # Errors
    /// Returns the store's error if the read itself fails.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        let Some(bytes) = store.load(STREAK_BONUS_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(bonus) => Ok(Some(bonus)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring undecodable streak bonus record");
                Ok(None)
            }
        }
    }

    /// Replace any stored bonus with this one.
    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(self).map_err(|e| StoreError::WriteFailed {
            key: STREAK_BONUS_KEY.into(),
            message: e.to_string(),
        })?;
        store.save(STREAK_BONUS_KEY, &bytes)
    }

    pub fn clear(store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store.remove(STREAK_BONUS_KEY)
    }
}
