//! Key-value persistence boundary.
//!
//! The timer and the streak bonus only ever talk to a [`KeyValueStore`].
//! Writes are atomic per key and durable once `save` returns `Ok`; nothing
//! spans more than one key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;

/// Key under which the active session's timer state lives.
pub const TIMER_STATE_KEY: &str = "session_timer_state";
/// Key under which the imported streak bonus lives.
pub const STREAK_BONUS_KEY: &str = "imported_streak_bonus";
/// Key under which callers may keep metadata for the active session.
pub const ACTIVE_SESSION_META_KEY: &str = "active_session_meta";

pub trait KeyValueStore: Send + Sync {
    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store. Contents die with the value.
///
/// Reads and writes can be made to fail on demand so that the non-fatal
/// persistence paths of the engine can be exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save`/`remove` fail until switched off.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `load` fail until switched off.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                message: "writes disabled".into(),
            });
        }
        self.entries().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::ReadFailed {
                key: key.to_string(),
                message: "reads disabled".into(),
            });
        }
        Ok(self.entries().get(key).cloned())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                message: "writes disabled".into(),
            });
        }
        self.entries().remove(key);
        Ok(())
    }
}
