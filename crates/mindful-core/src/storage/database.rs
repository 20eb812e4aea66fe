//! SQLite-backed storage.
//!
//! Provides persistent storage for:
//! - The append-only log of completed sessions
//! - Key-value store for engine state (active timer, streak bonus)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::kv::KeyValueStore;
use crate::error::StoreError;
use crate::progress::{CompletedSession, NewCompletedSession};

/// SQLite database for session storage.
///
/// The connection sits behind a mutex so one handle can be shared between
/// the timer engine and the session log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `<data_dir>/mindful.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("mindful.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests and ephemeral use).
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                title            TEXT NOT NULL DEFAULT '',
                completed_at     TEXT NOT NULL,
                duration_seconds INTEGER NOT NULL,
                language_code    TEXT NOT NULL DEFAULT 'en',
                mood             INTEGER,
                notes            TEXT,
                intention        TEXT
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;
        Ok(())
    }

    /// Append a completed session to the log.
    ///
    /// # Errors
    /// Returns an error if the record fails validation or the insert fails.
    pub fn append_session(
        &self,
        session: NewCompletedSession,
    ) -> Result<CompletedSession, crate::error::CoreError> {
        session.validate()?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO sessions (title, completed_at, duration_seconds, language_code, mood, notes, intention)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.title,
                session.completed_at,
                session.duration_seconds as i64,
                session.language_code,
                session.mood,
                session.notes,
                session.intention,
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(session.into_record(id))
    }

    /// Every logged session in append order.
    pub fn sessions(&self) -> Result<Vec<CompletedSession>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, title, completed_at, duration_seconds, language_code, mood, notes, intention
             FROM sessions
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CompletedSession {
                id: row.get(0)?,
                title: row.get(1)?,
                completed_at: row.get(2)?,
                duration_seconds: row.get::<_, i64>(3)?.max(0) as u64,
                language_code: row.get(4)?,
                mood: row.get(5)?,
                notes: row.get(6)?,
                intention: row.get(7)?,
            })
        })?;
        let sessions = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Bulk data-clear: drops the session log and all engine state.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.conn()
            .execute_batch("DELETE FROM sessions; DELETE FROM kv;")?;
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn save(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let value = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}
