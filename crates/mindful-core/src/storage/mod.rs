mod config;
pub mod database;
mod kv;

pub use config::{Config, LogConfig, SessionConfig, TimerSettings};
pub use database::Database;
pub use kv::{
    KeyValueStore, MemoryStore, ACTIVE_SESSION_META_KEY, STREAK_BONUS_KEY, TIMER_STATE_KEY,
};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `MINDFUL_DATA_DIR` wins when set. Otherwise `~/.config/mindful[-dev]/`
/// based on `MINDFUL_ENV` (set `MINDFUL_ENV=dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("MINDFUL_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("MINDFUL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mindful-dev")
            } else {
                base_dir.join("mindful")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
