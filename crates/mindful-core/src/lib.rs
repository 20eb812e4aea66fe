//! # Mindful Core Library
//!
//! Session timing and progress streaks for a meditation app. The CLI binary
//! and any embedding UI drive the same engine.
//!
//! ## Architecture
//!
//! - **Session Timer**: a wall-clock-based state machine for the single
//!   active session. Elapsed time is derived from persisted timestamps, so it
//!   survives suspension and restarts; ticks only trigger recomputation.
//! - **Progress**: streak and summary statistics recomputed on demand from
//!   the append-only log of completed sessions.
//! - **Storage**: an abstract key-value store (SQLite or in-memory), the
//!   SQLite session log, and TOML configuration.
//!
//! ## Key Components
//!
//! - [`SessionTimer`]: the session state machine
//! - [`ProgressAggregator`]: streaks and stats over [`CompletedSession`]s
//! - [`KeyValueStore`]: persistence boundary for engine state
//! - [`Clock`]: injected time source

pub mod clock;
pub mod error;
pub mod events;
pub mod progress;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, HookError, StoreError, ValidationError};
pub use events::Event;
pub use progress::{
    CompletedSession, DayKey, DayTotal, ImportedStreakBonus, NewCompletedSession,
    ProgressAggregator, ProgressStats, StreakSummary,
};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
pub use timer::{
    CompletionReason, RecoveryOutcome, SessionCompletion, SessionTimer, TickUpdate, TimerConfig,
    TimerListener, TimerPhase,
};
