mod engine;
mod hooks;
mod state;

pub use engine::{RecoveryOutcome, SessionTimer, SessionTimerBuilder, TimerPhase};
pub use hooks::{
    CompletionReason, CompletionScheduler, FnListener, KeepAlive, ScheduleHandle,
    SessionCompletion, TickUpdate, TimerConfig, TimerListener,
};
pub use state::SessionTimerState;
