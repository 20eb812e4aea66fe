pub mod config;
pub mod log;
pub mod session;
pub mod stats;
pub mod streak;
