use clap::Subcommand;
use mindful_core::Config;

use crate::context::{emit, CliResult, Context, SessionMeta};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a new session, replacing any active one
    Start {
        /// Duration in minutes (defaults to `timer.default_duration_minutes`)
        #[arg(long, conflicts_with = "seconds")]
        minutes: Option<u64>,
        /// Duration in seconds
        #[arg(long)]
        seconds: Option<u64>,
        /// Title recorded in the log when the session completes
        #[arg(long)]
        title: Option<String>,
        /// Language code recorded in the log
        #[arg(long)]
        language: Option<String>,
        /// Intention recorded in the log
        #[arg(long)]
        intention: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Stop the active session without logging it
    Stop,
    /// Print the current timer state as JSON
    Status,
    /// Follow the running session until it completes or is paused or
    /// stopped elsewhere, printing each tick
    Watch,
}

pub async fn run(action: SessionAction, config: Config) -> CliResult {
    let watching = matches!(action, SessionAction::Watch);
    let status = matches!(action, SessionAction::Status);
    let mut ctx = Context::open(config, watching)?;
    ctx.recover().await?;

    let changed = match action {
        SessionAction::Start {
            minutes,
            seconds,
            title,
            language,
            intention,
        } => {
            let total = match (seconds, minutes) {
                (Some(secs), _) => secs,
                (None, Some(mins)) => mins.saturating_mul(60),
                (None, None) => ctx.config.timer.default_duration_minutes.saturating_mul(60),
            };
            let session_id = ctx.timer.start(total).await?;
            let meta = SessionMeta {
                session_id,
                title: title.unwrap_or_else(|| ctx.config.session.default_title.clone()),
                language_code: language.unwrap_or_else(|| ctx.config.session.language_code.clone()),
                intention,
            };
            meta.save(ctx.db.as_ref())?;
            true
        }
        SessionAction::Pause => ctx.timer.pause().await.is_some(),
        SessionAction::Resume => ctx.timer.resume_from_pause().await.is_some(),
        SessionAction::Stop => {
            let stopped = ctx.timer.stop().await.is_some();
            if stopped {
                SessionMeta::clear(ctx.db.as_ref());
            }
            stopped
        }
        SessionAction::Status => false,
        SessionAction::Watch => {
            if ctx.timer.is_paused_now() {
                tracing::warn!("session is paused; resume it before watching");
            } else if ctx.timer.is_active() {
                ctx.flush_events()?;
                ctx.follow().await?;
            }
            false
        }
    };

    // Ticks may have completed the session while the command ran.
    ctx.record_completions()?;
    let printed = ctx.flush_events()?;
    if status || watching || (!changed && printed == 0) {
        emit(&ctx.timer.snapshot())?;
    }
    Ok(())
}
