use chrono::Local;
use clap::Subcommand;
use mindful_core::{Config, NewCompletedSession};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum LogAction {
    /// Record a session completed outside the timer
    Add {
        /// Length of the session in minutes
        #[arg(long)]
        minutes: u64,
        /// Title (defaults to `session.default_title`)
        #[arg(long)]
        title: Option<String>,
        /// Mood from 1 to 5
        #[arg(long)]
        mood: Option<u8>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        intention: Option<String>,
    },
    /// List all logged sessions, oldest first
    List,
    /// Delete the session log and all timer state
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(action: LogAction, config: Config) -> CliResult {
    let ctx = Context::settled(config).await?;

    match action {
        LogAction::Add {
            minutes,
            title,
            mood,
            notes,
            intention,
        } => {
            let mut entry = NewCompletedSession::new(
                title.unwrap_or_else(|| ctx.config.session.default_title.clone()),
                Local::now(),
                minutes.saturating_mul(60),
                ctx.config.session.language_code.clone(),
            );
            if let Some(mood) = mood {
                entry = entry.with_mood(mood);
            }
            if let Some(notes) = notes {
                entry = entry.with_notes(notes);
            }
            if let Some(intention) = intention {
                entry = entry.with_intention(intention);
            }
            let session = ctx.db.append_session(entry)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        LogAction::List => {
            let sessions = ctx.db.sessions()?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        LogAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear the log without --yes".into());
            }
            ctx.timer.stop().await;
            ctx.db.clear_all()?;
            tracing::info!("session log and timer state cleared");
            println!("{}", serde_json::json!({ "cleared": true }));
        }
    }
    Ok(())
}
