use chrono::Utc;
use clap::Subcommand;
use mindful_core::{Config, ImportedStreakBonus};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Carry over a streak from another app; replaces any earlier import
    Import {
        /// Streak length in days
        #[arg(long)]
        days: u32,
        /// Where the streak came from
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Show the imported streak bonus
    Show,
    /// Remove the imported streak bonus
    Clear,
}

pub async fn run(action: StreakAction, config: Config) -> CliResult {
    let ctx = Context::settled(config).await?;
    let store = ctx.db.as_ref();

    match action {
        StreakAction::Import { days, source, note } => {
            let mut bonus = ImportedStreakBonus::new(days, Utc::now());
            if let Some(source) = source {
                bonus = bonus.with_source(source);
            }
            if let Some(note) = note {
                bonus = bonus.with_note(note);
            }
            bonus.save(store)?;
            println!("{}", serde_json::to_string_pretty(&bonus)?);
        }
        StreakAction::Show => {
            let bonus = ImportedStreakBonus::load(store)?;
            println!("{}", serde_json::to_string_pretty(&bonus)?);
        }
        StreakAction::Clear => {
            ImportedStreakBonus::clear(store)?;
            println!("{}", serde_json::json!({ "cleared": true }));
        }
    }
    Ok(())
}
