use clap::Subcommand;
use mindful_core::{
    Config, DayTotal, ImportedStreakBonus, ProgressAggregator, ProgressStats, StreakSummary,
    SystemClock,
};
use serde::Serialize;
use std::sync::Arc;

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Minutes and session counts per calendar day
    History,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    #[serde(flatten)]
    stats: ProgressStats,
    streak: StreakSummary,
    average_mood: Option<f64>,
}

pub async fn run(action: Option<StatsAction>, config: Config) -> CliResult {
    let ctx = Context::settled(config).await?;
    let sessions = ctx.db.sessions()?;
    let aggregator = ProgressAggregator::new(Arc::new(SystemClock));

    match action {
        None => {
            let bonus = ImportedStreakBonus::load(ctx.db.as_ref())?;
            let report = StatsReport {
                stats: aggregator.stats(&sessions),
                streak: aggregator.total_streak(&sessions, bonus.as_ref(), aggregator.today()),
                average_mood: aggregator.average_mood(&sessions),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(StatsAction::History) => {
            let history: Vec<DayTotal> = aggregator.daily_totals(&sessions);
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}
