use clap::{Parser, Subcommand};
use mindful_core::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "mindful", version, about = "Meditation session timer and progress log")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Session timer control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Completed-session log
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// Progress statistics and streaks
    Stats {
        #[command(subcommand)]
        action: Option<commands::stats::StatsAction>,
    },
    /// Imported streak bonus
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    init_tracing(&config);

    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action, config).await,
        Commands::Log { action } => commands::log::run(action, config).await,
        Commands::Stats { action } => commands::stats::run(action, config).await,
        Commands::Streak { action } => commands::streak::run(action, config).await,
        Commands::Config { action } => commands::config::run(action, config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
