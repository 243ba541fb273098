//! Ilm Garden bot binary.
//!
//! - Run the Discord bot
//! - Validate a configuration file
//! - Apply database migrations

use clap::{Parser, Subcommand};
use ilm_garden::{ObservabilityConfig, init_observability, load_config};
use std::path::PathBuf;

/// Ilm Garden - coin economy and role verification for Discord
#[derive(Parser, Debug)]
#[command(name = "ilm-garden")]
#[command(about = "Coin economy, daily rewards and role verification for Discord", long_about = None)]
#[command(version)]
struct Cli {
    /// Command to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to Discord and serve slash commands
    #[cfg(feature = "discord")]
    Run {
        /// Path to the bot configuration
        #[arg(long, default_value = "ilm_garden.toml")]
        config: PathBuf,

        /// Keep accounts in memory regardless of the configured backend
        #[arg(long)]
        memory: bool,

        /// Bot token
        #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Path to the bot configuration
        #[arg(long, default_value = "ilm_garden.toml")]
        config: PathBuf,
    },

    /// Apply pending database migrations
    #[cfg(feature = "database")]
    Migrate {
        /// PostgreSQL connection string
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    init_observability(
        &ObservabilityConfig::new()
            .with_log_level(log_level)
            .with_json_logs(cli.json_logs),
    )?;

    match cli.command {
        #[cfg(feature = "discord")]
        Commands::Run {
            config,
            memory,
            token,
        } => run_bot(&config, memory, &token).await?,

        Commands::CheckConfig { config } => {
            load_config(&config)?;
            println!("{} is valid", config.display());
        }

        #[cfg(feature = "database")]
        Commands::Migrate { database_url } => {
            let store = ilm_storage::PostgresAccountStore::connect(&database_url, 1)?;
            store.migrate().await?;
            tracing::info!("Migrations applied");
        }
    }

    Ok(())
}

#[cfg(feature = "discord")]
async fn run_bot(
    config_path: &std::path::Path,
    memory: bool,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use ilm_garden::{build_router, open_store};
    use ilm_social::discord::{IlmBot, SerenityRoleGateway};
    use std::sync::Arc;
    use tracing::info;

    let config = load_config(config_path)?;
    let store = open_store(&config, memory).await?;
    let gateway = Arc::new(SerenityRoleGateway::from_token(token));
    let router = Arc::new(build_router(&config, store, gateway)?);

    let mut bot = IlmBot::new(token, router).await?;
    info!("Bot starting. Press Ctrl+C to stop.");

    tokio::select! {
        result = bot.start() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
