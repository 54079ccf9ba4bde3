//! # DevTrack API Main Entry Point
//!
//! This is the main entry point for the DevTrack API service.

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};

use devtrack::{config::ConfigLoader, db::init_pool, server::run_server, telemetry};

#[derive(Parser)]
#[command(name = "devtrack", about = "AI-powered GitHub activity analytics", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending database migrations and start the API server (default)
    Serve,
    /// Run pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::Serve => run_server(config, db).await,
    }
}
