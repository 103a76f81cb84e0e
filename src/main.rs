//! # Faultline Main Entry Point
//!
//! This is the main entry point for the Faultline RCA workspace service.

use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};

use faultline::{config::ConfigLoader, db::init_pool, logging, server::run_server};

#[derive(Parser)]
#[command(name = "faultline", about = "Root-cause-analysis workspace service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server and background ingest loops (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    logging::init_subscriber(&config);

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Migrate => {
            let db = init_pool(&config).await?;
            Migrator::up(&db, None).await?;
            tracing::info!("Migrations applied");
            Ok(())
        }
    }
}
