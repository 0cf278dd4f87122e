//! Clawmeter CLI — the main entry point.
//!
//! Commands:
//! - `setup`   — Interactive account setup & API key configuration
//! - `status`  — Show the resolved configuration
//! - `doctor`  — Diagnose configuration and SDK compatibility

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "clawmeter",
    about = "Clawmeter — Usage tracking for AI provider clients",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up a Clawmeter account and store the API key
    Setup {
        /// Talk to a local server instead of production
        #[arg(long)]
        local: bool,
    },

    /// Show the resolved configuration
    Status,

    /// Diagnose configuration and compatibility
    Doctor {
        /// Check a vendor SDK version against the tested range
        #[arg(long)]
        sdk_version: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Setup { local } => commands::setup::run(local).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor { sdk_version } => commands::doctor::run(sdk_version).await?,
    }

    Ok(())
}
