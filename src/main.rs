mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vendo_core::config::VendoConfig;

#[derive(Parser)]
#[command(name = "vendo")]
#[command(about = "Schedule #vendo tagged calendar tasks into free working time")]
struct Cli {
    /// Use this config file instead of ~/.config/vendo/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule tasks and write the placements back to the calendar
    Run {
        /// Compute and log the actions without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Show where tasks would go, without writing
    Plan,
    /// List vendor tasks with their tags and status colors
    Tasks,
    /// List upcoming events of one calendar
    Events {
        /// Calendar id
        #[arg(short, long)]
        calendar: String,

        /// Number of days from now
        #[arg(short, long, default_value_t = 2)]
        days: u32,
    },
    /// List calendars available from the provider
    Calendars,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vendo=info,vendo_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = VendoConfig::load(cli.config.as_deref()).context("Could not load configuration")?;

    match cli.command {
        Commands::Run { dry_run } => commands::run::run(&config, dry_run).await,
        Commands::Plan => commands::plan::run(&config).await,
        Commands::Tasks => commands::tasks::run(&config).await,
        Commands::Events { calendar, days } => commands::events::run(&config, &calendar, days).await,
        Commands::Calendars => commands::calendars::run(&config).await,
    }
}
