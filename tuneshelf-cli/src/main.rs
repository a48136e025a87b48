//! Tuneshelf CLI - Command-line interface
//!
//! Provides command-line access to the home sections and incremental search.

mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tuneshelf_core::TuneshelfConfig;
use tuneshelf_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "tuneshelf")]
#[command(about = "Browse seasonal music shelves and search movies and podcasts")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Directory for the full run log
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    /// Storefront country sent with every request
    #[arg(long, global = true)]
    country: Option<String>,

    /// Debounce interval for search input, in milliseconds
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,

    /// Serve generated results instead of calling the search service
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;

    let mut config = TuneshelfConfig::from_env();
    if let Some(country) = cli.country {
        config.endpoint.country = country;
    }
    if let Some(millis) = cli.debounce_ms {
        config.search.debounce = Duration::from_millis(millis);
    }
    config.validate()?;

    commands::handle_command(cli.command, config, cli.demo).await?;

    Ok(())
}
