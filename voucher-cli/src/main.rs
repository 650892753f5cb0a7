//! Voucher CLI - Command-line interface
//!
//! Runs simulations locally, serves the HTTP API, and lists strategies.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use voucher_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "voucher")]
#[command(about = "Deterministic admission-control simulator")]
#[command(version)]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info, global = true)]
    log_level: CliLogLevel,

    /// Directory for the full trace log of the last run
    #[arg(long, global = true)]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.logs_dir.as_deref())?;

    commands::handle_command(cli.command).await
}
