//! chatlog CLI - Export and generate conversational assistant logs
//!
//! Subcommands:
//! - `export`: page through the log API and write CSV/TSV/XLSX/JSON
//! - `replay`: send scripted utterances to a workspace so it has logs to export

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

mod client;
mod commands;
mod config;
mod tracing_setup;
mod ui;

use commands::export::ExportArgs;
use commands::replay::ReplayArgs;
use config::ChatlogConfig;

#[derive(Parser, Debug)]
#[command(
    name = "chatlog",
    author,
    version,
    about = "Export conversation logs from an assistant service to CSV, TSV, XLSX or JSON",
    long_about = "Page through the assistant log API, flatten each exchange into one row \
                  (conversation, timestamps, input, output, top intent, exit reason) and \
                  write it as a spreadsheet, or keep the raw records as JSON."
)]
struct Cli {
    /// Suppress progress spinners (for scripts and pipes)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file [default: ~/.chatlog/config.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export logs for a workspace, assistant or deployment
    Export(ExportArgs),
    /// Replay a CSV script of utterances to generate logs
    Replay(ReplayArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env before clap so env-backed flags see the values
    let env_files = config::load_dotenv();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    for path in &env_files {
        debug!("Loaded environment from {}", path.display());
    }

    // Initialize UI quiet mode from flag, env var, and TTY detection
    ui::init_quiet_mode(cli.quiet);

    let cfg = ChatlogConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Export(args) => commands::run_export(args, &cfg).await?,
        Commands::Replay(args) => commands::run_replay(args, &cfg).await?,
    }

    Ok(())
}
