//! skuload - product feed loader
//!
//! Streams a gzip-compressed product CSV over HTTP, cleans it in batches
//! and merges it idempotently into SQLite.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "skuload")]
#[command(about = "Stream a product CSV feed into SQLite")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./skuload.toml or ~/.config/skuload/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Append `load` log records to this file (default: logs/skuload.log)
    #[arg(long, global = true)]
    log_file: Option<std::path::PathBuf>,

    /// Do not write a log file
    #[arg(long, global = true, conflicts_with = "log_file")]
    no_log_file: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Download, clean and store the product feed
    Load(cmd::load::LoadArgs),
    /// Show the stored row count and a few sample rows
    Check(cmd::check::CheckArgs),
    /// Show current configuration
    Config,
}

/// Run log for this invocation; only `load` writes one.
fn run_log_path<'a>(cli: &'a Cli, config: &'a Config) -> Option<&'a std::path::Path> {
    if cli.no_log_file || !matches!(cli.command, Command::Load(_)) {
        return None;
    }
    cli.log_file.as_deref().or(config.log.file())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Progress context (TTY auto-detect)
    let progress = skuload_core::ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug; progress bars show activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    let log_file = run_log_path(&cli, &config);
    skuload_core::init_logging(quiet, cli.debug, multi, log_file).with_context(|| {
        format!(
            "Cannot open log file {}",
            log_file.map(|p| p.display().to_string()).unwrap_or_default()
        )
    })?;

    if let Some(path) = &config.loaded_from {
        log::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Command::Load(args) => cmd::load::run(args, &config, &progress),
        Command::Check(args) => cmd::check::run(args, &config),
        Command::Config => {
            cmd::print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}
