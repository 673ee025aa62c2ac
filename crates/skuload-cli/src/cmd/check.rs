//! Check subcommand - read-only look at the stored table

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// SQLite database file
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    /// Number of sample rows to show
    #[arg(short = 'n', long, default_value_t = skuload_products::verify::DEFAULT_SAMPLE_SIZE)]
    pub sample: usize,
}

pub fn run(args: CheckArgs, config: &Config) -> Result<ExitCode> {
    let db = args.db.unwrap_or_else(|| config.database.path.clone());
    anyhow::ensure!(db.exists(), "No database at {}", db.display());

    let verification = skuload_products::verify(&db, args.sample)
        .with_context(|| format!("Cannot read {}", db.display()))?;
    verification.log();
    verification.print();
    Ok(ExitCode::SUCCESS)
}
