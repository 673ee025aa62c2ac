//! Load subcommand - stream the feed into the database

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use skuload_core::ProgressContext;

use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct LoadArgs {
    /// Source URL (gzip-compressed CSV)
    #[arg(short, long)]
    pub url: Option<String>,

    /// SQLite database file
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    /// Source rows per batch
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Number of parallel clean+store workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Batches allowed to wait for a free worker
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Rows per INSERT statement
    #[arg(long)]
    pub insert_batch_size: Option<usize>,

    /// Read timeout in seconds for stall detection
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Maximum retries for transient HTTP failures
    #[arg(long)]
    pub max_retries: Option<u32>,
}

impl LoadArgs {
    /// Config file values with command-line overrides applied
    pub fn resolve(self, config: &Config) -> skuload_products::Config {
        let mut p = config.pipeline();
        if let Some(url) = self.url {
            p.url = url;
        }
        if let Some(db) = self.db {
            p.db_path = db;
        }
        p.chunk_size = self.chunk_size.unwrap_or(p.chunk_size);
        p.workers = self.workers.unwrap_or(p.workers);
        p.queue_capacity = self.queue_capacity.unwrap_or(p.queue_capacity);
        p.insert_batch_size = self.insert_batch_size.unwrap_or(p.insert_batch_size);
        if let Some(secs) = self.read_timeout {
            p.http.read_timeout = Duration::from_secs(secs);
        }
        p.http.max_retries = self.max_retries.unwrap_or(p.http.max_retries);
        p
    }
}

/// Exit 0 when every batch stored, 1 when any batch failed.
/// A fatal source error is returned as `Err`.
pub fn run(args: LoadArgs, config: &Config, progress: &ProgressContext) -> Result<ExitCode> {
    let pipeline = args.resolve(config);
    let report = skuload_products::run(&pipeline, progress)?;

    if progress.is_tty() {
        report.summary.print();
        if let Some(v) = &report.verification {
            v.print();
        }
    } else if let Some(v) = &report.verification {
        // Logs already carry the summary; stdout gets the verification
        v.print();
    }

    if report.all_batches_stored() {
        Ok(ExitCode::SUCCESS)
    } else {
        log::error!(
            "{} of {} batches failed",
            report.summary.failed_batches(),
            report.summary.batches
        );
        Ok(ExitCode::from(1))
    }
}
