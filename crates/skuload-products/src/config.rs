//! Product load configuration

use std::path::PathBuf;

use skuload_core::{DEFAULT_CHUNK_SIZE, HttpConfig};

use crate::store::DEFAULT_INSERT_BATCH;
use crate::verify::DEFAULT_SAMPLE_SIZE;

/// Public product feed
pub const DEFAULT_URL: &str =
    "https://tyroo-engineering-assesments.s3.us-west-2.amazonaws.com/Tyroo-dummy-data.csv.gz";

pub const DEFAULT_DB_PATH: &str = "products.db";

/// Runtime configuration for one load
#[derive(Debug, Clone)]
pub struct Config {
    /// gzip-compressed CSV endpoint
    pub url: String,
    pub db_path: PathBuf,
    /// Source rows per batch
    pub chunk_size: usize,
    /// Concurrent clean+store units
    pub workers: usize,
    /// Extra batches allowed to wait for a worker
    pub queue_capacity: usize,
    /// Rows per INSERT statement
    pub insert_batch_size: usize,
    /// Rows shown by the verifier
    pub sample_size: usize,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: 4,
            queue_capacity: 4,
            insert_batch_size: DEFAULT_INSERT_BATCH,
            sample_size: DEFAULT_SAMPLE_SIZE,
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Reject settings that would stall or misbehave.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.url.trim().is_empty(), "source URL is empty");
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be at least 1");
        anyhow::ensure!(self.workers > 0, "workers must be at least 1");
        anyhow::ensure!(
            self.insert_batch_size > 0,
            "insert_batch_size must be at least 1"
        );
        Ok(())
    }

    /// Upper bound on batches held in memory at once
    pub fn max_in_flight(&self) -> usize {
        self.workers + self.queue_capacity
    }
}
