//! Skuload Products - product feed loader
//!
//! Streams the product CSV, cleans each batch in parallel and merges it
//! into SQLite through a single writer thread.

pub mod clean;
pub mod config;
pub mod record;
pub mod runner;
pub mod schema;
pub mod state;
pub mod stats;
pub mod store;
pub mod verify;
pub mod writer;

// Re-exports
pub use clean::{CleanBatch, CleanError, clean_batch};
pub use config::Config;
pub use record::{CleanRecord, ProductKey, RawRecord};
pub use runner::{RunReport, run};
pub use state::RunState;
pub use stats::{BatchOutcome, BatchReport, Summary};
pub use store::{SampleRow, Store, StoreError};
pub use verify::{Verification, verify};
pub use writer::{StoreWriter, WriterHandle};
