//! Skuload Core - streaming ingestion infrastructure
//!
//! Reusable pieces for pulling a large gzip-compressed CSV over HTTP in
//! bounded memory: retrying fetch, incremental batch parsing, logging,
//! progress reporting and backpressure.

pub mod batch;
pub mod error;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod semaphore;
pub mod source;
pub mod stream;

// Re-exports for convenience
pub use batch::{Batch, CsvBatches, DEFAULT_CHUNK_SIZE};
pub use error::{Retryable, SourceError};
pub use logging::init_logging;
pub use progress::{ProgressContext, fmt_num, upgrade_to_bar};
pub use retry::retry_with_backoff;
pub use semaphore::{Semaphore, SemaphoreGuard};
pub use source::SourceStream;
pub use stream::{ByteCounter, GzipReader, HttpConfig, SHARED_RUNTIME, StreamError};
