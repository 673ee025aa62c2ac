//! Remote gzip CSV feed exposed as a sequence of row batches

use std::sync::atomic::Ordering;

use indicatif::ProgressBar;
use serde::de::DeserializeOwned;

use crate::batch::{Batch, CsvBatches};
use crate::error::SourceError;
use crate::retry::retry_with_backoff;
use crate::stream::{self, ByteCounter, GzipReader, HttpConfig};

/// An open source feed: HTTP body → gunzip → UTF-8 CSV → batches.
///
/// Forward-only; reopening means a new request from the first byte.
pub struct SourceStream<T> {
    batches: CsvBatches<GzipReader, T>,
    bytes: ByteCounter,
    total_bytes: Option<u64>,
}

impl<T: DeserializeOwned> SourceStream<T> {
    /// Open `url` with retry on transient failures, then read the CSV header.
    pub fn open(
        url: &str,
        http: &HttpConfig,
        chunk_size: usize,
        pb: &ProgressBar,
    ) -> Result<Self, SourceError> {
        let (reader, bytes, total_bytes) =
            retry_with_backoff(url, http.max_retries, http.backoff_base, pb, || {
                stream::open_gzip_reader(url, http)
            })?;

        match total_bytes {
            Some(total) => log::info!("Connected to {url} ({total} bytes compressed)"),
            None => log::info!("Connected to {url} (size unknown)"),
        }

        let batches = CsvBatches::from_reader(reader, chunk_size)?;
        Ok(Self {
            batches,
            bytes,
            total_bytes,
        })
    }

    /// Compressed bytes received so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// `Content-Length` of the compressed body, if the server sent one
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn rows_seen(&self) -> usize {
        self.batches.rows_seen()
    }
}

impl<T: DeserializeOwned> Iterator for SourceStream<T> {
    type Item = Result<Batch<T>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.batches.next()
    }
}
