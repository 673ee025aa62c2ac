//! Dedicated writer thread owning the [`Store`]
//!
//! Workers never touch the connection. They send a [`WriteRequest`] over a
//! bounded channel and block on the reply, so at most one transaction is
//! ever open and requests beyond the channel capacity wait their turn.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::JoinHandle;

use crate::record::CleanRecord;
use crate::store::{Store, StoreError};

/// One batch's records plus where to send the inserted count.
pub struct WriteRequest {
    pub batch: usize,
    pub records: Vec<CleanRecord>,
    pub reply: SyncSender<Result<usize, StoreError>>,
}

/// Cloneable sending side, shared by worker threads.
#[derive(Clone)]
pub struct WriterHandle {
    sender: SyncSender<WriteRequest>,
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterHandle").finish_non_exhaustive()
    }
}

impl WriterHandle {
    /// Store `records` and wait for the number of newly inserted rows.
    pub fn submit(&self, batch: usize, records: Vec<CleanRecord>) -> Result<usize, StoreError> {
        let (reply, rx) = mpsc::sync_channel(1);
        self.sender
            .send(WriteRequest {
                batch,
                records,
                reply,
            })
            .map_err(|_| StoreError::WriterClosed)?;
        rx.recv().map_err(|_| StoreError::WriterClosed)?
    }
}

/// Totals reported when the writer thread exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    /// Rows added across all successful requests
    pub inserted: u64,
    /// Rows in the table after the last request
    pub row_count: u64,
    pub failed_requests: usize,
}

/// Serves [`WriteRequest`]s until every [`WriterHandle`] is dropped.
pub struct StoreWriter {
    rx: Receiver<WriteRequest>,
    store: Store,
    rows_per_statement: usize,
}

impl StoreWriter {
    /// Move `store` onto a new `store-writer` thread.
    pub fn spawn(
        store: Store,
        queue_capacity: usize,
        rows_per_statement: usize,
    ) -> std::io::Result<(WriterHandle, JoinHandle<WriterReport>)> {
        let (sender, rx) = mpsc::sync_channel(queue_capacity);
        let writer = Self {
            rx,
            store,
            rows_per_statement,
        };
        let handle = std::thread::Builder::new()
            .name("store-writer".into())
            .spawn(move || writer.run())?;
        Ok((WriterHandle { sender }, handle))
    }

    fn run(mut self) -> WriterReport {
        let mut report = WriterReport {
            row_count: self.current_count(),
            ..Default::default()
        };
        let start_count = report.row_count;
        log::debug!(
            "{}: {} rows before load",
            self.store.path().display(),
            start_count
        );

        for req in self.rx.iter() {
            let result = self
                .store
                .insert_batch(&req.records, self.rows_per_statement);
            match &result {
                Ok(n) => {
                    report.inserted += *n as u64;
                    report.row_count = start_count + report.inserted;
                    log::info!(
                        "batch {}: inserted {} of {} rows; after insertion: {} rows",
                        req.batch,
                        n,
                        req.records.len(),
                        report.row_count
                    );
                }
                Err(e) => {
                    report.failed_requests += 1;
                    log::error!(
                        "batch {}: store failed for {} rows: {e}",
                        req.batch,
                        req.records.len()
                    );
                }
            }
            // Submitter may have given up; the write already happened
            let _ = req.reply.send(result);
        }

        report.row_count = self.current_count();
        report
    }

    fn current_count(&self) -> u64 {
        match self.store.row_count() {
            Ok(n) => n,
            Err(e) => {
                log::warn!("row count unavailable: {e}");
                0
            }
        }
    }
}
