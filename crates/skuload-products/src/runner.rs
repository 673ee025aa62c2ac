//! Main execution logic for a product load

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Context;
use skuload_core::{
    Batch, ProgressContext, Semaphore, SourceError, SourceStream, fmt_num, upgrade_to_bar,
};

use crate::clean::clean_batch;
use crate::config::Config;
use crate::record::RawRecord;
use crate::state::RunState;
use crate::stats::{BatchOutcome, BatchReport, Summary};
use crate::store::Store;
use crate::verify::{self, Verification};
use crate::writer::{StoreWriter, WriterHandle};

/// Outcome of a load that reached the end of the source
#[derive(Debug)]
pub struct RunReport {
    pub summary: Summary,
    /// Per-batch results in source order
    pub batches: Vec<BatchReport>,
    /// `None` if the read-back failed; the load itself still stands
    pub verification: Option<Verification>,
    pub state: RunState,
}

impl RunReport {
    pub fn all_batches_stored(&self) -> bool {
        self.summary.failed_batches() == 0
    }
}

/// Stream the feed into the database, then verify it.
///
/// Batch-level failures are recorded in the summary and do not stop the
/// run. A fatal source error drains the batches already dispatched and is
/// returned as `Err`.
pub fn run(config: &Config, progress: &ProgressContext) -> anyhow::Result<RunReport> {
    config.validate()?;
    let start = Instant::now();
    let mut state = RunState::Idle;

    log::info!(
        "skuload starting: url={}, db={}, chunk_size={}, workers={}, queue={}",
        config.url,
        config.db_path.display(),
        config.chunk_size,
        config.workers,
        config.queue_capacity
    );

    state.advance(RunState::Streaming)?;
    let store = Store::open(&config.db_path).context("Cannot open product database")?;
    let (writer, writer_thread) =
        StoreWriter::spawn(store, config.workers, config.insert_batch_size)
            .context("Failed to spawn store writer")?;

    let download = progress.download_bar("products");
    let mut source = match SourceStream::<RawRecord>::open(
        &config.url,
        &config.http,
        config.chunk_size,
        &download,
    ) {
        Ok(source) => source,
        Err(e) => {
            download.finish_and_clear();
            drop(writer);
            if writer_thread.join().is_err() {
                log::error!("Store writer panicked");
            }
            state.advance(RunState::Failed)?;
            return Err(e).with_context(|| format!("Cannot open source {}", config.url));
        }
    };
    if let Some(total) = source.total_bytes() {
        upgrade_to_bar(&download, total);
    }
    let inserted_pb = progress.counter("Inserted rows");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("batch-worker-{i}"))
        .build()
        .context("Failed to create thread pool")?;
    let permits = Semaphore::new(config.max_in_flight());
    let reports: Mutex<Vec<BatchReport>> = Mutex::new(Vec::new());

    // Producer runs here; clean+store units run on the pool.
    // The scope returns only after every spawned unit has finished.
    let fatal: Option<SourceError> = pool.in_place_scope(|scope| {
        let writer = &writer;
        let reports = &reports;
        let inserted_pb = &inserted_pb;
        loop {
            // Taken before parsing so at most max_in_flight batches exist
            let permit = permits.acquire();
            let batch = match source.next() {
                Some(Ok(batch)) => batch,
                Some(Err(e)) => return Some(e),
                None => return None,
            };
            download.set_position(source.bytes_read());
            download.set_message(format!("{} rows", fmt_num(source.rows_seen())));

            scope.spawn(move |_| {
                let report = process_batch(batch, writer);
                drop(permit);
                report.log();
                inserted_pb.inc(report.inserted() as u64);
                reports
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(report);
            });
        }
    });

    download.finish_and_clear();
    inserted_pb.finish_and_clear();

    let mut reports = reports.into_inner().unwrap_or_else(PoisonError::into_inner);
    reports.sort_by_key(|r| r.index);
    let mut summary = Summary::from_batches(&reports);

    if fatal.is_none() {
        state.advance(RunState::Draining)?;
        log::info!(
            "Source exhausted: {} rows in {} batches",
            fmt_num(source.rows_seen()),
            reports.len()
        );
    }

    // Last handle gone → writer loop ends and reports its totals
    drop(writer);
    match writer_thread.join() {
        Ok(w) => {
            summary.final_rows = w.row_count;
            if w.inserted as usize != summary.inserted {
                log::warn!(
                    "writer counted {} inserted rows, batches reported {}",
                    w.inserted,
                    summary.inserted
                );
            }
        }
        Err(_) => anyhow::bail!("Store writer panicked"),
    }
    summary.elapsed = start.elapsed();

    if let Some(e) = fatal {
        state.advance(RunState::Failed)?;
        summary.log();
        return Err(e).with_context(|| {
            format!(
                "Source failed after {} rows; storage holds {} rows",
                fmt_num(source.rows_seen()),
                fmt_num(summary.final_rows as usize)
            )
        });
    }

    state.advance(RunState::Verifying)?;
    summary.log();
    let verification = match verify::verify(&config.db_path, config.sample_size) {
        Ok(v) => {
            v.log();
            Some(v)
        }
        Err(e) => {
            log::error!("Verification failed: {e}");
            None
        }
    };

    state.advance(RunState::Done)?;
    log::info!("skuload completed in {:.1}s", start.elapsed().as_secs_f64());
    Ok(RunReport {
        summary,
        batches: reports,
        verification,
        state,
    })
}

/// Clean one batch and hand it to the writer. Never fails the run.
fn process_batch(batch: Batch<RawRecord>, writer: &WriterHandle) -> BatchReport {
    let started = Instant::now();
    let mut report = BatchReport {
        index: batch.index,
        first_row: batch.first_row,
        source_rows: batch.len() + batch.rejected,
        rejected: batch.rejected,
        duplicates: 0,
        missing_key: 0,
        cleaned: 0,
        outcome: BatchOutcome::Stored { inserted: 0 },
        elapsed: Duration::ZERO,
    };

    report.outcome = match clean_batch(batch) {
        Err(e) => BatchOutcome::CleanFailed(e.to_string()),
        Ok(cleaned) => {
            report.duplicates = cleaned.duplicates;
            report.missing_key = cleaned.missing_key;
            report.cleaned = cleaned.records.len();
            match writer.submit(report.index, cleaned.records) {
                Ok(inserted) => BatchOutcome::Stored { inserted },
                Err(e) => BatchOutcome::StoreFailed(e.to_string()),
            }
        }
    };
    report.elapsed = started.elapsed();
    report
}
