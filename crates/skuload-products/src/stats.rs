//! Per-batch results and the run summary.
//!
//! Statistics hierarchy:
//! - Batch-level: `BatchReport` carrying a `BatchOutcome`
//! - Run-level: `Summary`, aggregated by the runner after draining

use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use skuload_core::fmt_num;

// =============================================================================
// Batch-level
// =============================================================================

/// How one batch ended. Failures are values; the run continues past them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Cleaned and committed; `inserted` excludes keys already stored
    Stored { inserted: usize },
    /// Cleaning failed; nothing from the batch was written
    CleanFailed(String),
    /// The write transaction failed and was rolled back
    StoreFailed(String),
}

impl BatchOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Stored { .. })
    }
}

/// Counters for one batch, from parse to commit.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub index: usize,
    /// 1-based source row number of the batch's first row
    pub first_row: usize,
    /// Source rows in this batch, including rejected ones
    pub source_rows: usize,
    /// Rows the CSV decoder dropped
    pub rejected: usize,
    /// Rows dropped as in-batch repeats of a key
    pub duplicates: usize,
    /// Rows dropped for an empty key part
    pub missing_key: usize,
    /// Records handed to the writer
    pub cleaned: usize,
    pub outcome: BatchOutcome,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn inserted(&self) -> usize {
        match self.outcome {
            BatchOutcome::Stored { inserted } => inserted,
            _ => 0,
        }
    }

    /// One log line per batch.
    pub fn log(&self) {
        match &self.outcome {
            BatchOutcome::Stored { inserted } => log::info!(
                "batch {}: cleaned {} of {} rows ({} duplicates, {} rejected, {} without key), {} new [{:.2}s]",
                self.index,
                self.cleaned,
                self.source_rows,
                self.duplicates,
                self.rejected,
                self.missing_key,
                inserted,
                self.elapsed.as_secs_f64()
            ),
            BatchOutcome::CleanFailed(e) => log::error!(
                "batch {} (rows {}..): cleaning failed, {} rows dropped: {e}",
                self.index,
                self.first_row,
                self.source_rows
            ),
            BatchOutcome::StoreFailed(e) => log::error!(
                "batch {} (rows {}..): store failed, {} cleaned rows not written: {e}",
                self.index,
                self.first_row,
                self.cleaned
            ),
        }
    }
}

// =============================================================================
// Run-level
// =============================================================================

/// Aggregated statistics for one load.
#[derive(Debug, Default, Clone)]
pub struct Summary {
    pub batches: usize,
    pub stored_batches: usize,
    pub clean_failures: usize,
    pub store_failures: usize,
    pub source_rows: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub missing_key: usize,
    pub inserted: usize,
    /// Rows in the table when the writer finished
    pub final_rows: u64,
    pub elapsed: Duration,
}

impl Summary {
    /// Aggregate from individual batch reports.
    pub fn from_batches(reports: &[BatchReport]) -> Self {
        let mut s = Self {
            batches: reports.len(),
            ..Default::default()
        };
        for r in reports {
            s.source_rows += r.source_rows;
            s.rejected += r.rejected;
            s.duplicates += r.duplicates;
            s.missing_key += r.missing_key;
            s.inserted += r.inserted();
            match r.outcome {
                BatchOutcome::Stored { .. } => s.stored_batches += 1,
                BatchOutcome::CleanFailed(_) => s.clean_failures += 1,
                BatchOutcome::StoreFailed(_) => s.store_failures += 1,
            }
        }
        s
    }

    pub fn failed_batches(&self) -> usize {
        self.clean_failures + self.store_failures
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Load Summary")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
                Cell::new("%").fg(Color::Cyan),
            ]);

        table.add_row(vec![
            Cell::new("Batches"),
            Cell::new(format!(
                "{}/{} ({} failed)",
                self.stored_batches,
                self.batches,
                self.failed_batches()
            )),
            Cell::new(""),
        ]);
        table.add_row(vec![
            Cell::new("Rows read"),
            Cell::new(fmt_num(self.source_rows)),
            Cell::new(""),
        ]);
        table.add_row(vec![
            Cell::new("Rejected"),
            Cell::new(fmt_num(self.rejected)),
            Cell::new(format!("{:.3}", pct(self.rejected, self.source_rows))),
        ]);
        table.add_row(vec![
            Cell::new("Duplicates"),
            Cell::new(fmt_num(self.duplicates)),
            Cell::new(format!("{:.1}", pct(self.duplicates, self.source_rows))),
        ]);
        table.add_row(vec![
            Cell::new("Missing key"),
            Cell::new(fmt_num(self.missing_key)),
            Cell::new(format!("{:.3}", pct(self.missing_key, self.source_rows))),
        ]);
        table.add_row(vec![
            Cell::new("Inserted").fg(Color::Green),
            Cell::new(fmt_num(self.inserted)).fg(Color::Green),
            Cell::new(format!("{:.1}", pct(self.inserted, self.source_rows))).fg(Color::Green),
        ]);
        table.add_row(vec![
            Cell::new("Rows in table"),
            Cell::new(fmt_num(self.final_rows as usize)),
            Cell::new(""),
        ]);
        table.add_row(vec![
            Cell::new("Elapsed"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
            Cell::new(""),
        ]);

        format!("\n{table}")
    }

    pub fn print(&self) {
        println!("{}", self.format_table());
    }

    /// Log the summary (non-TTY mode, and always to the log file).
    pub fn log(&self) {
        log::info!(
            "Load finished: {} rows read, {} inserted, {} duplicates, {} rejected; {}/{} batches stored; {} rows in table [{:.1}s]",
            fmt_num(self.source_rows),
            fmt_num(self.inserted),
            fmt_num(self.duplicates),
            fmt_num(self.rejected),
            self.stored_batches,
            self.batches,
            fmt_num(self.final_rows as usize),
            self.elapsed.as_secs_f64()
        );
        if self.failed_batches() > 0 {
            log::warn!(
                "{} batches failed ({} cleaning, {} store); re-run to fill the gap",
                self.failed_batches(),
                self.clean_failures,
                self.store_failures
            );
        }
    }
}

/// Calculate percentage safely.
fn pct(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
