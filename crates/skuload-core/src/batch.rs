//! Fixed-size row batches pulled incrementally from a CSV reader

use std::io::Read;
use std::marker::PhantomData;
use std::sync::Arc;

use csv::{ErrorKind, StringRecord};
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Default number of source rows per batch.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Up to `chunk_size` consecutive source rows, in source order.
#[derive(Debug)]
pub struct Batch<T> {
    /// 0-based position of this batch in the stream
    pub index: usize,
    /// 1-based source row number of the first row in this batch
    pub first_row: usize,
    pub rows: Vec<T>,
    /// Rows in this span that could not be decoded and were dropped
    pub rejected: usize,
    pub headers: Arc<StringRecord>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the source header contains `name`
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Short label for log lines
    pub fn label(&self) -> String {
        format!("batch {} (rows {}..)", self.index, self.first_row)
    }
}

/// Lazy, forward-only sequence of [`Batch`]es over a CSV stream with a header row.
///
/// Only one batch is materialized at a time. Rows that fail to decode are
/// dropped and counted; an I/O failure ends the sequence with an error.
/// The iterator is fused after exhaustion or error.
pub struct CsvBatches<R, T> {
    reader: csv::Reader<R>,
    headers: Arc<StringRecord>,
    record: StringRecord,
    chunk_size: usize,
    next_index: usize,
    rows_seen: usize,
    done: bool,
    _row: PhantomData<fn() -> T>,
}

impl<R: Read, T: DeserializeOwned> CsvBatches<R, T> {
    /// Wrap a reader; reads the header row immediately.
    pub fn from_reader(rdr: R, chunk_size: usize) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(rdr);
        let headers = Arc::new(reader.headers()?.clone());
        log::debug!("source header: {} columns", headers.len());

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            chunk_size: chunk_size.max(1),
            next_index: 0,
            rows_seen: 0,
            done: false,
            _row: PhantomData,
        })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Source rows consumed so far (decoded + rejected)
    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }
}

/// Errors confined to a single row; the reader can continue past them.
fn is_row_error(e: &csv::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Utf8 { .. } | ErrorKind::UnequalLengths { .. } | ErrorKind::Deserialize { .. }
    )
}

impl<R: Read, T: DeserializeOwned> Iterator for CsvBatches<R, T> {
    type Item = Result<Batch<T>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let first_row = self.rows_seen + 1;
        let mut rows = Vec::with_capacity(self.chunk_size);
        let mut rejected = 0usize;

        while rows.len() + rejected < self.chunk_size {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => {
                    self.rows_seen += 1;
                    match self.record.deserialize::<T>(Some(&self.headers)) {
                        Ok(row) => rows.push(row),
                        Err(e) => {
                            rejected += 1;
                            log::debug!("row {}: dropped: {e}", self.rows_seen);
                        }
                    }
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) if is_row_error(&e) => {
                    self.rows_seen += 1;
                    rejected += 1;
                    log::debug!("row {}: dropped: {e}", self.rows_seen);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(SourceError::Csv(e)));
                }
            }
        }

        if rows.is_empty() && rejected == 0 {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        Some(Ok(Batch {
            index,
            first_row,
            rows,
            rejected,
            headers: Arc::clone(&self.headers),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::{self, Cursor};

    #[derive(Debug, Deserialize)]
    struct Row {
        id: u32,
        #[serde(default)]
        name: Option<String>,
    }

    fn csv_with_rows(n: u32) -> String {
        let mut s = String::from("id,name\n");
        for i in 1..=n {
            s.push_str(&format!("{i},item{i}\n"));
        }
        s
    }

    fn collect(input: &str, chunk: usize) -> Vec<Batch<Row>> {
        CsvBatches::<_, Row>::from_reader(Cursor::new(input.to_string()), chunk)
            .unwrap()
            .map(|b| b.unwrap())
            .collect()
    }

    #[test]
    fn chunks_preserve_order_and_size() {
        let batches = collect(&csv_with_rows(250), 100);
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![100, 100, 50]);

        let ids: Vec<u32> = batches
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r.id))
            .collect();
        assert_eq!(ids, (1..=250).collect::<Vec<_>>());
        assert_eq!(batches[2].index, 2);
        assert_eq!(batches[2].first_row, 201);
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_batch() {
        let batches = collect(&csv_with_rows(200), 100);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn header_only_yields_nothing() {
        assert!(collect("id,name\n", 10).is_empty());
    }

    #[test]
    fn undecodable_rows_counted_not_fatal() {
        let input = "id,name\n1,a\nnot-a-number,b\n3,c\n";
        let batches = collect(input, 10);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0].rejected, 1);
    }

    #[test]
    fn rejected_rows_count_toward_chunk_boundary() {
        let input = "id,name\n1,a\nx,b\n3,c\n4,d\n";
        let batches = collect(input, 2);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len() + batches[0].rejected, 2);
        assert_eq!(batches[1].first_row, 3);
    }

    #[test]
    fn short_rows_fill_missing_with_default() {
        let batches = collect("id,name\n1\n2,b\n", 10);
        assert!(batches[0].rows[0].name.is_none());
        assert_eq!(batches[0].rows[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn has_column_checks_header() {
        let batches = collect("id, name \n1,a\n", 10);
        assert!(batches[0].has_column("name"));
        assert!(!batches[0].has_column("sku"));
    }

    #[test]
    fn padded_header_names_still_map_fields() {
        let batches = collect(" id , name \n1, a \n", 10);
        let row = &batches[0].rows[0];
        assert_eq!(row.id, 1);
        // Only header names are trimmed; field values are left to the caller
        assert_eq!(row.name.as_deref(), Some(" a "));
    }

    /// Reader that fails after returning its prefix
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn io_error_is_fatal_and_fuses() {
        let reader = FailingReader {
            data: Cursor::new(b"id,name\n1,a\n2,b".to_vec()),
        };
        let mut batches = CsvBatches::<_, Row>::from_reader(reader, 10).unwrap();
        assert!(matches!(batches.next(), Some(Err(SourceError::Csv(_)))));
        assert!(batches.next().is_none());
    }
}
