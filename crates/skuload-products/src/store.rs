//! SQLite storage for cleaned product rows
//!
//! A [`Store`] owns the only write connection. Whoever holds it may write;
//! see [`crate::writer`] for how workers share it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, ToSql};

use crate::record::CleanRecord;
use crate::schema::{self, COLUMNS, CREATE_TABLE, TABLE};

/// SQLite's bound-parameter ceiling (SQLITE_MAX_VARIABLE_NUMBER since 3.32)
const MAX_BOUND_PARAMS: usize = 32_766;

/// Rows per multi-row INSERT when not configured
pub const DEFAULT_INSERT_BATCH: usize = 100;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Negative means KiB: ~20 MB of page cache
const CACHE_SIZE_KIB: i64 = -20_000;

#[derive(Debug)]
pub enum StoreError {
    /// Could not open or prepare the database file
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    Sqlite(rusqlite::Error),
    /// The writer thread is gone; nothing was written
    WriterClosed,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "cannot open {}: {source}", path.display())
            }
            Self::Sqlite(e) => write!(f, "SQLite: {e}"),
            Self::WriterClosed => write!(f, "store writer is not running"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(e) => Some(e),
            Self::WriterClosed => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

/// First columns of a stored row, for operator inspection
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub product_id: String,
    pub sku_id: String,
    pub product_name: Option<String>,
    pub seller_name: Option<String>,
}

/// Exclusive write handle to the products database.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the table exists.
    ///
    /// Durability is relaxed (`synchronous = OFF`): a crash may lose the last
    /// transaction, which a re-run restores.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            // Let SQLite report the failure if this doesn't work
            let _ = std::fs::create_dir_all(parent);
        }

        let conn = Connection::open(path).map_err(open_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;
        conn.pragma_update(None, "synchronous", "OFF")
            .map_err(open_err)?;
        conn.pragma_update(None, "cache_size", CACHE_SIZE_KIB)
            .map_err(open_err)?;
        conn.execute_batch(CREATE_TABLE).map_err(open_err)?;

        log::debug!("opened {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert `records` in one transaction, skipping keys already stored.
    ///
    /// Statements carry `rows_per_statement` rows each. Returns the number of
    /// rows actually added; replaying the same records returns 0.
    pub fn insert_batch(
        &mut self,
        records: &[CleanRecord],
        rows_per_statement: usize,
    ) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let per_stmt = rows_per_statement.clamp(1, MAX_BOUND_PARAMS / COLUMNS.len());

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(per_stmt * COLUMNS.len());
        for chunk in records.chunks(per_stmt) {
            params.clear();
            for record in chunk {
                schema::push_params(record, &mut params);
            }
            let mut stmt = tx.prepare_cached(&schema::insert_sql(chunk.len()))?;
            inserted += stmt.execute(params.as_slice())?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn row_count(&self) -> Result<u64, StoreError> {
        Ok(count_rows(&self.conn)?)
    }

    pub fn sample(&self, n: usize) -> Result<Vec<SampleRow>, StoreError> {
        Ok(sample_rows(&self.conn, n)?)
    }
}

/// Total rows in the products table
pub fn count_rows(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| n.max(0) as u64)
}

/// First `n` rows in storage order
pub fn sample_rows(conn: &Connection, n: usize) -> rusqlite::Result<Vec<SampleRow>> {
    let limit = i64::try_from(n).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "SELECT product_id, sku_id, product_name, seller_name FROM {TABLE} LIMIT ?1"
    ))?;
    let rows = stmt.query_map([limit], |row| {
        Ok(SampleRow {
            product_id: row.get(0)?,
            sku_id: row.get(1)?,
            product_name: row.get(2)?,
            seller_name: row.get(3)?,
        })
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn records(range: std::ops::Range<usize>) -> Vec<CleanRecord> {
        range
            .map(|i| {
                let mut r = CleanRecord::for_key(&format!("p{i}"), "s");
                r.price = i as f64;
                r.product_name = Some(format!("item {i}"));
                r
            })
            .collect()
    }

    fn open_temp() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("products.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn replaying_records_is_a_no_op() {
        let (_dir, mut store) = open_temp();
        let batch = records(0..40);

        assert_eq!(store.insert_batch(&batch, 100).unwrap(), 40);
        assert_eq!(store.insert_batch(&batch, 100).unwrap(), 0);
        assert_eq!(store.row_count().unwrap(), 40);
    }

    #[test]
    fn conflicting_key_keeps_existing_row() {
        let (_dir, mut store) = open_temp();
        let mut first = CleanRecord::for_key("p1", "s1");
        first.price = 10.0;
        let mut second = first.clone();
        second.price = 99.0;

        store.insert_batch(&[first], 100).unwrap();
        assert_eq!(store.insert_batch(&[second], 100).unwrap(), 0);

        let price: f64 = store
            .conn
            .query_row("SELECT price FROM products WHERE product_id = 'p1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(price, 10.0);
    }

    #[test]
    fn listing_details_stored_as_text() {
        let (_dir, mut store) = open_temp();
        let mut record = CleanRecord::for_key("p1", "s1");
        record.deeplink = Some("https://example.test/d/p1".to_string());
        store.insert_batch(&[record], 100).unwrap();

        let (deeplink, description): (Option<String>, Option<String>) = store
            .conn
            .query_row(
                "SELECT deeplink, description FROM products WHERE product_id = 'p1'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(deeplink.as_deref(), Some("https://example.test/d/p1"));
        assert!(description.is_none());
    }

    #[test]
    fn splits_into_statements_of_configured_size() {
        let (_dir, mut store) = open_temp();
        // 250 rows at 100 per statement: 100 + 100 + 50
        assert_eq!(store.insert_batch(&records(0..250), 100).unwrap(), 250);
        // Overlapping replay counts only the new tail
        assert_eq!(store.insert_batch(&records(200..260), 7).unwrap(), 10);
        assert_eq!(store.row_count().unwrap(), 260);
    }

    #[test]
    fn oversized_statement_is_clamped() {
        let (_dir, mut store) = open_temp();
        assert_eq!(store.insert_batch(&records(0..2000), 100_000).unwrap(), 2000);
    }

    #[test]
    fn empty_insert_touches_nothing() {
        let (_dir, mut store) = open_temp();
        assert_eq!(store.insert_batch(&[], 100).unwrap(), 0);
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn sample_returns_key_columns() {
        let (_dir, mut store) = open_temp();
        store.insert_batch(&records(0..10), 100).unwrap();

        let sample = store.sample(5).unwrap();
        assert_eq!(sample.len(), 5);
        assert_eq!(sample[0].sku_id, "s");
        assert!(sample[0].product_name.as_deref().unwrap().starts_with("item "));
        assert!(store.sample(50).unwrap().len() == 10);
    }

    #[test]
    fn reopen_keeps_rows_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("products.db");
        {
            let mut store = Store::open(&path).unwrap();
            store.insert_batch(&records(0..3), 100).unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert_eq!(store.row_count().unwrap(), 3);
        assert_eq!(store.path(), path);
    }

    #[test]
    fn pragmas_applied() {
        let (_dir, store) = open_temp();
        let sync: i64 = store
            .conn
            .pragma_query_value(None, "synchronous", |r| r.get(0))
            .unwrap();
        let cache: i64 = store
            .conn
            .pragma_query_value(None, "cache_size", |r| r.get(0))
            .unwrap();
        assert_eq!(sync, 0);
        assert_eq!(cache, CACHE_SIZE_KIB);
    }
}
