//! Read-only post-load check: row count plus a few sample rows

use std::path::Path;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use rusqlite::{Connection, OpenFlags};

use crate::store::{self, SampleRow, StoreError};

/// Rows shown by default
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct Verification {
    pub row_count: u64,
    pub sample: Vec<SampleRow>,
}

/// Count rows and fetch `sample_size` of them over a fresh read-only connection.
///
/// Never writes; a missing database file is an error, not an empty table.
pub fn verify(db_path: &Path, sample_size: usize) -> Result<Verification, StoreError> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| StoreError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;

    let row_count = store::count_rows(&conn)?;
    let sample = store::sample_rows(&conn, sample_size)?;
    Ok(Verification { row_count, sample })
}

impl Verification {
    /// Format the sample as a table.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("product_id").fg(Color::Cyan),
                Cell::new("sku_id").fg(Color::Cyan),
                Cell::new("product_name").fg(Color::Cyan),
                Cell::new("seller_name").fg(Color::Cyan),
            ]);
        for row in &self.sample {
            table.add_row(vec![
                Cell::new(&row.product_id),
                Cell::new(&row.sku_id),
                Cell::new(row.product_name.as_deref().unwrap_or("")),
                Cell::new(row.seller_name.as_deref().unwrap_or("")),
            ]);
        }
        format!(
            "Total rows: {}\n{table}",
            skuload_core::fmt_num(self.row_count as usize)
        )
    }

    pub fn print(&self) {
        println!("{}", self.format_table());
    }

    pub fn log(&self) {
        log::info!("Verification: {} rows in table", self.row_count);
        for row in &self.sample {
            log::info!(
                "  sample: ({}, {}, {}, {})",
                row.product_id,
                row.sku_id,
                row.product_name.as_deref().unwrap_or("NULL"),
                row.seller_name.as_deref().unwrap_or("NULL")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CleanRecord;
    use crate::store::Store;

    #[test]
    fn reports_count_and_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.db");
        let records: Vec<_> = (0..8)
            .map(|i| {
                let mut r = CleanRecord::for_key(&i.to_string(), "s");
                r.seller_name = Some("Shop".into());
                r
            })
            .collect();
        Store::open(&path).unwrap().insert_batch(&records, 100).unwrap();

        let v = verify(&path, DEFAULT_SAMPLE_SIZE).unwrap();
        assert_eq!(v.row_count, 8);
        assert_eq!(v.sample.len(), 5);
        assert_eq!(v.sample[0].seller_name.as_deref(), Some("Shop"));

        let table = v.format_table();
        assert!(table.starts_with("Total rows: 8"));
        assert!(table.contains("seller_name"));
    }

    #[test]
    fn missing_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(matches!(verify(&path, 5), Err(StoreError::Open { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn empty_table_verifies_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.db");
        Store::open(&path).unwrap();

        let v = verify(&path, 5).unwrap();
        assert_eq!(v.row_count, 0);
        assert!(v.sample.is_empty());
    }
}
