//! Per-batch cleaning: numeric coercion, defaults, dedup, text normalization
//!
//! Pure transformation. Never touches storage or the network.

use std::collections::HashSet;

use skuload_core::Batch;

use crate::record::{CleanRecord, RawRecord};
use crate::schema::KEY_COLUMNS;

/// Default for missing category/availability values
pub const UNKNOWN: &str = "unknown";

/// Batch-level cleaning failure; nothing from the batch is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanError {
    /// The source header lacks a key column, so no row can be keyed
    MissingColumn(&'static str),
}

impl std::fmt::Display for CleanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn(col) => write!(f, "missing required column `{col}`"),
        }
    }
}

impl std::error::Error for CleanError {}

/// Output of cleaning one batch
#[derive(Debug, Default)]
pub struct CleanBatch {
    /// Distinct-key records, first occurrence wins, source order kept
    pub records: Vec<CleanRecord>,
    /// Rows dropped as repeats of an earlier key in the same batch
    pub duplicates: usize,
    /// Rows dropped for an empty `product_id` or `sku_id`
    pub missing_key: usize,
}

/// Clean one batch.
///
/// Dedup is per batch only; repeats across batches are absorbed by the
/// store's `INSERT OR IGNORE`.
pub fn clean_batch(batch: Batch<RawRecord>) -> Result<CleanBatch, CleanError> {
    if let Some(col) = KEY_COLUMNS.iter().copied().find(|c| !batch.has_column(c)) {
        return Err(CleanError::MissingColumn(col));
    }

    let mut out = CleanBatch {
        records: Vec::with_capacity(batch.len()),
        ..Default::default()
    };
    let mut seen = HashSet::with_capacity(batch.len());

    for raw in batch.rows {
        let Some(record) = clean_record(raw) else {
            out.missing_key += 1;
            continue;
        };
        if seen.insert(record.key()) {
            out.records.push(record);
        } else {
            out.duplicates += 1;
        }
    }
    Ok(out)
}

/// Type and default one row. `None` if either key part is empty.
pub fn clean_record(raw: RawRecord) -> Option<CleanRecord> {
    let product_id = key_part(raw.product_id)?;
    let sku_id = key_part(raw.sku_id)?;

    Some(CleanRecord {
        product_id,
        sku_id,
        product_name: raw.product_name,
        seller_name: raw.seller_name.as_deref().map(normalize_text),
        brand_name: raw.brand_name.as_deref().map(normalize_text),
        venture_category1_name_en: category(raw.venture_category1_name_en),
        venture_category2_name_en: category(raw.venture_category2_name_en),
        venture_category3_name_en: category(raw.venture_category3_name_en),
        venture_category_name_local: raw.venture_category_name_local.as_deref().map(normalize_text),
        availability: category(raw.availability),
        platform_commission_rate: number_or_zero(&raw.platform_commission_rate),
        promotion_price: number_or_zero(&raw.promotion_price),
        current_price: number_or_zero(&raw.current_price),
        product_commission_rate: number_or_zero(&raw.product_commission_rate),
        seller_rating: number_or_zero(&raw.seller_rating),
        bonus_commission_rate: number_or_zero(&raw.bonus_commission_rate),
        discount_percentage: number_or_zero(&raw.discount_percentage),
        rating_avg_value: number_or_zero(&raw.rating_avg_value),
        price: number_or_zero(&raw.price),
        number_of_reviews: count_or_zero(&raw.number_of_reviews),
        description: raw.description,
        product_url: raw.product_url,
        seller_url: raw.seller_url,
        deeplink: raw.deeplink,
        product_small_img: raw.product_small_img,
        product_medium_img: raw.product_medium_img,
        product_big_img: raw.product_big_img,
        image_url_2: raw.image_url_2,
        image_url_3: raw.image_url_3,
        image_url_4: raw.image_url_4,
        image_url_5: raw.image_url_5,
        business_type: raw.business_type,
        business_area: raw.business_area,
        is_free_shipping: raw.is_free_shipping,
    })
}

/// Parse a cell as a finite number; anything else is missing.
pub fn coerce_number(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Trim, then turn embedded tabs and line breaks into single spaces.
pub fn normalize_text(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

fn key_part(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

fn number_or_zero(value: &Option<String>) -> f64 {
    coerce_number(value.as_deref()).unwrap_or(0.0)
}

/// `"12"` and `"12.0"` both count 12 reviews; `as` saturates out-of-range values
fn count_or_zero(value: &Option<String>) -> i64 {
    coerce_number(value.as_deref()).map_or(0, |n| n as i64)
}

fn category(value: Option<String>) -> String {
    value
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
