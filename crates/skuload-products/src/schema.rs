//! SQLite schema for the `products` table
//!
//! Column order here is the bind order used by [`crate::store::Store`].

use rusqlite::ToSql;

use crate::record::CleanRecord;

pub const TABLE: &str = "products";

/// Columns coerced to numbers; missing or unparsable values become 0
pub const NUMERIC_COLUMNS: [&str; 10] = [
    "platform_commission_rate",
    "promotion_price",
    "current_price",
    "product_commission_rate",
    "seller_rating",
    "bonus_commission_rate",
    "discount_percentage",
    "rating_avg_value",
    "price",
    "number_of_reviews",
];

/// Columns defaulted to `"unknown"` when missing
pub const CATEGORY_COLUMNS: [&str; 4] = [
    "availability",
    "venture_category1_name_en",
    "venture_category2_name_en",
    "venture_category3_name_en",
];

/// Free-text columns trimmed and stripped of tabs/newlines
pub const TEXT_COLUMNS: [&str; 3] = ["brand_name", "seller_name", "venture_category_name_local"];

/// Listing details passed through as text
pub const DETAIL_COLUMNS: [&str; 14] = [
    "description",
    "product_url",
    "seller_url",
    "deeplink",
    "product_small_img",
    "product_medium_img",
    "product_big_img",
    "image_url_2",
    "image_url_3",
    "image_url_4",
    "image_url_5",
    "business_type",
    "business_area",
    "is_free_shipping",
];

/// Natural key
pub const KEY_COLUMNS: [&str; 2] = ["product_id", "sku_id"];

/// All stored columns, in bind order
pub const COLUMNS: [&str; 34] = [
    // === Identifiers ===
    "product_id",
    "sku_id",
    // === Descriptive ===
    "product_name",
    "seller_name",
    "brand_name",
    "venture_category1_name_en",
    "venture_category2_name_en",
    "venture_category3_name_en",
    "venture_category_name_local",
    "availability",
    // === Commercial ===
    "platform_commission_rate",
    "promotion_price",
    "current_price",
    "product_commission_rate",
    "seller_rating",
    "bonus_commission_rate",
    "discount_percentage",
    "rating_avg_value",
    "price",
    "number_of_reviews",
    // === Listing details ===
    "description",
    "product_url",
    "seller_url",
    "deeplink",
    "product_small_img",
    "product_medium_img",
    "product_big_img",
    "image_url_2",
    "image_url_3",
    "image_url_4",
    "image_url_5",
    "business_type",
    "business_area",
    "is_free_shipping",
];

pub const CREATE_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS products (
    product_id TEXT NOT NULL,
    sku_id TEXT NOT NULL,
    product_name TEXT,
    seller_name TEXT,
    brand_name TEXT,
    venture_category1_name_en TEXT NOT NULL,
    venture_category2_name_en TEXT NOT NULL,
    venture_category3_name_en TEXT NOT NULL,
    venture_category_name_local TEXT,
    availability TEXT NOT NULL,
    platform_commission_rate REAL NOT NULL,
    promotion_price REAL NOT NULL,
    current_price REAL NOT NULL,
    product_commission_rate REAL NOT NULL,
    seller_rating REAL NOT NULL,
    bonus_commission_rate REAL NOT NULL,
    discount_percentage REAL NOT NULL,
    rating_avg_value REAL NOT NULL,
    price REAL NOT NULL,
    number_of_reviews INTEGER NOT NULL,
    description TEXT,
    product_url TEXT,
    seller_url TEXT,
    deeplink TEXT,
    product_small_img TEXT,
    product_medium_img TEXT,
    product_big_img TEXT,
    image_url_2 TEXT,
    image_url_3 TEXT,
    image_url_4 TEXT,
    image_url_5 TEXT,
    business_type TEXT,
    business_area TEXT,
    is_free_shipping TEXT,
    PRIMARY KEY (product_id, sku_id)
)";

/// Multi-row `INSERT OR IGNORE` for `rows` records.
///
/// Conflicting keys are skipped, never overwritten.
pub fn insert_sql(rows: usize) -> String {
    let placeholders = format!("({})", vec!["?"; COLUMNS.len()].join(","));
    let values = vec![placeholders.as_str(); rows].join(",");
    format!(
        "INSERT OR IGNORE INTO {TABLE} ({}) VALUES {values}",
        COLUMNS.join(",")
    )
}

/// Append `record`'s values to `out` in [`COLUMNS`] order.
pub fn push_params<'a>(record: &'a CleanRecord, out: &mut Vec<&'a dyn ToSql>) {
    let params: [&'a dyn ToSql; COLUMNS.len()] = [
        &record.product_id,
        &record.sku_id,
        &record.product_name,
        &record.seller_name,
        &record.brand_name,
        &record.venture_category1_name_en,
        &record.venture_category2_name_en,
        &record.venture_category3_name_en,
        &record.venture_category_name_local,
        &record.availability,
        &record.platform_commission_rate,
        &record.promotion_price,
        &record.current_price,
        &record.product_commission_rate,
        &record.seller_rating,
        &record.bonus_commission_rate,
        &record.discount_percentage,
        &record.rating_avg_value,
        &record.price,
        &record.number_of_reviews,
        &record.description,
        &record.product_url,
        &record.seller_url,
        &record.deeplink,
        &record.product_small_img,
        &record.product_medium_img,
        &record.product_big_img,
        &record.image_url_2,
        &record.image_url_3,
        &record.image_url_4,
        &record.image_url_5,
        &record.business_type,
        &record.business_area,
        &record.is_free_shipping,
    ];
    out.extend_from_slice(&params);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_has_one_placeholder_per_value() {
        let sql = insert_sql(3);
        assert!(sql.starts_with("INSERT OR IGNORE INTO products (product_id,sku_id,"));
        assert_eq!(sql.matches('?').count(), 3 * COLUMNS.len());
        assert_eq!(sql.matches("),(").count(), 2);
    }

    #[test]
    fn params_follow_column_order() {
        let record = CleanRecord::for_key("p1", "s1");
        let mut params = Vec::new();
        push_params(&record, &mut params);
        assert_eq!(params.len(), COLUMNS.len());
    }

    #[test]
    fn column_groups_are_stored() {
        for col in NUMERIC_COLUMNS
            .iter()
            .chain(&CATEGORY_COLUMNS)
            .chain(&TEXT_COLUMNS)
            .chain(&KEY_COLUMNS)
            .chain(&DETAIL_COLUMNS)
        {
            assert!(COLUMNS.contains(col), "{col} missing from COLUMNS");
            assert!(CREATE_TABLE.contains(col), "{col} missing from DDL");
        }
    }
}
