//! Product rows: as delivered by the feed, and after cleaning

use serde::Deserialize;

/// One CSV row as delivered. Every column is untyped text; empty or absent
/// cells are `None`. Header names outside the feed schema are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub product_id: Option<String>,
    pub sku_id: Option<String>,
    pub product_name: Option<String>,
    pub seller_name: Option<String>,
    pub brand_name: Option<String>,
    pub venture_category1_name_en: Option<String>,
    pub venture_category2_name_en: Option<String>,
    pub venture_category3_name_en: Option<String>,
    pub venture_category_name_local: Option<String>,
    pub availability: Option<String>,
    pub platform_commission_rate: Option<String>,
    pub promotion_price: Option<String>,
    pub current_price: Option<String>,
    pub product_commission_rate: Option<String>,
    pub seller_rating: Option<String>,
    pub bonus_commission_rate: Option<String>,
    pub discount_percentage: Option<String>,
    pub rating_avg_value: Option<String>,
    pub price: Option<String>,
    pub number_of_reviews: Option<String>,
    // Listing details, stored as delivered
    pub description: Option<String>,
    pub product_url: Option<String>,
    pub seller_url: Option<String>,
    pub deeplink: Option<String>,
    pub product_small_img: Option<String>,
    pub product_medium_img: Option<String>,
    pub product_big_img: Option<String>,
    pub image_url_2: Option<String>,
    pub image_url_3: Option<String>,
    pub image_url_4: Option<String>,
    pub image_url_5: Option<String>,
    pub business_type: Option<String>,
    pub business_area: Option<String>,
    pub is_free_shipping: Option<String>,
}

/// A typed, defaulted row ready for storage.
///
/// Numeric fields are always finite numbers; category fields are never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub product_id: String,
    pub sku_id: String,
    pub product_name: Option<String>,
    pub seller_name: Option<String>,
    pub brand_name: Option<String>,
    pub venture_category1_name_en: String,
    pub venture_category2_name_en: String,
    pub venture_category3_name_en: String,
    pub venture_category_name_local: Option<String>,
    pub availability: String,
    pub platform_commission_rate: f64,
    pub promotion_price: f64,
    pub current_price: f64,
    pub product_commission_rate: f64,
    pub seller_rating: f64,
    pub bonus_commission_rate: f64,
    pub discount_percentage: f64,
    pub rating_avg_value: f64,
    pub price: f64,
    pub number_of_reviews: i64,
    pub description: Option<String>,
    pub product_url: Option<String>,
    pub seller_url: Option<String>,
    pub deeplink: Option<String>,
    pub product_small_img: Option<String>,
    pub product_medium_img: Option<String>,
    pub product_big_img: Option<String>,
    pub image_url_2: Option<String>,
    pub image_url_3: Option<String>,
    pub image_url_4: Option<String>,
    pub image_url_5: Option<String>,
    pub business_type: Option<String>,
    pub business_area: Option<String>,
    pub is_free_shipping: Option<String>,
}

/// Natural key of a product variant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub product_id: String,
    pub sku_id: String,
}

impl CleanRecord {
    pub fn key(&self) -> ProductKey {
        ProductKey {
            product_id: self.product_id.clone(),
            sku_id: self.sku_id.clone(),
        }
    }
}

#[cfg(test)]
impl CleanRecord {
    /// All-default record with the given key
    pub(crate) fn for_key(product_id: &str, sku_id: &str) -> Self {
        let unknown = || crate::clean::UNKNOWN.to_string();
        Self {
            product_id: product_id.to_string(),
            sku_id: sku_id.to_string(),
            product_name: None,
            seller_name: None,
            brand_name: None,
            venture_category1_name_en: unknown(),
            venture_category2_name_en: unknown(),
            venture_category3_name_en: unknown(),
            venture_category_name_local: None,
            availability: unknown(),
            platform_commission_rate: 0.0,
            promotion_price: 0.0,
            current_price: 0.0,
            product_commission_rate: 0.0,
            seller_rating: 0.0,
            bonus_commission_rate: 0.0,
            discount_percentage: 0.0,
            rating_avg_value: 0.0,
            price: 0.0,
            number_of_reviews: 0,
            description: None,
            product_url: None,
            seller_url: None,
            deeplink: None,
            product_small_img: None,
            product_medium_img: None,
            product_big_img: None,
            image_url_2: None,
            image_url_3: None,
            image_url_4: None,
            image_url_5: None,
            business_type: None,
            business_area: None,
            is_free_shipping: None,
        }
    }
}
