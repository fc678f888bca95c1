//! Data models for the dashboard.
//!
//! This module contains the typed input rows produced by the loader,
//! the derived tables produced by the aggregation layer, and the
//! assembled [`Dashboard`] consumed by the report generator.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// One payment row of the revenue table.
///
/// An order paid in several installments appears several times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueRow {
    pub order_id: String,
    pub order_purchase_timestamp: NaiveDateTime,
    pub payment_value: f64,
}

/// One row of the shipping table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShippingRecord {
    pub order_id: String,
    pub order_purchase_timestamp: Option<NaiveDateTime>,
    pub shipping_limit_date: Option<NaiveDateTime>,
    pub order_delivered_carrier_date: Option<NaiveDateTime>,
    /// Late flag supplied by the extract, if any.
    pub late_delivery: Option<bool>,
    /// Filled in by `append_delay_days`; `None` on freshly loaded rows.
    pub delay_days: Option<i64>,
}

impl ShippingRecord {
    /// Signed whole calendar days between the shipping limit and the
    /// hand-over to the carrier. Positive means the carrier got it late.
    pub fn computed_delay_days(&self) -> Option<i64> {
        if self.delay_days.is_some() {
            return self.delay_days;
        }
        let limit = self.shipping_limit_date?.date();
        let carrier = self.order_delivered_carrier_date?.date();
        Some((carrier - limit).num_days())
    }

    /// Late status: the supplied flag wins, otherwise `delay_days > 0`.
    pub fn is_late(&self) -> Option<bool> {
        self.late_delivery
            .or_else(|| self.computed_delay_days().map(|days| days > 0))
    }
}

/// A review attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReview {
    pub order_id: String,
    pub review_score: u8,
}

/// A review together with the category of the reviewed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReview {
    pub order_id: String,
    pub product_category_name_english: String,
    pub review_score: u8,
}

/// One sold line item with its product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub order_id: String,
    pub product_category_name_english: String,
    pub price: f64,
}

/// One sold line item with its seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerItem {
    pub order_id: String,
    pub seller_id: String,
    pub price: f64,
}

/// Seller location lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub seller_id: String,
    pub seller_city: String,
    pub seller_state: String,
}

/// A customer with the geolocation of their zip code prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerLocation {
    pub customer_unique_id: String,
    pub geolocation_city: String,
    pub geolocation_state: String,
    pub geolocation_lat: Option<f64>,
    pub geolocation_lng: Option<f64>,
}

// ---------------------------------------------------------------------------
// Derived tables
// ---------------------------------------------------------------------------

/// Customers per city with the city's mean coordinates.
///
/// Coordinates are optional on load: a city whose customers all lacked a
/// location is written with empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerGeoAgg {
    pub geolocation_city: String,
    pub geolocation_state: String,
    pub geolocation_lat: Option<f64>,
    pub geolocation_lng: Option<f64>,
    #[serde(rename = "jumlah_customer")]
    pub customer_count: u64,
}

/// Number of distinct orders that received a given review score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCount {
    pub review_score: u8,
    #[serde(rename = "jumlah_order")]
    pub order_count: u64,
}

/// Share of low reviews within a product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowRatingRatio {
    pub product_category_name_english: String,
    pub low_review: u64,
    pub total_review: u64,
    /// Percentage in `0.0..=100.0`.
    pub low_review_ratio: f64,
}

/// Delivery status of an order relative to its shipping limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[serde(rename = "On Time")]
    OnTime,
    #[serde(rename = "Late")]
    Late,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::OnTime => write!(f, "On Time"),
            DeliveryStatus::Late => write!(f, "Late"),
        }
    }
}

impl From<bool> for DeliveryStatus {
    fn from(late: bool) -> Self {
        if late {
            DeliveryStatus::Late
        } else {
            DeliveryStatus::OnTime
        }
    }
}

/// Number of orders per delivery status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatusCount {
    #[serde(rename = "Delivery Status")]
    pub status: DeliveryStatus,
    #[serde(rename = "Count")]
    pub count: u64,
}

/// A shipping row that reached the carrier after its limit date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LateOrder {
    pub order_id: String,
    pub shipping_limit_date: Option<NaiveDateTime>,
    pub order_delivered_carrier_date: Option<NaiveDateTime>,
    pub delay_days: Option<i64>,
}

/// Orders and revenue of one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyOrders {
    /// First day of the month.
    pub order_month: NaiveDate,
    pub order_count: u64,
    pub revenue: f64,
}

/// Purchases per product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySales {
    pub product_category_name_english: String,
    #[serde(rename = "jumlah_pembelian")]
    pub purchase_count: u64,
    #[serde(rename = "total_harga")]
    pub total_price: f64,
}

/// Orders and sales per seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerVolume {
    pub seller_id: String,
    /// Empty when the seller is missing from the seller lookup.
    pub seller_city: String,
    pub seller_state: String,
    #[serde(rename = "jumlah_order")]
    pub order_count: u64,
    #[serde(rename = "total_penjualan")]
    pub total_sales: f64,
}

// ---------------------------------------------------------------------------
// Behaviour switches
// ---------------------------------------------------------------------------

/// Row order of the review score distribution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RatingOrder {
    /// Ascending review score (1 to 5)
    #[default]
    Score,
    /// Descending order count
    Count,
}

/// Output shape of the delayed order classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DelayMode {
    /// Count of orders per delivery status
    #[default]
    Summary,
    /// The late shipping rows themselves
    LateRows,
}

/// Which categories take part in the low-rating ratio.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum LowRatingJoin {
    /// Every reviewed category; no low reviews means ratio 0
    #[default]
    AllCategories,
    /// Only categories with at least one low review (legacy extracts)
    LowReviewedOnly,
}

/// Knobs of the aggregation layer, resolved from config and CLI.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSettings {
    pub min_reviews: u64,
    pub low_score_max: u8,
    pub rating_order: RatingOrder,
    pub delay_mode: DelayMode,
    pub low_rating_join: LowRatingJoin,
    pub top_categories: usize,
    pub top_sellers: usize,
    pub top_low_rated: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            min_reviews: 100,
            low_score_max: 2,
            rating_order: RatingOrder::default(),
            delay_mode: DelayMode::default(),
            low_rating_join: LowRatingJoin::default(),
            top_categories: 5,
            top_sellers: 10,
            top_low_rated: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Either shape of the delayed order classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "rows", rename_all = "kebab-case")]
pub enum DeliveryView {
    Summary(Vec<DeliveryStatusCount>),
    LateRows(Vec<LateOrder>),
}

impl DeliveryView {
    /// Returns true if the view holds no rows.
    pub fn is_empty(&self) -> bool {
        match self {
            DeliveryView::Summary(rows) => rows.is_empty(),
            DeliveryView::LateRows(rows) => rows.is_empty(),
        }
    }
}

/// Headline numbers shown above the monthly chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_orders: u64,
    pub total_revenue: f64,
}

/// A seller row prepared for the top-seller chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerHighlight {
    /// First three characters of the seller id, used as axis label.
    pub short_id: String,
    pub seller: SellerVolume,
}

/// A circle marker on the customer map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    pub label: String,
}

/// Map widget data: centre point and one marker per city.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerMap {
    /// `(lat, lng)`; `None` when there are no cities.
    pub center: Option<(f64, f64)>,
    pub markers: Vec<MapMarker>,
}

/// Customers per state with the mean of the state's city coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub geolocation_state: String,
    /// `None` when no city in the state has coordinates.
    pub geolocation_lat: Option<f64>,
    pub geolocation_lng: Option<f64>,
    #[serde(rename = "jumlah_customer")]
    pub customer_count: u64,
}

/// Sidebar highlights.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlights {
    /// City with the most customers.
    pub top_city: Option<String>,
    /// Category with the most purchases.
    pub top_category: Option<String>,
}

/// Metadata about the dashboard run.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetadata {
    pub generated_at: DateTime<Utc>,
    pub data_dir: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub data_start: NaiveDate,
    pub data_end: NaiveDate,
    /// Revenue rows left after the date filter.
    pub revenue_rows: usize,
}

/// Everything the report generator renders.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub highlights: Highlights,
    pub metrics: Metrics,
    pub monthly_orders: Vec<MonthlyOrders>,
    pub delivery: DeliveryView,
    pub rating_distribution: Vec<RatingCount>,
    pub top_categories: Vec<CategorySales>,
    pub bottom_categories: Vec<CategorySales>,
    pub top_sellers: Vec<SellerHighlight>,
    pub low_rated_categories: Vec<LowRatingRatio>,
    pub customer_map: CustomerMap,
    pub state_summary: Vec<StateSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn record(limit: Option<NaiveDateTime>, carrier: Option<NaiveDateTime>) -> ShippingRecord {
        ShippingRecord {
            order_id: "o1".to_string(),
            order_purchase_timestamp: None,
            shipping_limit_date: limit,
            order_delivered_carrier_date: carrier,
            late_delivery: None,
            delay_days: None,
        }
    }

    #[test]
    fn test_delay_days_uses_calendar_dates() {
        let rec = record(Some(at(2018, 1, 10, 23)), Some(at(2018, 1, 12, 1)));
        assert_eq!(rec.computed_delay_days(), Some(2));
        assert_eq!(rec.is_late(), Some(true));

        let same_day = record(Some(at(2018, 1, 10, 8)), Some(at(2018, 1, 10, 20)));
        assert_eq!(same_day.computed_delay_days(), Some(0));
        assert_eq!(same_day.is_late(), Some(false));

        let early = record(Some(at(2018, 1, 10, 8)), Some(at(2018, 1, 7, 8)));
        assert_eq!(early.computed_delay_days(), Some(-3));
    }

    #[test]
    fn test_supplied_flag_wins() {
        let mut rec = record(Some(at(2018, 1, 10, 0)), Some(at(2018, 1, 12, 0)));
        rec.late_delivery = Some(false);
        assert_eq!(rec.is_late(), Some(false));
    }

    #[test]
    fn test_unknown_status_without_dates() {
        let rec = record(Some(at(2018, 1, 10, 0)), None);
        assert_eq!(rec.computed_delay_days(), None);
        assert_eq!(rec.is_late(), None);
    }

    #[test]
    fn test_delivery_status_display() {
        assert_eq!(DeliveryStatus::from(true).to_string(), "Late");
        assert_eq!(DeliveryStatus::from(false).to_string(), "On Time");
    }

    #[test]
    fn test_delivery_view_serializes_mode() {
        let view = DeliveryView::Summary(vec![DeliveryStatusCount {
            status: DeliveryStatus::Late,
            count: 3,
        }]);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("\"mode\":\"summary\""));
        assert!(json.contains("\"Delivery Status\":\"Late\""));
    }
}
