//! Typed CSV ingestion.
//!
//! Each table is read once, its header is checked against the columns the
//! aggregation layer needs, and dates, booleans and review scores are
//! parsed into typed rows here so no transform ever sees raw strings.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{
    CategoryItem, CategoryReview, CategorySales, CustomerGeoAgg, CustomerLocation,
    LowRatingRatio, OrderReview, RevenueRow, Seller, SellerItem, SellerVolume, ShippingRecord,
};
use chrono::{NaiveDateTime, NaiveTime};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File names of the dashboard tables inside the data directory.
#[derive(Debug, Clone)]
pub struct DataFiles {
    pub revenue: String,
    pub orders_shipping: String,
    pub order_reviews: String,
    pub category_sales: String,
    pub customer_geo: String,
    pub low_rating: String,
    pub seller_volume: String,
}

impl Default for DataFiles {
    fn default() -> Self {
        Self {
            revenue: "revenue.csv".to_string(),
            orders_shipping: "orders_shipping.csv".to_string(),
            order_reviews: "order_reviews.csv".to_string(),
            category_sales: "category_sales.csv".to_string(),
            customer_geo: "customer_geo_agg.csv".to_string(),
            low_rating: "rating_rendah.csv".to_string(),
            seller_volume: "seller_volume.csv".to_string(),
        }
    }
}

impl From<&crate::config::DataConfig> for DataFiles {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            revenue: config.revenue.clone(),
            orders_shipping: config.orders_shipping.clone(),
            order_reviews: config.order_reviews.clone(),
            category_sales: config.category_sales.clone(),
            customer_geo: config.customer_geo.clone(),
            low_rating: config.low_rating.clone(),
            seller_volume: config.seller_volume.clone(),
        }
    }
}

/// File names of the raw line-item extracts.
pub mod raw_files {
    pub const CUSTOMERS_GEO: &str = "customers_geo.csv";
    pub const CATEGORY_ITEMS: &str = "category_items.csv";
    pub const CATEGORY_REVIEWS: &str = "category_reviews.csv";
    pub const SELLER_ITEMS: &str = "seller_items.csv";
    pub const SELLERS: &str = "sellers.csv";
}

/// Required header of each table.
pub mod columns {
    pub const REVENUE: &[&str] = &["order_id", "order_purchase_timestamp", "payment_value"];
    pub const ORDERS_SHIPPING: &[&str] = &[
        "order_id",
        "shipping_limit_date",
        "order_delivered_carrier_date",
        "order_purchase_timestamp",
    ];
    pub const ORDER_REVIEWS: &[&str] = &["order_id", "review_score"];
    pub const CATEGORY_SALES: &[&str] =
        &["product_category_name_english", "jumlah_pembelian", "total_harga"];
    pub const CUSTOMER_GEO_AGG: &[&str] = &[
        "geolocation_city",
        "geolocation_state",
        "geolocation_lat",
        "geolocation_lng",
        "jumlah_customer",
    ];
    pub const RATING_RENDAH: &[&str] = &[
        "product_category_name_english",
        "low_review",
        "total_review",
        "low_review_ratio",
    ];
    pub const SELLER_VOLUME: &[&str] = &[
        "seller_id",
        "seller_city",
        "seller_state",
        "jumlah_order",
        "total_penjualan",
    ];
    pub const CUSTOMERS_GEO: &[&str] = &[
        "customer_unique_id",
        "geolocation_city",
        "geolocation_state",
        "geolocation_lat",
        "geolocation_lng",
    ];
    pub const CATEGORY_ITEMS: &[&str] = &["order_id", "product_category_name_english", "price"];
    pub const CATEGORY_REVIEWS: &[&str] =
        &["order_id", "product_category_name_english", "review_score"];
    pub const SELLER_ITEMS: &[&str] = &["order_id", "seller_id", "price"];
    pub const SELLERS: &[&str] = &["seller_id", "seller_city", "seller_state"];
}

/// Every table the dashboard renders from.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub revenue: Vec<RevenueRow>,
    pub shipping: Vec<ShippingRecord>,
    pub order_reviews: Vec<OrderReview>,
    pub category_sales: Vec<CategorySales>,
    pub customer_geo: Vec<CustomerGeoAgg>,
    pub low_rating: Vec<LowRatingRatio>,
    pub seller_volume: Vec<SellerVolume>,
}

impl Dataset {
    /// `(table, rows)` pairs, in load order.
    pub fn row_counts(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("revenue", self.revenue.len()),
            ("orders_shipping", self.shipping.len()),
            ("order_reviews", self.order_reviews.len()),
            ("category_sales", self.category_sales.len()),
            ("customer_geo_agg", self.customer_geo.len()),
            ("rating_rendah", self.low_rating.len()),
            ("seller_volume", self.seller_volume.len()),
        ]
    }
}

/// Raw line-item tables used to build the pre-aggregated extracts.
#[derive(Debug, Clone)]
pub struct RawDataset {
    pub customers: Vec<CustomerLocation>,
    pub category_items: Vec<CategoryItem>,
    pub category_reviews: Vec<CategoryReview>,
    pub seller_items: Vec<SellerItem>,
    pub sellers: Vec<Seller>,
}

/// A CSV row type that becomes a typed row after field parsing.
trait TypedRow: DeserializeOwned {
    type Row;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// `row` is the 1-based data row number, used in error messages.
    fn into_row(self, row: usize) -> AnalysisResult<Self::Row>;
}

/// Parse a timestamp written as a date or a date-time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parse a boolean written by pandas, a spreadsheet or by hand.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a 1..=5 review score; `"4.0"` is accepted.
pub fn parse_score(value: &str) -> Option<u8> {
    let value = value.trim();
    let score = value.parse::<u8>().ok().or_else(|| {
        let float = value.parse::<f64>().ok()?;
        (float.fract() == 0.0 && (0.0..=255.0).contains(&float)).then_some(float as u8)
    })?;
    (1..=5).contains(&score).then_some(score)
}

fn required_timestamp(table: &str, column: &str, row: usize, value: &str) -> AnalysisResult<NaiveDateTime> {
    parse_timestamp(value).ok_or_else(|| AnalysisError::type_mismatch(table, column, row, value))
}

fn optional_timestamp(
    table: &str,
    column: &str,
    row: usize,
    value: Option<String>,
) -> AnalysisResult<Option<NaiveDateTime>> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_timestamp(table, column, row, v).map(Some),
    }
}

fn score(table: &str, row: usize, value: &str) -> AnalysisResult<u8> {
    parse_score(value).ok_or_else(|| AnalysisError::type_mismatch(table, "review_score", row, value))
}

#[derive(Debug, Deserialize)]
struct RevenueCsv {
    order_id: String,
    order_purchase_timestamp: String,
    payment_value: f64,
}

impl TypedRow for RevenueCsv {
    type Row = RevenueRow;
    const TABLE: &'static str = "revenue";
    const COLUMNS: &'static [&'static str] = columns::REVENUE;

    fn into_row(self, row: usize) -> AnalysisResult<RevenueRow> {
        Ok(RevenueRow {
            order_purchase_timestamp: required_timestamp(
                Self::TABLE,
                "order_purchase_timestamp",
                row,
                &self.order_purchase_timestamp,
            )?,
            order_id: self.order_id,
            payment_value: self.payment_value,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ShippingCsv {
    order_id: String,
    order_purchase_timestamp: Option<String>,
    shipping_limit_date: Option<String>,
    order_delivered_carrier_date: Option<String>,
    #[serde(default)]
    late_delivery: Option<String>,
}

impl TypedRow for ShippingCsv {
    type Row = ShippingRecord;
    const TABLE: &'static str = "orders_shipping";
    const COLUMNS: &'static [&'static str] = columns::ORDERS_SHIPPING;

    fn into_row(self, row: usize) -> AnalysisResult<ShippingRecord> {
        let late_delivery = match self.late_delivery.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(
                parse_bool(v)
                    .ok_or_else(|| AnalysisError::type_mismatch(Self::TABLE, "late_delivery", row, v))?,
            ),
        };

        Ok(ShippingRecord {
            order_purchase_timestamp: optional_timestamp(
                Self::TABLE,
                "order_purchase_timestamp",
                row,
                self.order_purchase_timestamp,
            )?,
            shipping_limit_date: optional_timestamp(
                Self::TABLE,
                "shipping_limit_date",
                row,
                self.shipping_limit_date,
            )?,
            order_delivered_carrier_date: optional_timestamp(
                Self::TABLE,
                "order_delivered_carrier_date",
                row,
                self.order_delivered_carrier_date,
            )?,
            order_id: self.order_id,
            late_delivery,
            delay_days: None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OrderReviewCsv {
    order_id: String,
    review_score: String,
}

impl TypedRow for OrderReviewCsv {
    type Row = OrderReview;
    const TABLE: &'static str = "order_reviews";
    const COLUMNS: &'static [&'static str] = columns::ORDER_REVIEWS;

    fn into_row(self, row: usize) -> AnalysisResult<OrderReview> {
        Ok(OrderReview {
            review_score: score(Self::TABLE, row, &self.review_score)?,
            order_id: self.order_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CategoryReviewCsv {
    order_id: String,
    product_category_name_english: String,
    review_score: String,
}

impl TypedRow for CategoryReviewCsv {
    type Row = CategoryReview;
    const TABLE: &'static str = "category_reviews";
    const COLUMNS: &'static [&'static str] = columns::CATEGORY_REVIEWS;

    fn into_row(self, row: usize) -> AnalysisResult<CategoryReview> {
        Ok(CategoryReview {
            review_score: score(Self::TABLE, row, &self.review_score)?,
            order_id: self.order_id,
            product_category_name_english: self.product_category_name_english,
        })
    }
}

/// Tables whose CSV form is already the typed row.
macro_rules! plain_table {
    ($ty:ty, $table:literal, $columns:expr) => {
        impl TypedRow for $ty {
            type Row = $ty;
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = $columns;

            fn into_row(self, _row: usize) -> AnalysisResult<$ty> {
                Ok(self)
            }
        }
    };
}

plain_table!(CategorySales, "category_sales", columns::CATEGORY_SALES);
plain_table!(CustomerGeoAgg, "customer_geo_agg", columns::CUSTOMER_GEO_AGG);
plain_table!(LowRatingRatio, "rating_rendah", columns::RATING_RENDAH);
plain_table!(SellerVolume, "seller_volume", columns::SELLER_VOLUME);
plain_table!(CustomerLocation, "customers_geo", columns::CUSTOMERS_GEO);
plain_table!(CategoryItem, "category_items", columns::CATEGORY_ITEMS);
plain_table!(SellerItem, "seller_items", columns::SELLER_ITEMS);
plain_table!(Seller, "sellers", columns::SELLERS);

/// Reads tables from one directory.
pub struct TableLoader {
    data_dir: PathBuf,
    show_progress: bool,
}

impl TableLoader {
    /// Create a loader rooted at `data_dir`.
    pub fn new(data_dir: PathBuf, show_progress: bool) -> Self {
        Self {
            data_dir,
            show_progress,
        }
    }

    /// Load the seven dashboard tables.
    pub fn load_dataset(&self, files: &DataFiles) -> AnalysisResult<Dataset> {
        info!("Loading dashboard tables from {}", self.data_dir.display());
        let progress = self.progress_bar(7);

        let revenue = self.step(&progress, &files.revenue, |p| read_table::<RevenueCsv>(p))?;
        let shipping = self.step(&progress, &files.orders_shipping, |p| read_table::<ShippingCsv>(p))?;
        let order_reviews =
            self.step(&progress, &files.order_reviews, |p| read_table::<OrderReviewCsv>(p))?;
        let category_sales =
            self.step(&progress, &files.category_sales, |p| read_table::<CategorySales>(p))?;
        let customer_geo =
            self.step(&progress, &files.customer_geo, |p| read_table::<CustomerGeoAgg>(p))?;
        let low_rating = self.step(&progress, &files.low_rating, |p| read_table::<LowRatingRatio>(p))?;
        let seller_volume =
            self.step(&progress, &files.seller_volume, |p| read_table::<SellerVolume>(p))?;

        if let Some(pb) = progress {
            pb.finish_with_message("Tables loaded");
        }

        Ok(Dataset {
            source: self.data_dir.clone(),
            revenue,
            shipping,
            order_reviews,
            category_sales,
            customer_geo,
            low_rating,
            seller_volume,
        })
    }

    /// Load the raw line-item extracts.
    pub fn load_raw(&self) -> AnalysisResult<RawDataset> {
        info!("Loading raw extracts from {}", self.data_dir.display());
        let progress = self.progress_bar(5);

        let customers =
            self.step(&progress, raw_files::CUSTOMERS_GEO, |p| read_table::<CustomerLocation>(p))?;
        let category_items =
            self.step(&progress, raw_files::CATEGORY_ITEMS, |p| read_table::<CategoryItem>(p))?;
        let category_reviews =
            self.step(&progress, raw_files::CATEGORY_REVIEWS, |p| read_table::<CategoryReviewCsv>(p))?;
        let seller_items =
            self.step(&progress, raw_files::SELLER_ITEMS, |p| read_table::<SellerItem>(p))?;
        let sellers = self.step(&progress, raw_files::SELLERS, |p| read_table::<Seller>(p))?;

        if let Some(pb) = progress {
            pb.finish_with_message("Raw extracts loaded");
        }

        Ok(RawDataset {
            customers,
            category_items,
            category_reviews,
            seller_items,
            sellers,
        })
    }

    fn progress_bar(&self, tables: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(tables);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }

    fn step<T>(
        &self,
        progress: &Option<ProgressBar>,
        file: &str,
        read: impl FnOnce(&Path) -> AnalysisResult<Vec<T>>,
    ) -> AnalysisResult<Vec<T>> {
        if let Some(pb) = progress {
            pb.set_message(file.to_string());
        }

        let rows = read(&self.data_dir.join(file))?;
        debug!("Loaded {} rows from {}", rows.len(), file);

        if let Some(pb) = progress {
            pb.inc(1);
        }
        Ok(rows)
    }
}

/// Read one CSV file into typed rows.
fn read_table<R: TypedRow>(path: &Path) -> AnalysisResult<Vec<R::Row>> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(file);

    let headers = reader.headers()?.clone();
    for column in R::COLUMNS {
        if !headers.iter().any(|h| h == *column) {
            return Err(AnalysisError::missing_column(R::TABLE, column));
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<R>().enumerate() {
        rows.push(record?.into_row(index + 1)?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixtures_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let full = parse_timestamp("2017-10-02 10:56:33").unwrap();
        assert_eq!(full.to_string(), "2017-10-02 10:56:33");

        let date_only = parse_timestamp("2017-10-02").unwrap();
        assert_eq!(date_only.to_string(), "2017-10-02 00:00:00");

        assert!(parse_timestamp("02/10/2017").is_none());
    }

    #[test]
    fn test_parse_bool_and_score() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);

        assert_eq!(parse_score("4"), Some(4));
        assert_eq!(parse_score("4.0"), Some(4));
        assert_eq!(parse_score("0"), None);
        assert_eq!(parse_score("6"), None);
        assert_eq!(parse_score("4.5"), None);
    }

    #[test]
    fn test_missing_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "revenue.csv", "order_id,payment_value\no1,10.0\n");

        let err = read_table::<RevenueCsv>(&path).unwrap_err();
        match err {
            AnalysisError::MissingColumn { table, column } => {
                assert_eq!(table, "revenue");
                assert_eq!(column, "order_purchase_timestamp");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_timestamp_is_type_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "revenue.csv",
            "order_id,order_purchase_timestamp,payment_value\no1,2018-01-01,10\no2,yesterday,5\n",
        );

        let err = read_table::<RevenueCsv>(&path).unwrap_err();
        match err {
            AnalysisError::TypeMismatch { column, row, value, .. } => {
                assert_eq!(column, "order_purchase_timestamp");
                assert_eq!(row, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_shipping_optional_fields() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "orders_shipping.csv",
            "order_id,shipping_limit_date,order_delivered_carrier_date,order_purchase_timestamp\n\
             o1,2018-01-10 00:00:00,,2018-01-01 09:00:00\n",
        );

        let rows = read_table::<ShippingCsv>(&path).unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].order_delivered_carrier_date.is_none());
        assert!(rows[0].late_delivery.is_none());
        assert!(rows[0].shipping_limit_date.is_some());
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "order_reviews.csv",
            ",order_id,review_score,review_comment_title\n0,o1,5,great\n1,o2,1,\n",
        );

        let rows = read_table::<OrderReviewCsv>(&path).unwrap();
        assert_eq!(rows[1].review_score, 1);
    }

    #[test]
    fn test_geo_table_with_empty_coordinates() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "customer_geo_agg.csv",
            "geolocation_city,geolocation_state,geolocation_lat,geolocation_lng,jumlah_customer\n\
             sao paulo,SP,-23.57,-46.64,15540\n\
             lost city,AC,,,3\n",
        );

        let rows = read_table::<CustomerGeoAgg>(&path).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].geolocation_lat, Some(-23.57));
        assert_eq!(rows[1].geolocation_lat, None);
        assert_eq!(rows[1].geolocation_lng, None);
        assert_eq!(rows[1].customer_count, 3);
    }

    #[test]
    fn test_load_fixture_dataset() {
        let loader = TableLoader::new(fixtures_dir().join("data"), false);
        let dataset = loader.load_dataset(&DataFiles::default()).unwrap();

        assert!(!dataset.revenue.is_empty());
        assert!(!dataset.shipping.is_empty());
        assert!(dataset.shipping.iter().any(|r| r.late_delivery == Some(true)));
        assert!(!dataset.category_sales.is_empty());
        assert_eq!(dataset.row_counts().len(), 7);
    }

    #[test]
    fn test_load_fixture_raw() {
        let loader = TableLoader::new(fixtures_dir().join("raw"), false);
        let raw = loader.load_raw().unwrap();

        assert!(!raw.customers.is_empty());
        assert!(raw.customers.iter().any(|c| c.geolocation_lat.is_none()));
        assert!(!raw.category_reviews.is_empty());
        assert!(!raw.sellers.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let loader = TableLoader::new(dir.path().to_path_buf(), false);
        let err = loader.load_dataset(&DataFiles::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }
}
