//! Pre-aggregated extract building.
//!
//! Turns the raw line-item extracts into the four summary tables the
//! dashboard reads directly: category sales, customer geography, low
//! rating ratios and seller volume.

use crate::analysis::{category_sales, customer_geo_agg, low_rating_ratio, seller_volume};
use crate::loader::{columns, DataFiles, RawDataset};
use crate::models::AnalysisSettings;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A summary table written to disk.
#[derive(Debug, Clone)]
pub struct WrittenTable {
    pub path: PathBuf,
    pub rows: usize,
}

/// Aggregate `raw` and write the summary CSVs into `out_dir`.
pub fn build_extracts(
    raw: &RawDataset,
    out_dir: &Path,
    files: &DataFiles,
    settings: &AnalysisSettings,
) -> Result<Vec<WrittenTable>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create data directory: {}", out_dir.display()))?;

    let ratios = low_rating_ratio(&raw.category_reviews, settings)
        .context("Failed to compute low rating ratios")?;

    let written = vec![
        write_table(
            &out_dir.join(&files.category_sales),
            columns::CATEGORY_SALES,
            &category_sales(&raw.category_items),
        )?,
        write_table(
            &out_dir.join(&files.customer_geo),
            columns::CUSTOMER_GEO_AGG,
            &customer_geo_agg(&raw.customers),
        )?,
        write_table(&out_dir.join(&files.low_rating), columns::RATING_RENDAH, &ratios)?,
        write_table(
            &out_dir.join(&files.seller_volume),
            columns::SELLER_VOLUME,
            &seller_volume(&raw.seller_items, &raw.sellers),
        )?,
    ];

    info!("Wrote {} summary tables to {}", written.len(), out_dir.display());
    Ok(written)
}

/// Write rows under an explicit header so empty tables stay loadable.
fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<WrittenTable> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(WrittenTable {
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TableLoader;
    use crate::models::{
        CategoryItem, CategoryReview, CustomerLocation, LowRatingRatio, Seller, SellerItem,
    };
    use tempfile::TempDir;

    fn raw() -> RawDataset {
        let mut category_reviews: Vec<CategoryReview> = (0..150)
            .map(|i| CategoryReview {
                order_id: format!("r{}", i),
                product_category_name_english: "toys".into(),
                review_score: if i < 15 { 1 } else { 5 },
            })
            .collect();
        category_reviews.push(CategoryReview {
            order_id: "x".into(),
            product_category_name_english: "rare".into(),
            review_score: 1,
        });

        RawDataset {
            customers: vec![
                CustomerLocation {
                    customer_unique_id: "c1".into(),
                    geolocation_city: "recife".into(),
                    geolocation_state: "PE".into(),
                    geolocation_lat: Some(-8.05),
                    geolocation_lng: Some(-34.9),
                },
                CustomerLocation {
                    customer_unique_id: "c2".into(),
                    geolocation_city: "recife".into(),
                    geolocation_state: "PE".into(),
                    geolocation_lat: None,
                    geolocation_lng: None,
                },
            ],
            category_items: vec![CategoryItem {
                order_id: "o1".into(),
                product_category_name_english: "toys".into(),
                price: 29.9,
            }],
            category_reviews,
            seller_items: vec![SellerItem {
                order_id: "o1".into(),
                seller_id: "s1".into(),
                price: 29.9,
            }],
            sellers: vec![Seller {
                seller_id: "s1".into(),
                seller_city: "sao paulo".into(),
                seller_state: "SP".into(),
            }],
        }
    }

    #[test]
    fn test_build_extracts_writes_loadable_tables() {
        let dir = TempDir::new().unwrap();
        let files = DataFiles::default();

        let written =
            build_extracts(&raw(), dir.path(), &files, &AnalysisSettings::default()).unwrap();

        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|w| w.path.exists()));

        let content = std::fs::read_to_string(dir.path().join(&files.low_rating)).unwrap();
        assert!(content.starts_with(
            "product_category_name_english,low_review,total_review,low_review_ratio"
        ));

        let mut reader = csv::Reader::from_path(dir.path().join(&files.low_rating)).unwrap();
        let ratios: Vec<LowRatingRatio> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(ratios.len(), 1);
        assert_eq!(ratios[0].product_category_name_english, "toys");
        assert_eq!(ratios[0].low_review_ratio, 10.0);

        let geo = std::fs::read_to_string(dir.path().join(&files.customer_geo)).unwrap();
        assert!(geo.contains("recife,PE,-8.05,-34.9,1"));
    }

    #[test]
    fn test_empty_tables_keep_header() {
        let dir = TempDir::new().unwrap();
        let empty = RawDataset {
            customers: vec![],
            category_items: vec![],
            category_reviews: vec![],
            seller_items: vec![],
            sellers: vec![],
        };

        let written = build_extracts(
            &empty,
            dir.path(),
            &DataFiles::default(),
            &AnalysisSettings::default(),
        )
        .unwrap();

        assert!(written.iter().all(|w| w.rows == 0));
        let content =
            std::fs::read_to_string(dir.path().join("seller_volume.csv")).unwrap();
        assert_eq!(
            content.trim(),
            "seller_id,seller_city,seller_state,jumlah_order,total_penjualan"
        );
    }

    #[test]
    fn test_extract_from_fixture_raw() {
        let dir = TempDir::new().unwrap();
        let loader = TableLoader::new(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("raw"),
            false,
        );
        let raw = loader.load_raw().unwrap();

        let written = build_extracts(
            &raw,
            dir.path(),
            &DataFiles::default(),
            &AnalysisSettings::default(),
        )
        .unwrap();

        assert!(written.iter().any(|w| w.rows > 0));
    }
}
