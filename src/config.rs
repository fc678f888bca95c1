//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ecomdash.toml` files.

use crate::models::{AnalysisSettings, DelayMode, LowRatingJoin, RatingOrder};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".ecomdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input table locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "dashboard_report.md".to_string()
}

/// Where the dashboard tables live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the CSV files.
    #[serde(default = "default_data_dir")]
    pub dir: String,

    #[serde(default = "default_revenue")]
    pub revenue: String,

    #[serde(default = "default_orders_shipping")]
    pub orders_shipping: String,

    #[serde(default = "default_order_reviews")]
    pub order_reviews: String,

    #[serde(default = "default_category_sales")]
    pub category_sales: String,

    #[serde(default = "default_customer_geo")]
    pub customer_geo: String,

    #[serde(default = "default_low_rating")]
    pub low_rating: String,

    #[serde(default = "default_seller_volume")]
    pub seller_volume: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            revenue: default_revenue(),
            orders_shipping: default_orders_shipping(),
            order_reviews: default_order_reviews(),
            category_sales: default_category_sales(),
            customer_geo: default_customer_geo(),
            low_rating: default_low_rating(),
            seller_volume: default_seller_volume(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_revenue() -> String {
    "revenue.csv".to_string()
}

fn default_orders_shipping() -> String {
    "orders_shipping.csv".to_string()
}

fn default_order_reviews() -> String {
    "order_reviews.csv".to_string()
}

fn default_category_sales() -> String {
    "category_sales.csv".to_string()
}

fn default_customer_geo() -> String {
    "customer_geo_agg.csv".to_string()
}

fn default_low_rating() -> String {
    "rating_rendah.csv".to_string()
}

fn default_seller_volume() -> String {
    "seller_volume.csv".to_string()
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// A category needs more reviews than this to get a low-rating ratio.
    #[serde(default = "default_min_reviews")]
    pub min_reviews: u64,

    /// Highest review score that still counts as a low review.
    #[serde(default = "default_low_score_max")]
    pub low_score_max: u8,

    /// Row order of the review score distribution.
    #[serde(default)]
    pub rating_order: RatingOrder,

    /// Delivery summary or late rows.
    #[serde(default)]
    pub delay_mode: DelayMode,

    /// Whether categories without low reviews keep a ratio of 0.
    #[serde(default)]
    pub low_rating_join: LowRatingJoin,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_reviews: default_min_reviews(),
            low_score_max: default_low_score_max(),
            rating_order: RatingOrder::default(),
            delay_mode: DelayMode::default(),
            low_rating_join: LowRatingJoin::default(),
        }
    }
}

fn default_min_reviews() -> u64 {
    100
}

fn default_low_score_max() -> u8 {
    2
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Categories shown in the most/least purchased lists.
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,

    /// Sellers shown in the top seller chart.
    #[serde(default = "default_top_sellers")]
    pub top_sellers: usize,

    /// Categories shown in the low review chart.
    #[serde(default = "default_top_low_rated")]
    pub top_low_rated: usize,

    /// Cities listed under the customer map.
    #[serde(default = "default_top_cities")]
    pub top_cities: usize,

    /// Currency symbol used for money values.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_categories: default_top_categories(),
            top_sellers: default_top_sellers(),
            top_low_rated: default_top_low_rated(),
            top_cities: default_top_cities(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

fn default_top_categories() -> usize {
    5
}

fn default_top_sellers() -> usize {
    10
}

fn default_top_low_rated() -> usize {
    10
}

fn default_top_cities() -> usize {
    10
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.data.dir = dir.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(order) = args.rating_order {
            self.analysis.rating_order = order;
        }
        if let Some(mode) = args.delay_mode {
            self.analysis.delay_mode = mode;
        }
        if let Some(join) = args.low_rating_join {
            self.analysis.low_rating_join = join;
        }
        if let Some(min_reviews) = args.min_reviews {
            self.analysis.min_reviews = min_reviews;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level for this run.
    ///
    /// `--quiet` wins; otherwise `verbose = true` in the file raises the
    /// level the same way `--verbose` does.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if self.general.verbose && !args.quiet {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Resolve the settings the aggregation layer runs with.
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            min_reviews: self.analysis.min_reviews,
            low_score_max: self.analysis.low_score_max,
            rating_order: self.analysis.rating_order,
            delay_mode: self.analysis.delay_mode,
            low_rating_join: self.analysis.low_rating_join,
            top_categories: self.report.top_categories,
            top_sellers: self.report.top_sellers,
            top_low_rated: self.report.top_low_rated,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.dir, "data");
        assert_eq!(config.data.low_rating, "rating_rendah.csv");
        assert_eq!(config.analysis.min_reviews, 100);
        assert_eq!(config.analysis.rating_order, RatingOrder::Score);
        assert_eq!(config.report.currency_symbol, "R$");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[data]
dir = "extracts"
revenue = "payments.csv"

[analysis]
min_reviews = 50
rating_order = "count"
delay_mode = "late-rows"
low_rating_join = "low-reviewed-only"

[report]
top_sellers = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.data.dir, "extracts");
        assert_eq!(config.data.revenue, "payments.csv");
        assert_eq!(config.data.order_reviews, "order_reviews.csv");
        assert_eq!(config.analysis.min_reviews, 50);
        assert_eq!(config.analysis.rating_order, RatingOrder::Count);
        assert_eq!(config.analysis.delay_mode, DelayMode::LateRows);
        assert_eq!(config.analysis.low_rating_join, LowRatingJoin::LowReviewedOnly);
        assert_eq!(config.report.top_sellers, 3);
        assert_eq!(config.report.top_categories, 5);

        let settings = config.analysis_settings();
        assert_eq!(settings.min_reviews, 50);
        assert_eq!(settings.top_sellers, 3);
    }

    #[test]
    fn test_verbose_from_file_sets_log_level() {
        use clap::Parser;

        let mut config = Config::default();
        let plain = crate::cli::Args::parse_from(["ecomdash"]);
        let quiet = crate::cli::Args::parse_from(["ecomdash", "--quiet"]);
        assert_eq!(config.log_level(&plain), tracing::Level::INFO);

        config.general.verbose = true;
        assert_eq!(config.log_level(&plain), tracing::Level::DEBUG);
        assert_eq!(config.log_level(&quiet), tracing::Level::ERROR);

        let mut merged = Config::default();
        merged.merge_with_args(&crate::cli::Args::parse_from(["ecomdash", "-v"]));
        assert_eq!(merged.log_level(&plain), tracing::Level::DEBUG);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("rating_order = \"score\""));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.analysis.min_reviews, 100);
    }
}
