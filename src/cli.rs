//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{DelayMode, LowRatingJoin, RatingOrder};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// ecomdash - e-commerce dashboard reports from CSV extracts
///
/// Loads the order, review, seller and customer extracts, applies a
/// purchase date range and renders every dashboard chart's data as a
/// Markdown or JSON report.
///
/// Examples:
///   ecomdash --data-dir data
///   ecomdash --start 2017-01-01 --end 2017-12-31 -o report_2017.md
///   ecomdash --format json --rating-order count -o dashboard.json
///   ecomdash --extract-from raw --data-dir data
///   ecomdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory holding the dashboard CSV files
    ///
    /// Defaults to the `[data] dir` config value ("data").
    #[arg(short, long, value_name = "DIR", env = "ECOMDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// First purchase date to include (YYYY-MM-DD)
    ///
    /// Defaults to the earliest purchase in the revenue table.
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last purchase date to include (YYYY-MM-DD)
    ///
    /// Defaults to the latest purchase in the revenue table.
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ecomdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Row order of the review score distribution
    #[arg(long, value_name = "ORDER")]
    pub rating_order: Option<RatingOrder>,

    /// Delivery section shape: status summary or late rows
    #[arg(long, value_name = "MODE")]
    pub delay_mode: Option<DelayMode>,

    /// Categories considered by the low-rating ratio
    #[arg(long, value_name = "JOIN")]
    pub low_rating_join: Option<LowRatingJoin>,

    /// Reviews a category needs (exclusive) before its low-rating ratio is shown
    #[arg(long, value_name = "COUNT")]
    pub min_reviews: Option<u64>,

    /// Load the tables and print their sizes without building a report
    #[arg(long)]
    pub dry_run: bool,

    /// Build the pre-aggregated CSVs from raw extracts in this directory
    ///
    /// Writes category_sales, customer_geo_agg, rating_rendah and
    /// seller_volume into the data directory, then exits.
    #[arg(long, value_name = "RAW_DIR")]
    pub extract_from: Option<PathBuf>,

    /// Generate a default .ecomdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(format!("Start date {} is after end date {}", start, end));
            }
        }

        if let Some(ref data_dir) = self.data_dir {
            if data_dir.exists() && !data_dir.is_dir() {
                return Err(format!(
                    "Data path is not a directory: {}",
                    data_dir.display()
                ));
            }
        }

        // Validate raw extract directory if provided
        if let Some(ref raw_dir) = self.extract_from {
            if !raw_dir.exists() {
                return Err(format!(
                    "Raw extract directory does not exist: {}",
                    raw_dir.display()
                ));
            }
            if !raw_dir.is_dir() {
                return Err(format!(
                    "Raw extract path is not a directory: {}",
                    raw_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data_dir: None,
            start: None,
            end: None,
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            verbose: false,
            quiet: false,
            rating_order: None,
            delay_mode: None,
            low_rating_join: None,
            min_reviews: None,
            dry_run: false,
            extract_from: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "ecomdash",
            "--start",
            "2017-01-01",
            "--end",
            "2017-06-30",
            "--rating-order",
            "count",
            "--delay-mode",
            "late-rows",
            "--low-rating-join",
            "low-reviewed-only",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.start, NaiveDate::from_ymd_opt(2017, 1, 1));
        assert_eq!(args.end, NaiveDate::from_ymd_opt(2017, 6, 30));
        assert_eq!(args.rating_order, Some(RatingOrder::Count));
        assert_eq!(args.delay_mode, Some(DelayMode::LateRows));
        assert_eq!(args.low_rating_join, Some(LowRatingJoin::LowReviewedOnly));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_rejects_bad_date() {
        assert!(Args::try_parse_from(["ecomdash", "--start", "01/02/2017"]).is_err());
    }

    #[test]
    fn test_validation_inverted_range() {
        let mut args = make_args();
        args.start = NaiveDate::from_ymd_opt(2018, 1, 1);
        args.end = NaiveDate::from_ymd_opt(2017, 1, 1);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_raw_dir() {
        let mut args = make_args();
        args.extract_from = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
