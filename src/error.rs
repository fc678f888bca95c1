//! Error types for ingestion and aggregation.
//!
//! Every fallible operation below the binary returns [`AnalysisError`].
//! The binary wraps these with `anyhow` context before reporting them.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while loading tables or computing derived tables.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column '{column}' in table '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("No rows available: {0}")]
    EmptyResult(String),

    #[error("Invalid value '{value}' in {table}.{column} (row {row})")]
    TypeMismatch {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Division by zero computing ratio for '{category}'")]
    DivisionByZero { category: String },

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

impl AnalysisError {
    /// Shorthand for a [`AnalysisError::MissingColumn`].
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    /// Shorthand for a [`AnalysisError::TypeMismatch`].
    pub fn type_mismatch(table: &str, column: &str, row: usize, value: &str) -> Self {
        Self::TypeMismatch {
            table: table.to_string(),
            column: column.to_string(),
            row,
            value: value.to_string(),
        }
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnalysisError::missing_column("revenue", "payment_value");
        assert_eq!(
            err.to_string(),
            "Missing column 'payment_value' in table 'revenue'"
        );

        let err = AnalysisError::type_mismatch("orders_shipping", "shipping_limit_date", 4, "soon");
        assert!(err.to_string().contains("orders_shipping.shipping_limit_date"));
        assert!(err.to_string().contains("row 4"));
    }
}
