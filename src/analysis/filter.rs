//! Date range selection over the revenue table.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::RevenueRow;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// An inclusive range of purchase dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> AnalysisResult<Self> {
        if start > end {
            return Err(AnalysisError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The earliest and latest purchase dates present in `rows`.
    pub fn bounds(rows: &[RevenueRow]) -> AnalysisResult<Self> {
        let mut dates = rows.iter().map(|r| r.order_purchase_timestamp.date());
        let first = dates
            .next()
            .ok_or_else(|| AnalysisError::EmptyResult("revenue table is empty".to_string()))?;

        let (start, end) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Ok(Self { start, end })
    }

    /// Resolve a user selection against the data bounds.
    ///
    /// Missing ends default to the bounds; ends outside the bounds are
    /// clamped into them.
    pub fn select(
        bounds: DateRange,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> AnalysisResult<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AnalysisError::InvalidRange { start: s, end: e });
            }
        }

        let start = bounds.clamp(start.unwrap_or(bounds.start), "start");
        let end = bounds.clamp(end.unwrap_or(bounds.end), "end");

        Self::new(start, end)
    }

    fn clamp(&self, date: NaiveDate, which: &str) -> NaiveDate {
        let clamped = date.clamp(self.start, self.end);
        if clamped != date {
            warn!(
                "Requested {} date {} is outside the data ({}), using {}",
                which, date, self, clamped
            );
        }
        clamped
    }

    /// Returns true if the date lies inside the range (both ends included).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Rows whose purchase date falls in the range.
    pub fn filter(&self, rows: &[RevenueRow]) -> Vec<RevenueRow> {
        rows.iter()
            .filter(|r| self.contains(r.order_purchase_timestamp.date()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn row(id: &str, ts: &str) -> RevenueRow {
        RevenueRow {
            order_id: id.to_string(),
            order_purchase_timestamp: chrono::NaiveDateTime::parse_from_str(
                ts,
                "%Y-%m-%d %H:%M:%S",
            )
            .unwrap(),
            payment_value: 1.0,
        }
    }

    fn rows() -> Vec<RevenueRow> {
        vec![
            row("1", "2017-03-10 08:00:00"),
            row("2", "2016-09-04 21:15:19"),
            row("3", "2018-08-29 15:00:37"),
        ]
    }

    #[test]
    fn test_bounds() {
        let bounds = DateRange::bounds(&rows()).unwrap();
        assert_eq!(bounds.start, date("2016-09-04"));
        assert_eq!(bounds.end, date("2018-08-29"));
    }

    #[test]
    fn test_bounds_of_empty_table() {
        let err = DateRange::bounds(&[]).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyResult(_)));
    }

    #[test]
    fn test_select_defaults_and_clamps() {
        let bounds = DateRange::bounds(&rows()).unwrap();

        assert_eq!(DateRange::select(bounds, None, None).unwrap(), bounds);

        let clamped =
            DateRange::select(bounds, Some(date("2000-01-01")), Some(date("2017-12-31"))).unwrap();
        assert_eq!(clamped.start, bounds.start);
        assert_eq!(clamped.end, date("2017-12-31"));
    }

    #[test]
    fn test_select_rejects_inverted_range() {
        let bounds = DateRange::bounds(&rows()).unwrap();
        let err = DateRange::select(bounds, Some(date("2018-01-01")), Some(date("2017-01-01")))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRange { .. }));
    }

    #[test]
    fn test_filter_includes_whole_end_day() {
        let range = DateRange::new(date("2017-01-01"), date("2018-08-29")).unwrap();
        let ids: Vec<String> = range.filter(&rows()).into_iter().map(|r| r.order_id).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
