//! Analysis modules.
//!
//! Aggregation transforms, delivery classification, date range
//! selection and dashboard assembly.

pub mod aggregator;
pub mod dashboard;
pub mod delivery;
pub mod filter;

pub use aggregator::*;
pub use dashboard::build_dashboard;
pub use delivery::*;
pub use filter::DateRange;
