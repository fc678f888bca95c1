//! Dashboard assembly.
//!
//! Applies the selected date range to the revenue table, runs the
//! transforms that depend on it and slices the pre-aggregated tables
//! into the views shown by the report.

use super::aggregator::{monthly_orders, rating_distribution, state_summary};
use super::delivery::classify_deliveries;
use super::filter::DateRange;
use crate::error::AnalysisResult;
use crate::loader::Dataset;
use crate::models::{
    AnalysisSettings, CategorySales, CustomerGeoAgg, CustomerMap, Dashboard, DashboardMetadata,
    Highlights, LowRatingRatio, MapMarker, Metrics, MonthlyOrders, SellerHighlight, SellerVolume,
};
use chrono::Utc;
use std::cmp::Reverse;
use tracing::{debug, info, warn};

/// Build the dashboard for `range`.
///
/// `bounds` is the full purchase date span of the revenue table, kept in
/// the metadata so the report can show what was available.
pub fn build_dashboard(
    dataset: &Dataset,
    bounds: DateRange,
    range: DateRange,
    settings: &AnalysisSettings,
) -> AnalysisResult<Dashboard> {
    let revenue = range.filter(&dataset.revenue);
    info!(
        "{} of {} revenue rows fall in {}",
        revenue.len(),
        dataset.revenue.len(),
        range
    );
    if revenue.is_empty() {
        warn!("No orders in the selected range; order sections will be empty");
    }

    let monthly = monthly_orders(&revenue);
    let metrics = headline_metrics(&monthly);
    let delivery = classify_deliveries(settings.delay_mode, &revenue, &dataset.shipping);
    let ratings = rating_distribution(&revenue, &dataset.order_reviews, settings.rating_order);

    let (top_categories, bottom_categories) =
        category_extremes(&dataset.category_sales, settings.top_categories);

    Ok(Dashboard {
        metadata: DashboardMetadata {
            generated_at: Utc::now(),
            data_dir: dataset.source.display().to_string(),
            range_start: range.start,
            range_end: range.end,
            data_start: bounds.start,
            data_end: bounds.end,
            revenue_rows: revenue.len(),
        },
        highlights: highlights(&dataset.customer_geo, &dataset.category_sales),
        metrics,
        monthly_orders: monthly,
        delivery,
        rating_distribution: ratings,
        top_categories,
        bottom_categories,
        top_sellers: top_sellers(&dataset.seller_volume, settings.top_sellers),
        low_rated_categories: worst_rated(&dataset.low_rating, settings.top_low_rated),
        customer_map: customer_map(&dataset.customer_geo),
        state_summary: state_summary(&dataset.customer_geo),
    })
}

/// Total orders and revenue over all months.
pub fn headline_metrics(monthly: &[MonthlyOrders]) -> Metrics {
    Metrics {
        total_orders: monthly.iter().map(|m| m.order_count).sum(),
        total_revenue: monthly.iter().map(|m| m.revenue).sum(),
    }
}

/// First row holding the maximum of `key`; earlier rows win ties.
fn first_max<'a, T>(rows: &'a [T], key: impl Fn(&T) -> u64) -> Option<&'a T> {
    rows.iter().fold(None, |best: Option<&'a T>, row| match best {
        Some(b) if key(b) >= key(row) => Some(b),
        _ => Some(row),
    })
}

/// City with the most customers and the best-selling category.
pub fn highlights(cities: &[CustomerGeoAgg], sales: &[CategorySales]) -> Highlights {
    Highlights {
        top_city: first_max(cities, |c| c.customer_count).map(|c| c.geolocation_city.clone()),
        top_category: first_max(sales, |s| s.purchase_count)
            .map(|s| s.product_category_name_english.clone()),
    }
}

/// The `n` most and `n` least purchased categories.
///
/// Both lists are ordered by purchase count, highest first.
pub fn category_extremes(
    sales: &[CategorySales],
    n: usize,
) -> (Vec<CategorySales>, Vec<CategorySales>) {
    let mut sorted = sales.to_vec();
    sorted.sort_by_key(|row| Reverse(row.purchase_count));

    let top = sorted.iter().take(n).cloned().collect();
    let bottom = sorted[sorted.len().saturating_sub(n)..].to_vec();
    (top, bottom)
}

/// The `n` sellers with the most orders, labelled by a short id.
pub fn top_sellers(sellers: &[SellerVolume], n: usize) -> Vec<SellerHighlight> {
    let mut sorted = sellers.to_vec();
    sorted.sort_by_key(|row| Reverse(row.order_count));
    sorted.truncate(n);

    sorted
        .into_iter()
        .map(|seller| SellerHighlight {
            short_id: seller.seller_id.chars().take(3).collect(),
            seller,
        })
        .collect()
}

/// The `n` categories with the highest low-review ratio.
pub fn worst_rated(ratios: &[LowRatingRatio], n: usize) -> Vec<LowRatingRatio> {
    let mut sorted = ratios.to_vec();
    sorted.sort_by(|a, b| b.low_review_ratio.total_cmp(&a.low_review_ratio));
    sorted.truncate(n);
    sorted
}

/// Map centre and one marker per city.
///
/// Marker radius grows with the square root of the customer count. Cities
/// without coordinates get no marker and do not move the centre.
pub fn customer_map(cities: &[CustomerGeoAgg]) -> CustomerMap {
    let located: Vec<(f64, f64, &CustomerGeoAgg)> = cities
        .iter()
        .filter_map(|city| match (city.geolocation_lat, city.geolocation_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => Some((lat, lng, city)),
            _ => None,
        })
        .collect();

    if located.len() < cities.len() {
        debug!("{} cities have no coordinates", cities.len() - located.len());
    }
    if located.is_empty() {
        return CustomerMap::default();
    }

    let n = located.len() as f64;
    let center_lat = located.iter().map(|(lat, _, _)| lat).sum::<f64>() / n;
    let center_lng = located.iter().map(|(_, lng, _)| lng).sum::<f64>() / n;

    let markers = located
        .into_iter()
        .map(|(lat, lng, city)| MapMarker {
            lat,
            lng,
            radius: (city.customer_count as f64).sqrt() * 0.5,
            label: format!(
                "{}, {}: {} pelanggan",
                city.geolocation_city, city.geolocation_state, city.customer_count
            ),
        })
        .collect();

    CustomerMap {
        center: Some((center_lat, center_lng)),
        markers,
    }
}
