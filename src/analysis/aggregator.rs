//! Table aggregation transforms.
//!
//! Every function here is a pure group-by over borrowed rows: inputs are
//! never mutated, and the returned table is freshly built. An empty
//! result is an empty `Vec`, which the report renders as a placeholder.

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{
    AnalysisSettings, CategoryItem, CategoryReview, CategorySales, CustomerGeoAgg,
    CustomerLocation, LowRatingJoin, LowRatingRatio, MonthlyOrders, OrderReview, RatingCount,
    RatingOrder, RevenueRow, Seller, SellerItem, SellerVolume, StateSummary,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Count unique customers per (city, state) and average their coordinates.
///
/// Rows with a missing or non-finite coordinate are dropped before
/// grouping, so they count neither towards the mean nor the customers.
pub fn customer_geo_agg(customers: &[CustomerLocation]) -> Vec<CustomerGeoAgg> {
    #[derive(Default)]
    struct Bucket<'a> {
        customers: HashSet<&'a str>,
        lat_sum: f64,
        lng_sum: f64,
        points: usize,
    }

    let mut groups: BTreeMap<(&str, &str), Bucket> = BTreeMap::new();
    let mut dropped = 0usize;

    for customer in customers {
        let (lat, lng) = match (customer.geolocation_lat, customer.geolocation_lng) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => (lat, lng),
            _ => {
                dropped += 1;
                continue;
            }
        };

        let bucket = groups
            .entry((
                customer.geolocation_city.as_str(),
                customer.geolocation_state.as_str(),
            ))
            .or_default();
        bucket.customers.insert(customer.customer_unique_id.as_str());
        bucket.lat_sum += lat;
        bucket.lng_sum += lng;
        bucket.points += 1;
    }

    if dropped > 0 {
        debug!("Dropped {} customer rows without coordinates", dropped);
    }

    let mut rows: Vec<CustomerGeoAgg> = groups
        .into_iter()
        .map(|((city, state), bucket)| CustomerGeoAgg {
            geolocation_city: city.to_string(),
            geolocation_state: state.to_string(),
            geolocation_lat: Some(bucket.lat_sum / bucket.points as f64),
            geolocation_lng: Some(bucket.lng_sum / bucket.points as f64),
            customer_count: bucket.customers.len() as u64,
        })
        .collect();

    // Stable: ties stay in (city, state) order
    rows.sort_by_key(|row| Reverse(row.customer_count));
    rows
}

/// Roll the city table up to one row per state, ordered by state code.
///
/// Customers are summed; coordinates are the mean over the cities that
/// have them.
pub fn state_summary(cities: &[CustomerGeoAgg]) -> Vec<StateSummary> {
    #[derive(Default)]
    struct Bucket {
        customers: u64,
        lat: Vec<f64>,
        lng: Vec<f64>,
    }

    fn mean(values: &[f64]) -> Option<f64> {
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    }

    let mut groups: BTreeMap<&str, Bucket> = BTreeMap::new();
    for city in cities {
        let bucket = groups.entry(city.geolocation_state.as_str()).or_default();
        bucket.customers += city.customer_count;
        bucket.lat.extend(city.geolocation_lat.filter(|v| v.is_finite()));
        bucket.lng.extend(city.geolocation_lng.filter(|v| v.is_finite()));
    }

    groups
        .into_iter()
        .map(|(state, bucket)| StateSummary {
            geolocation_state: state.to_string(),
            geolocation_lat: mean(&bucket.lat),
            geolocation_lng: mean(&bucket.lng),
            customer_count: bucket.customers,
        })
        .collect()
}

/// Distinct orders per review score, for the orders present in `orders`.
pub fn rating_distribution(
    orders: &[RevenueRow],
    reviews: &[OrderReview],
    order: RatingOrder,
) -> Vec<RatingCount> {
    let order_ids: HashSet<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();

    let mut by_score: BTreeMap<u8, HashSet<&str>> = BTreeMap::new();
    for review in reviews {
        if order_ids.contains(review.order_id.as_str()) {
            by_score
                .entry(review.review_score)
                .or_default()
                .insert(review.order_id.as_str());
        }
    }

    let mut rows: Vec<RatingCount> = by_score
        .into_iter()
        .map(|(review_score, ids)| RatingCount {
            review_score,
            order_count: ids.len() as u64,
        })
        .collect();

    if order == RatingOrder::Count {
        rows.sort_by_key(|row| Reverse(row.order_count));
    }

    rows
}

/// Percentage of low reviews per product category.
///
/// A review is low when its score is at most `settings.low_score_max`.
/// Categories with `total_review <= settings.min_reviews` are filtered out
/// before the ratio is computed. `settings.low_rating_join` decides whether
/// categories without any low review report a ratio of 0 or are left out.
pub fn low_rating_ratio(
    reviews: &[CategoryReview],
    settings: &AnalysisSettings,
) -> AnalysisResult<Vec<LowRatingRatio>> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    let mut lows: BTreeMap<&str, u64> = BTreeMap::new();

    for review in reviews {
        let category = review.product_category_name_english.as_str();
        *totals.entry(category).or_default() += 1;
        if review.review_score <= settings.low_score_max {
            *lows.entry(category).or_default() += 1;
        }
    }

    let joined: Vec<(&str, u64, u64)> = match settings.low_rating_join {
        LowRatingJoin::AllCategories => totals
            .iter()
            .map(|(&category, &total)| {
                (category, lows.get(category).copied().unwrap_or(0), total)
            })
            .collect(),
        LowRatingJoin::LowReviewedOnly => lows
            .iter()
            .map(|(&category, &low)| {
                (category, low, totals.get(category).copied().unwrap_or(0))
            })
            .collect(),
    };

    let mut rows = Vec::new();
    for (category, low_review, total_review) in joined {
        if total_review <= settings.min_reviews {
            continue;
        }
        if total_review == 0 {
            return Err(AnalysisError::DivisionByZero {
                category: category.to_string(),
            });
        }

        rows.push(LowRatingRatio {
            product_category_name_english: category.to_string(),
            low_review,
            total_review,
            low_review_ratio: low_review as f64 / total_review as f64 * 100.0,
        });
    }

    rows.sort_by(|a, b| b.low_review_ratio.total_cmp(&a.low_review_ratio));
    Ok(rows)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Distinct orders and summed payments per calendar month.
///
/// Only months that contain at least one row appear in the output.
pub fn monthly_orders(rows: &[RevenueRow]) -> Vec<MonthlyOrders> {
    let mut months: BTreeMap<NaiveDate, (HashSet<&str>, f64)> = BTreeMap::new();

    for row in rows {
        let month = month_start(row.order_purchase_timestamp.date());
        let (ids, revenue) = months.entry(month).or_default();
        ids.insert(row.order_id.as_str());
        *revenue += row.payment_value;
    }

    months
        .into_iter()
        .map(|(order_month, (ids, revenue))| MonthlyOrders {
            order_month,
            order_count: ids.len() as u64,
            revenue,
        })
        .collect()
}

/// Line-item count and price total per product category.
pub fn category_sales(items: &[CategoryItem]) -> Vec<CategorySales> {
    let mut groups: BTreeMap<&str, (u64, f64)> = BTreeMap::new();

    for item in items {
        let (count, total) = groups
            .entry(item.product_category_name_english.as_str())
            .or_default();
        *count += 1;
        *total += item.price;
    }

    let mut rows: Vec<CategorySales> = groups
        .into_iter()
        .map(|(category, (purchase_count, total_price))| CategorySales {
            product_category_name_english: category.to_string(),
            purchase_count,
            total_price,
        })
        .collect();

    rows.sort_by_key(|row| Reverse(row.purchase_count));
    rows
}

/// Line-item count and sales total per seller, with the seller's location.
///
/// Items whose seller is unknown to `sellers` are kept with an empty
/// city and state.
pub fn seller_volume(items: &[SellerItem], sellers: &[Seller]) -> Vec<SellerVolume> {
    let mut lookup: HashMap<&str, &Seller> = HashMap::new();
    for seller in sellers {
        lookup.entry(seller.seller_id.as_str()).or_insert(seller);
    }

    let mut groups: BTreeMap<(&str, &str, &str), (u64, f64)> = BTreeMap::new();
    let mut unmatched = 0usize;

    for item in items {
        let (city, state) = match lookup.get(item.seller_id.as_str()) {
            Some(seller) => (seller.seller_city.as_str(), seller.seller_state.as_str()),
            None => {
                unmatched += 1;
                ("", "")
            }
        };

        let (count, total) = groups
            .entry((item.seller_id.as_str(), city, state))
            .or_default();
        *count += 1;
        *total += item.price;
    }

    if unmatched > 0 {
        debug!("{} line items have no seller location", unmatched);
    }

    let mut rows: Vec<SellerVolume> = groups
        .into_iter()
        .map(|((seller_id, city, state), (order_count, total_sales))| SellerVolume {
            seller_id: seller_id.to_string(),
            seller_city: city.to_string(),
            seller_state: state.to_string(),
            order_count,
            total_sales,
        })
        .collect();

    rows.sort_by_key(|row| Reverse(row.order_count));
    rows
}
