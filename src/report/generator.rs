//! Dashboard report generation.
//!
//! Renders a [`Dashboard`] as Markdown (one section per chart, each chart
//! shown as the table of values it plots) or as pretty-printed JSON.

use crate::models::{
    CategorySales, CustomerMap, Dashboard, DashboardMetadata, DeliveryStatusCount, DeliveryView,
    Highlights, LateOrder, LowRatingRatio, Metrics, MonthlyOrders, RatingCount, SellerHighlight,
    StateSummary,
};
use anyhow::Result;
use chrono::NaiveDateTime;

/// Presentation settings for the Markdown report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Cities listed under the customer map.
    pub top_cities: usize,
    /// Prefix for money values.
    pub currency_symbol: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_cities: 10,
            currency_symbol: "R$".to_string(),
        }
    }
}

impl From<&crate::config::ReportConfig> for ReportOptions {
    fn from(config: &crate::config::ReportConfig) -> Self {
        Self {
            top_cities: config.top_cities,
            currency_symbol: config.currency_symbol.clone(),
        }
    }
}

const NO_DATA: &str = "_No data for the selected range._\n\n";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(dashboard: &Dashboard, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str("# E-commerce Dashboard\n\n");

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_highlights_section(&dashboard.highlights));
    output.push_str(&generate_table_of_contents());
    output.push_str(&generate_monthly_section(
        &dashboard.metrics,
        &dashboard.monthly_orders,
        options,
    ));
    output.push_str(&generate_delivery_section(&dashboard.delivery));
    output.push_str(&generate_rating_section(&dashboard.rating_distribution));
    output.push_str(&generate_category_section(
        &dashboard.top_categories,
        &dashboard.bottom_categories,
        options,
    ));
    output.push_str(&generate_seller_section(&dashboard.top_sellers, options));
    output.push_str(&generate_low_rating_section(&dashboard.low_rated_categories));
    output.push_str(&generate_customer_section(&dashboard.customer_map, options));
    output.push_str(&generate_state_section(&dashboard.state_summary));
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}

/// Format money the pt-BR way: `R$ 1.234,56`.
pub fn format_currency(value: f64, symbol: &str) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();

    let mut grouped = String::new();
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{} {},{:02}", sign, symbol, grouped, cents % 100)
}

fn format_timestamp(value: Option<NaiveDateTime>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn share(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Data Directory:** `{}`\n", metadata.data_dir));
    section.push_str(&format!(
        "- **Date Range:** {} to {}\n",
        metadata.range_start, metadata.range_end
    ));
    section.push_str(&format!(
        "- **Available Data:** {} to {}\n",
        metadata.data_start, metadata.data_end
    ));
    section.push_str(&format!("- **Revenue Rows:** {}\n", metadata.revenue_rows));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

/// Generate the highlights shown above the charts.
fn generate_highlights_section(highlights: &Highlights) -> String {
    let mut section = String::new();
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    section.push_str("## Highlights\n\n");
    section.push_str(&format!(
        "- 🏙️ **City with the most customers:** {}\n",
        or_dash(&highlights.top_city)
    ));
    section.push_str(&format!(
        "- 🛒 **Best-selling category:** {}\n",
        or_dash(&highlights.top_category)
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents() -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Monthly Orders](#monthly-orders)\n");
    toc.push_str("- [Delivery Status](#delivery-status)\n");
    toc.push_str("- [Orders by Review Score](#orders-by-review-score)\n");
    toc.push_str("- [Product Categories](#product-categories)\n");
    toc.push_str("- [Top Sellers](#top-sellers)\n");
    toc.push_str("- [Low Review Categories](#low-review-categories)\n");
    toc.push_str("- [Customer Distribution](#customer-distribution)\n");
    toc.push_str("- [Customers by State](#customers-by-state)\n");
    toc.push('\n');

    toc
}

/// Generate the monthly orders section with the headline metrics.
fn generate_monthly_section(
    metrics: &Metrics,
    monthly: &[MonthlyOrders],
    options: &ReportOptions,
) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Orders\n\n");
    section.push_str("| Total Orders | Total Revenue |\n");
    section.push_str("|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{}** | **{}** |\n\n",
        metrics.total_orders,
        format_currency(metrics.total_revenue, &options.currency_symbol)
    ));

    if monthly.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str("| Month | Orders | Revenue |\n");
    section.push_str("|:---|:---:|---:|\n");
    for month in monthly {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            month.order_month.format("%Y-%m"),
            month.order_count,
            format_currency(month.revenue, &options.currency_symbol)
        ));
    }
    section.push('\n');

    section
}

/// Generate the delivery status section in whichever shape was computed.
fn generate_delivery_section(view: &DeliveryView) -> String {
    let mut section = String::new();

    section.push_str("## Delivery Status\n\n");

    if view.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    match view {
        DeliveryView::Summary(rows) => section.push_str(&delivery_summary_table(rows)),
        DeliveryView::LateRows(rows) => section.push_str(&late_orders_table(rows)),
    }

    section
}

fn delivery_summary_table(rows: &[DeliveryStatusCount]) -> String {
    let mut table = String::new();
    let total: u64 = rows.iter().map(|r| r.count).sum();

    table.push_str("| Delivery Status | Orders | Share |\n");
    table.push_str("|:---|:---:|:---:|\n");
    for row in rows {
        table.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            row.status,
            row.count,
            share(row.count, total)
        ));
    }
    table.push('\n');

    table
}

fn late_orders_table(rows: &[LateOrder]) -> String {
    let mut table = String::new();

    table.push_str(&format!("{} shipments reached the carrier late.\n\n", rows.len()));
    table.push_str("| Order | Shipping Limit | Handed to Carrier | Delay (days) |\n");
    table.push_str("|:---|:---|:---|:---:|\n");
    for row in rows {
        table.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            row.order_id,
            format_timestamp(row.shipping_limit_date),
            format_timestamp(row.order_delivered_carrier_date),
            row.delay_days
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        ));
    }
    table.push('\n');

    table
}

/// Generate the review score distribution section.
fn generate_rating_section(ratings: &[RatingCount]) -> String {
    let mut section = String::new();

    section.push_str("## Orders by Review Score\n\n");

    if ratings.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str("| Review Score | Orders |\n");
    section.push_str("|:---:|:---:|\n");
    for rating in ratings {
        section.push_str(&format!(
            "| {} {} | {} |\n",
            "★".repeat(rating.review_score as usize),
            rating.review_score,
            rating.order_count
        ));
    }
    section.push('\n');

    section
}

fn category_table(rows: &[CategorySales], options: &ReportOptions) -> String {
    let mut table = String::new();

    table.push_str("| Category | Purchases | Total Price |\n");
    table.push_str("|:---|:---:|---:|\n");
    for row in rows {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            row.product_category_name_english,
            row.purchase_count,
            format_currency(row.total_price, &options.currency_symbol)
        ));
    }
    table.push('\n');

    table
}

/// Generate the most/least purchased categories section.
fn generate_category_section(
    top: &[CategorySales],
    bottom: &[CategorySales],
    options: &ReportOptions,
) -> String {
    let mut section = String::new();

    section.push_str("## Product Categories\n\n");

    if top.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str("### Most Purchased\n\n");
    section.push_str(&category_table(top, options));
    section.push_str("### Least Purchased\n\n");
    section.push_str(&category_table(bottom, options));

    section
}

/// Generate the top sellers section.
fn generate_seller_section(sellers: &[SellerHighlight], options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Top Sellers\n\n");

    if sellers.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str("| Seller | Location | Orders | Total Sales |\n");
    section.push_str("|:---|:---|:---:|---:|\n");
    for highlight in sellers {
        let seller = &highlight.seller;
        let location = if seller.seller_city.is_empty() {
            "-".to_string()
        } else {
            format!("{}, {}", seller.seller_city, seller.seller_state)
        };
        section.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            highlight.short_id,
            location,
            seller.order_count,
            format_currency(seller.total_sales, &options.currency_symbol)
        ));
    }
    section.push('\n');

    section
}

/// Generate the low review ratio section.
fn generate_low_rating_section(ratios: &[LowRatingRatio]) -> String {
    let mut section = String::new();

    section.push_str("## Low Review Categories\n\n");

    if ratios.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    section.push_str("| Category | Low Reviews | Total Reviews | Low Review % |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for ratio in ratios {
        section.push_str(&format!(
            "| {} | {} | {} | {:.2}% |\n",
            ratio.product_category_name_english,
            ratio.low_review,
            ratio.total_review,
            ratio.low_review_ratio
        ));
    }
    section.push('\n');

    section
}

/// Generate the customer map section.
fn generate_customer_section(map: &CustomerMap, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Customer Distribution\n\n");

    let Some((lat, lng)) = map.center else {
        section.push_str(NO_DATA);
        return section;
    };

    section.push_str(&format!(
        "Map centre: {:.4}, {:.4} ({} cities)\n\n",
        lat,
        lng,
        map.markers.len()
    ));
    section.push_str("| City | Latitude | Longitude | Marker Radius |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for marker in map.markers.iter().take(options.top_cities) {
        section.push_str(&format!(
            "| {} | {:.4} | {:.4} | {:.1} |\n",
            marker.label, marker.lat, marker.lng, marker.radius
        ));
    }
    section.push('\n');

    section
}

/// Generate the per-state customer table.
fn generate_state_section(states: &[StateSummary]) -> String {
    let mut section = String::new();

    section.push_str("## Customers by State\n\n");

    if states.is_empty() {
        section.push_str(NO_DATA);
        return section;
    }

    let coordinate = |value: Option<f64>| {
        value
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string())
    };

    section.push_str("| State | Customers | Latitude | Longitude |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for state in states {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            state.geolocation_state,
            state.customer_count,
            coordinate(state.geolocation_lat),
            coordinate(state.geolocation_lng)
        ));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by ecomdash*\n");

    footer
}
