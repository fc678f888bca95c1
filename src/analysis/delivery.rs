//! Delayed order classification.
//!
//! Joins the (date-filtered) orders against the shipping table and either
//! summarizes delivery status or returns the late shipping rows. Which
//! one is chosen is explicit through [`DelayMode`].

use crate::models::{
    DelayMode, DeliveryStatus, DeliveryStatusCount, DeliveryView, LateOrder, RevenueRow,
    ShippingRecord,
};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Fill `delay_days` and `late_delivery` on every record in place.
///
/// This mutates the caller's records: after the call the derived values
/// look like supplied ones. Returns the number of records that received a
/// delay value.
pub fn append_delay_days(records: &mut [ShippingRecord]) -> usize {
    let mut annotated = 0;

    for record in records.iter_mut() {
        if let Some(days) = record.computed_delay_days() {
            record.delay_days = Some(days);
            annotated += 1;
        }
        if record.late_delivery.is_none() {
            record.late_delivery = record.is_late();
        }
    }

    annotated
}

/// Inner join of `orders` and `shipping` on order_id.
///
/// One item per matching (order row, shipping row) pair, in order row
/// order: an order paid in several instalments yields its shipping rows
/// once per payment.
fn joined<'a>(orders: &[RevenueRow], shipping: &'a [ShippingRecord]) -> Vec<&'a ShippingRecord> {
    let mut by_order: HashMap<&str, Vec<&'a ShippingRecord>> = HashMap::new();
    for record in shipping {
        by_order.entry(record.order_id.as_str()).or_default().push(record);
    }

    orders
        .iter()
        .filter_map(|order| by_order.get(order.order_id.as_str()))
        .flatten()
        .copied()
        .collect()
}

/// Joined rows per delivery status, most frequent status first.
///
/// Rows whose status cannot be determined (no flag and a missing date)
/// are not counted.
pub fn delivery_summary(orders: &[RevenueRow], shipping: &[ShippingRecord]) -> Vec<DeliveryStatusCount> {
    let mut by_status: BTreeMap<DeliveryStatus, u64> = BTreeMap::new();
    let mut unknown = 0usize;

    for record in joined(orders, shipping) {
        match record.is_late() {
            Some(late) => *by_status.entry(DeliveryStatus::from(late)).or_default() += 1,
            None => unknown += 1,
        }
    }

    if unknown > 0 {
        debug!("{} joined rows have no delivery status", unknown);
    }

    let mut rows: Vec<DeliveryStatusCount> = by_status
        .into_iter()
        .map(|(status, count)| DeliveryStatusCount { status, count })
        .collect();

    rows.sort_by_key(|row| Reverse(row.count));
    rows
}

/// Late joined rows for the orders in `orders`, in order row order.
pub fn late_orders(orders: &[RevenueRow], shipping: &[ShippingRecord]) -> Vec<LateOrder> {
    joined(orders, shipping)
        .into_iter()
        .filter(|record| record.is_late() == Some(true))
        .map(|record| LateOrder {
            order_id: record.order_id.clone(),
            shipping_limit_date: record.shipping_limit_date,
            order_delivered_carrier_date: record.order_delivered_carrier_date,
            delay_days: record.computed_delay_days(),
        })
        .collect()
}

/// Run the classifier in the requested mode.
pub fn classify_deliveries(
    mode: DelayMode,
    orders: &[RevenueRow],
    shipping: &[ShippingRecord],
) -> DeliveryView {
    match mode {
        DelayMode::Summary => DeliveryView::Summary(delivery_summary(orders, shipping)),
        DelayMode::LateRows => DeliveryView::LateRows(late_orders(orders, shipping)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 3, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn order(id: &str) -> RevenueRow {
        RevenueRow {
            order_id: id.to_string(),
            order_purchase_timestamp: day(1),
            payment_value: 1.0,
        }
    }

    fn shipping(id: &str, limit: u32, carrier: Option<u32>, flag: Option<bool>) -> ShippingRecord {
        ShippingRecord {
            order_id: id.to_string(),
            order_purchase_timestamp: Some(day(1)),
            shipping_limit_date: Some(day(limit)),
            order_delivered_carrier_date: carrier.map(day),
            late_delivery: flag,
            delay_days: None,
        }
    }

    fn sample() -> (Vec<RevenueRow>, Vec<ShippingRecord>) {
        let orders = vec![order("a"), order("b"), order("c"), order("d"), order("a")];
        let records = vec![
            shipping("a", 5, Some(4), None),
            shipping("b", 5, Some(9), None),
            shipping("c", 5, Some(7), Some(true)),
            shipping("d", 5, None, None),
            shipping("zzz", 5, Some(20), None),
        ];
        (orders, records)
    }

    #[test]
    fn test_delivery_summary_labels_and_counts() {
        let (orders, records) = sample();

        let summary = delivery_summary(&orders, &records);

        // "a" has two payments, so its on-time row counts twice; ties keep
        // the On Time label first
        assert_eq!(
            summary,
            vec![
                DeliveryStatusCount { status: DeliveryStatus::OnTime, count: 2 },
                DeliveryStatusCount { status: DeliveryStatus::Late, count: 2 },
            ]
        );
    }

    #[test]
    fn test_delivery_summary_counts_each_payment() {
        let orders = vec![order("o1"), order("o1"), order("o2")];
        let records = vec![
            shipping("o1", 5, Some(8), Some(true)),
            shipping("o2", 5, Some(4), Some(false)),
        ];

        let summary = delivery_summary(&orders, &records);

        assert_eq!(
            summary,
            vec![
                DeliveryStatusCount { status: DeliveryStatus::Late, count: 2 },
                DeliveryStatusCount { status: DeliveryStatus::OnTime, count: 1 },
            ]
        );

        let late = late_orders(&orders, &records);
        assert_eq!(late.len(), 2);
        assert!(late.iter().all(|l| l.order_id == "o1"));
    }

    #[test]
    fn test_late_orders_returns_filtered_rows() {
        let (orders, records) = sample();

        let late = late_orders(&orders, &records);

        let ids: Vec<&str> = late.iter().map(|l| l.order_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(late[0].delay_days, Some(4));
        assert_eq!(late[1].delay_days, Some(2));
    }

    #[test]
    fn test_classify_deliveries_modes() {
        let (orders, records) = sample();

        match classify_deliveries(DelayMode::Summary, &orders, &records) {
            DeliveryView::Summary(rows) => assert_eq!(rows.len(), 2),
            other => panic!("unexpected view: {:?}", other),
        }
        match classify_deliveries(DelayMode::LateRows, &orders, &records) {
            DeliveryView::LateRows(rows) => assert_eq!(rows.len(), 2),
            other => panic!("unexpected view: {:?}", other),
        }
    }

    #[test]
    fn test_empty_orders_give_empty_views() {
        let (_, records) = sample();
        assert!(classify_deliveries(DelayMode::Summary, &[], &records).is_empty());
        assert!(classify_deliveries(DelayMode::LateRows, &[], &records).is_empty());
    }

    #[test]
    fn test_append_delay_days_mutates_input() {
        let (_, mut records) = sample();

        let annotated = append_delay_days(&mut records);

        assert_eq!(annotated, 4);
        assert_eq!(records[0].delay_days, Some(-1));
        assert_eq!(records[0].late_delivery, Some(false));
        assert_eq!(records[1].late_delivery, Some(true));
        // Supplied flag is left alone
        assert_eq!(records[2].late_delivery, Some(true));
        assert_eq!(records[3].delay_days, None);
        assert_eq!(records[3].late_delivery, None);
    }
}
