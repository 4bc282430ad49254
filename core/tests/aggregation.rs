use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use zc_analytics_core::{
    customer_aggregator::{aggregate, group_by_customer},
    synthetic::{generate, SyntheticConfig},
    Transaction,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(offset)
}

fn txn(row: usize, customer: &str, offset: i64, revenue: Decimal, eligible: bool) -> Transaction {
    Transaction {
        row,
        bill_id: None,
        customer_id: customer.to_string(),
        bill_date: day(offset),
        revenue_value: revenue,
        eligibility_flag: eligible,
        first_bill_date: day(0),
        zrd_promo_discount: Decimal::ZERO,
        other_promo_discount: Decimal::ZERO,
        freebee_cost: Decimal::ZERO,
        promo_code: None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every customer id appears in exactly one profile and the order count
/// equals that customer's transaction count.
#[test]
fn grouping_is_complete() {
    let txns = generate(&SyntheticConfig::with_customers(120), 5);
    let profiles = aggregate(&txns);

    let ids: BTreeSet<&str> = txns.iter().map(|t| t.customer_id.as_str()).collect();
    assert_eq!(profiles.len(), ids.len());

    let total_orders: u32 = profiles.iter().map(|p| p.order_count).sum();
    assert_eq!(total_orders as usize, txns.len());

    for p in &profiles {
        let count = txns.iter().filter(|t| t.customer_id == p.customer_id).count();
        assert_eq!(p.order_count as usize, count, "customer {}", p.customer_id);
    }
}

/// first_purchase_date is the minimum bill date, whatever the row order.
#[test]
fn first_purchase_is_minimum_bill_date() {
    let txns = vec![
        txn(0, "a", 20, dec!(10), false),
        txn(1, "a", 3, dec!(20), false),
        txn(2, "a", 11, dec!(30), false),
    ];
    let profiles = aggregate(&txns);
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].first_purchase_date, day(3));
    assert_eq!(profiles[0].last_purchase_date, day(20));
    assert_eq!(profiles[0].total_spend, dec!(60));
}

/// Acquisition follows the chronologically first transaction; same-day
/// ties go to the earlier source row.
#[test]
fn acquisition_uses_first_transaction_in_sequence() {
    let txns = vec![
        txn(0, "late-row", 5, dec!(10), true),
        txn(1, "late-row", 1, dec!(10), false),
        txn(2, "tie", 1, dec!(10), true),
        txn(3, "tie", 1, dec!(10), false),
    ];
    let profiles = aggregate(&txns);
    let late = profiles.iter().find(|p| p.customer_id == "late-row").unwrap();
    let tie = profiles.iter().find(|p| p.customer_id == "tie").unwrap();

    assert!(!late.acquired_with_zc);
    assert!(late.is_zc_user);
    assert!(tie.acquired_with_zc);

    let groups = group_by_customer(&txns);
    let rows: Vec<usize> = groups["tie"].iter().map(|t| t.row).collect();
    assert_eq!(rows, vec![2, 3]);
}

/// Active months count distinct calendar months; monthly spend spreads
/// the total over the active span.
#[test]
fn month_based_profile_fields() {
    let txns = vec![
        txn(0, "a", 0, dec!(100), false),
        txn(1, "a", 10, dec!(100), false),
        txn(2, "a", 60, dec!(100), false),
    ];
    let p = &aggregate(&txns)[0];
    assert_eq!(p.active_months, 2);
    assert_eq!(p.active_span_days(), 60);
    assert!((p.monthly_spend() - 100.0).abs() < 1e-9);
    assert!((p.spend_per_active_month() - 150.0).abs() < 1e-9);
}

/// Profiles come out sorted by customer id.
#[test]
fn profiles_are_sorted_by_id() {
    let txns = vec![
        txn(0, "c", 0, dec!(1), false),
        txn(1, "a", 0, dec!(1), false),
        txn(2, "b", 0, dec!(1), false),
    ];
    let ids: Vec<String> = aggregate(&txns).into_iter().map(|p| p.customer_id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}
