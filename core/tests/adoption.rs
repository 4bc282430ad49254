use chrono::NaiveDate;
use rust_decimal::Decimal;
use zc_analytics_core::{
    adoption_analyzer::{analyze_adoption, ImpactBand},
    config::AdoptionConfig,
    synthetic::{generate, SyntheticConfig},
    Transaction,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 2, 1).unwrap() + chrono::Duration::days(offset)
}

fn txn(row: usize, customer: &str, offset: i64, revenue: i64, eligible: bool) -> Transaction {
    Transaction {
        row,
        bill_id: None,
        customer_id: customer.to_string(),
        bill_date: day(offset),
        revenue_value: Decimal::new(revenue, 0),
        eligibility_flag: eligible,
        first_bill_date: day(0),
        zrd_promo_discount: Decimal::ZERO,
        other_promo_discount: Decimal::ZERO,
        freebee_cost: Decimal::ZERO,
        promo_code: None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Identical behaviour on both sides of adoption gives a zero delta.
#[test]
fn identical_before_and_after_gives_zero_delta() {
    let txns = vec![
        txn(0, "a", 0, 100, false),
        txn(1, "a", 30, 50, true), // adoption event
        txn(2, "a", 60, 100, true),
    ];
    let report = analyze_adoption(&txns, &AdoptionConfig::default());
    assert_eq!(report.adopters.len(), 1);

    let a = &report.adopters[0];
    assert_eq!(a.adoption_date, day(30));
    assert_eq!(a.adoption_revenue, 50.0);
    assert!((a.before_spend_rate - 100.0).abs() < 1e-9);
    assert!((a.after_spend_rate - 100.0).abs() < 1e-9);
    assert!(a.spend_rate_delta.abs() < 1e-9);
    assert!(a.frequency_delta.abs() < 1e-9);
    assert_eq!(a.spend_lift, Some(0.0));
    assert_eq!(a.ticket_lift, Some(0.0));
}

/// An adopter with nothing after adoption stays in the aggregates with
/// After metrics of zero.
#[test]
fn zero_after_adopters_are_included() {
    let txns = vec![
        txn(0, "a", 0, 100, false),
        txn(1, "a", 10, 80, true),
        txn(2, "z", 60, 10, false),
    ];
    let report = analyze_adoption(&txns, &AdoptionConfig::default());
    assert_eq!(report.summary.adopter_count, 1);

    let a = &report.adopters[0];
    assert_eq!(a.after_orders, 0);
    assert_eq!(a.after_spend_rate, 0.0);
    assert_eq!(a.after_frequency, 0.0);
    assert_eq!(a.ticket_lift, None);
    assert_eq!(a.retained, Some(false));
    assert_eq!(report.summary.avg_after_spend_rate, Some(0.0));
}

/// Customers eligible from the first order, or never eligible, are not adopters.
#[test]
fn only_late_eligibility_counts_as_adoption() {
    let txns = vec![
        txn(0, "acquired", 0, 100, true),
        txn(1, "acquired", 5, 100, false),
        txn(2, "never", 0, 100, false),
        txn(3, "never", 5, 100, false),
        txn(4, "adopter", 0, 100, false),
        txn(5, "adopter", 5, 100, true),
    ];
    let report = analyze_adoption(&txns, &AdoptionConfig::default());
    let ids: Vec<&str> = report.adopters.iter().map(|a| a.customer_id.as_str()).collect();
    assert_eq!(ids, vec!["adopter"]);
}

/// Post-adoption retention excludes adopters whose window is cut short.
#[test]
fn post_adoption_retention_respects_observation_window() {
    let txns = vec![
        txn(0, "early", 0, 100, false),
        txn(1, "early", 5, 100, true),
        txn(2, "early", 10, 100, true),
        txn(3, "late", 40, 100, false),
        txn(4, "late", 50, 100, true),
        txn(5, "late", 55, 100, true),
    ];
    let report = analyze_adoption(&txns, &AdoptionConfig::default());
    let retention = &report.summary.retention;
    assert_eq!(retention.horizon_days, 30);
    assert_eq!(retention.eligible, 1);
    assert_eq!(retention.retained, 1);
    assert_eq!(retention.excluded, 1);

    let curve_7 = &report.retention_curve[0];
    assert_eq!(curve_7.horizon_days, 7);
    assert_eq!((curve_7.eligible, curve_7.retained), (1, 1));
}

/// Time windows bucket adopter transactions by day offset from adoption.
#[test]
fn time_windows_bucket_by_offset() {
    let txns = vec![
        txn(0, "a", 0, 40, false),  // -45
        txn(1, "a", 30, 60, false), // -15
        txn(2, "a", 45, 100, true), // 0
        txn(3, "a", 80, 200, true), // +35
    ];
    let report = analyze_adoption(&txns, &AdoptionConfig::default());
    let counts: Vec<usize> = report.time_windows.iter().map(|w| w.transactions).collect();
    assert_eq!(counts, vec![1, 1, 1, 1, 0]);
    assert_eq!(report.time_windows[2].eligible_share, Some(1.0));
    assert_eq!(report.time_windows[4].avg_revenue, None);
}

/// Impact band shares cover every adopter with a ticket lift.
#[test]
fn impact_bands_cover_banded_adopters() {
    let txns = generate(&SyntheticConfig::with_customers(400), 13);
    let report = analyze_adoption(&txns, &AdoptionConfig::default());
    let banded = report.adopters.iter().filter(|a| a.ticket_lift.is_some()).count();
    let counted: usize = report.impact_bands.iter().map(|b| b.customer_count).sum();
    assert_eq!(counted, banded);
    assert_eq!(report.impact_bands.len(), ImpactBand::ALL.len());
}
