use chrono::NaiveDate;
use rust_decimal::Decimal;
use zc_analytics_core::{
    cohort_analyzer::analyze_cohorts,
    config::CohortConfig,
    customer_aggregator::aggregate,
    synthetic::{generate, SyntheticConfig},
    Transaction,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(offset)
}

fn txn(row: usize, customer: &str, offset: i64, revenue: i64, eligible: bool) -> Transaction {
    Transaction {
        row,
        bill_id: None,
        customer_id: customer.to_string(),
        bill_date: day(offset),
        revenue_value: Decimal::new(revenue, 0),
        eligibility_flag: eligible,
        first_bill_date: day(offset),
        zrd_promo_discount: Decimal::ZERO,
        other_promo_discount: Decimal::ZERO,
        freebee_cost: Decimal::ZERO,
        promo_code: None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// 60 ZC-acquired customers averaging 150 against 40 NonZC averaging 86
/// gives a spend lift of about 74.4 %.
#[test]
fn spend_lift_matches_worked_example() {
    let mut txns = Vec::new();
    for i in 0..60 {
        txns.push(txn(txns.len(), &format!("zc-{i:03}"), 0, 150, true));
    }
    for i in 0..40 {
        txns.push(txn(txns.len(), &format!("nz-{i:03}"), 0, 86, false));
    }
    let report = analyze_cohorts(&aggregate(&txns), &txns, &CohortConfig::default());

    assert_eq!(report.zc_acquired.customer_count, 60);
    assert_eq!(report.non_zc_acquired.customer_count, 40);
    let lift = report.comparison.spend_lift.unwrap();
    assert!((lift - 0.744186).abs() < 1e-4, "lift={lift}");
}

/// Customers whose observation window is shorter than the horizon are
/// left out of both numerator and denominator.
#[test]
fn short_windows_are_excluded_from_retention() {
    let txns = vec![
        txn(0, "a", 0, 100, true),
        txn(1, "a", 7, 100, true),  // back on day 7: retained at 7
        txn(2, "c", 0, 100, true),
        txn(3, "c", 8, 100, true),  // back on day 8: only retained at 30
        txn(4, "b", 55, 100, true), // window of 5 days
        txn(5, "z", 60, 100, false), // sets as_of, window of 0
    ];
    let report = analyze_cohorts(&aggregate(&txns), &txns, &CohortConfig::default());
    let zc = &report.zc_acquired;

    let r7 = &zc.retention[0];
    assert_eq!((r7.horizon_days, r7.eligible, r7.retained, r7.excluded), (7, 2, 1, 1));
    assert_eq!(r7.rate, Some(0.5));

    let r30 = &zc.retention[1];
    assert_eq!((r30.eligible, r30.retained), (2, 2));
    assert_eq!(r30.rate, Some(1.0));

    let control = &report.non_zc_acquired.retention[0];
    assert_eq!(control.eligible, 0);
    assert_eq!(control.rate, None);
    assert_eq!(report.comparison.retention_lifts[0].relative_lift, None);

    // Nobody is observed for 90 days.
    assert_eq!(zc.ltv.eligible, 0);
    assert_eq!(zc.ltv.avg_ltv, None);
}

/// A same-day second order does not count as coming back.
#[test]
fn same_day_orders_do_not_retain() {
    let txns = vec![
        txn(0, "a", 0, 50, true),
        txn(1, "a", 0, 50, true),
        txn(2, "z", 40, 10, false),
    ];
    let report = analyze_cohorts(&aggregate(&txns), &txns, &CohortConfig::default());
    assert_eq!(report.zc_acquired.retention[0].retained, 0);
    assert_eq!(report.zc_acquired.retention[0].eligible, 1);
}

/// Retention rates always lie in [0, 1] and retained never exceeds eligible.
#[test]
fn retention_rates_are_bounded() {
    let txns = generate(&SyntheticConfig::with_customers(300), 17);
    let report = analyze_cohorts(&aggregate(&txns), &txns, &CohortConfig::default());
    for cohort in [&report.zc_acquired, &report.non_zc_acquired] {
        for r in &cohort.retention {
            assert!(r.retained <= r.eligible);
            assert_eq!(r.eligible + r.excluded, cohort.customer_count);
            if let Some(rate) = r.rate {
                assert!((0.0..=1.0).contains(&rate));
            }
        }
    }
}

/// LTV sums revenue inside [first, first + horizon] for observed customers.
#[test]
fn ltv_counts_only_the_horizon() {
    let txns = vec![
        txn(0, "a", 0, 100, true),
        txn(1, "a", 90, 50, true),
        txn(2, "a", 91, 999, true),
        txn(3, "z", 120, 10, false),
    ];
    let config = CohortConfig::default();
    let report = analyze_cohorts(&aggregate(&txns), &txns, &config);
    assert_eq!(report.zc_acquired.ltv.eligible, 1);
    assert_eq!(report.zc_acquired.ltv.avg_ltv, Some(150.0));
}

/// Order progression reports reach and gaps for successive orders.
#[test]
fn order_progression_tracks_repeat_orders() {
    let txns = vec![
        txn(0, "a", 0, 100, true),
        txn(1, "a", 10, 200, true),
        txn(2, "a", 30, 300, true),
        txn(3, "b", 0, 100, true),
        txn(4, "b", 20, 100, true),
    ];
    let report = analyze_cohorts(&aggregate(&txns), &txns, &CohortConfig::default());
    let steps = &report.zc_acquired.order_progression;
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].customers, 2);
    assert_eq!(steps[0].avg_days_since_prev, None);
    assert_eq!(steps[1].customers, 2);
    assert_eq!(steps[1].avg_days_since_prev, Some(15.0));
    assert_eq!(steps[2].customers, 1);
    assert_eq!(steps[2].reach_rate, Some(0.5));
    assert_eq!(steps[2].total_revenue, 300.0);
}
