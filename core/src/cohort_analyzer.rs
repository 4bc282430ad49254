//! Cohort analyzer: ZC-acquired vs NonZC-acquired customers.
//!
//! Cohort membership is decided once, by the eligibility flag of the
//! customer's first transaction, and never revisited.
//!
//! OBSERVATION BOUNDARY: a customer whose observation window
//! (dataset as-of date minus first purchase) is shorter than a horizon
//! is excluded from that horizon's rate entirely: denominator and
//! numerator. Same rule for the LTV horizon.

use crate::{
    config::CohortConfig,
    customer_aggregator::{group_by_customer, CustomerProfile},
    stats::{self, MetricSample, WelchTest},
    transaction::{dataset_as_of, Transaction},
    types::days_between,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionCohort {
    ZcAcquired,
    NonZcAcquired,
}

impl AcquisitionCohort {
    pub fn of(profile: &CustomerProfile) -> Self {
        if profile.acquired_with_zc {
            Self::ZcAcquired
        } else {
            Self::NonZcAcquired
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ZcAcquired    => "ZC-acquired",
            Self::NonZcAcquired => "NonZC-acquired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionRate {
    pub horizon_days: u32,
    /// Customers whose observation window covers the horizon.
    pub eligible:     usize,
    pub retained:     usize,
    /// Customers left out because their window is too short.
    pub excluded:     usize,
    /// retained / eligible; None when nobody is eligible.
    pub rate:         Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtvMetric {
    pub horizon_days: u32,
    pub eligible:     usize,
    pub avg_ltv:      Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStep {
    pub order_number:        u32,
    pub customers:           usize,
    /// customers / customers with a first order.
    pub reach_rate:          Option<f64>,
    pub avg_spend:           f64,
    pub median_spend:        f64,
    pub total_revenue:       f64,
    pub eligible_share:      f64,
    pub avg_days_since_prev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortMetrics {
    pub cohort:              AcquisitionCohort,
    pub customer_count:      usize,
    pub avg_order_count:     f64,
    pub avg_total_spend:     f64,
    pub total_spend_std_dev: f64,
    pub retention:           Vec<RetentionRate>,
    pub ltv:                 LtvMetric,
    /// Per-customer spend per 30 days over the active span.
    pub monthly_spend:       Option<MetricSample>,
    /// Per-customer orders per 30 days over the active span.
    pub avg_monthly_orders:  Option<f64>,
    pub order_progression:   Vec<OrderStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionLift {
    pub horizon_days:      u32,
    pub relative_lift:     Option<f64>,
    pub difference_points: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortComparison {
    pub spend_lift:         Option<f64>,
    pub order_lift:         Option<f64>,
    pub retention_lifts:    Vec<RetentionLift>,
    pub ltv_lift:           Option<f64>,
    pub monthly_spend_test: Option<WelchTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortReport {
    pub as_of:           Option<NaiveDate>,
    pub zc_acquired:     CohortMetrics,
    pub non_zc_acquired: CohortMetrics,
    pub comparison:      CohortComparison,
}

/// Whether a customer came back within `horizon_days` of the first
/// purchase. None when the observation window is shorter than the
/// horizon (the customer is excluded from the rate).
pub fn retained_within(history: &[&Transaction], as_of: NaiveDate, horizon_days: u32) -> Option<bool> {
    let first = history.first()?.bill_date;
    if days_between(first, as_of) < i64::from(horizon_days) {
        return None;
    }
    Some(history.iter().any(|t| {
        let d = days_between(first, t.bill_date);
        d > 0 && d <= i64::from(horizon_days)
    }))
}

/// Revenue within [first, first + horizon]. None when the window is
/// too short.
pub fn ltv_within(history: &[&Transaction], as_of: NaiveDate, horizon_days: u32) -> Option<f64> {
    let first = history.first()?.bill_date;
    if days_between(first, as_of) < i64::from(horizon_days) {
        return None;
    }
    Some(
        history
            .iter()
            .filter(|t| days_between(first, t.bill_date) <= i64::from(horizon_days))
            .map(|t| t.revenue_f64())
            .sum(),
    )
}

pub fn analyze_cohorts(
    profiles: &[CustomerProfile],
    transactions: &[Transaction],
    config: &CohortConfig,
) -> CohortReport {
    let histories = group_by_customer(transactions);
    let as_of = dataset_as_of(transactions);

    let members = |cohort: AcquisitionCohort| -> Vec<&CustomerProfile> {
        profiles.iter().filter(|p| AcquisitionCohort::of(p) == cohort).collect()
    };
    let zc = cohort_metrics(AcquisitionCohort::ZcAcquired, &members(AcquisitionCohort::ZcAcquired), &histories, as_of, config);
    let non_zc = cohort_metrics(AcquisitionCohort::NonZcAcquired, &members(AcquisitionCohort::NonZcAcquired), &histories, as_of, config);

    let zc_monthly: Vec<f64> = members(AcquisitionCohort::ZcAcquired).iter().map(|p| p.monthly_spend()).collect();
    let non_monthly: Vec<f64> = members(AcquisitionCohort::NonZcAcquired).iter().map(|p| p.monthly_spend()).collect();

    let comparison = compare(&zc, &non_zc, stats::welch_t_test(&zc_monthly, &non_monthly));

    log::info!(
        "cohort: {} ZC-acquired, {} NonZC-acquired, spend lift {}",
        zc.customer_count,
        non_zc.customer_count,
        comparison
            .spend_lift
            .map(|l| format!("{:+.1}%", l * 100.0))
            .unwrap_or_else(|| "n/a".into())
    );

    CohortReport {
        as_of,
        zc_acquired: zc,
        non_zc_acquired: non_zc,
        comparison,
    }
}

fn cohort_metrics(
    cohort: AcquisitionCohort,
    members: &[&CustomerProfile],
    histories: &BTreeMap<&str, Vec<&Transaction>>,
    as_of: Option<NaiveDate>,
    config: &CohortConfig,
) -> CohortMetrics {
    let member_histories: Vec<&[&Transaction]> = members
        .iter()
        .filter_map(|p| histories.get(p.customer_id.as_str()).map(Vec::as_slice))
        .collect();

    let spends: Vec<f64> = members.iter().map(|p| p.total_spend_f64()).collect();
    let orders: Vec<f64> = members.iter().map(|p| p.order_count as f64).collect();
    let monthly: Vec<f64> = members.iter().map(|p| p.monthly_spend()).collect();
    let monthly_orders: Vec<f64> = members
        .iter()
        .map(|p| p.order_count as f64 / (p.active_span_days() as f64 / 30.0 + 1.0))
        .collect();

    let retention = config
        .retention_horizons_days
        .iter()
        .map(|&horizon| {
            let outcomes: Vec<Option<bool>> = match as_of {
                Some(as_of) => member_histories
                    .iter()
                    .map(|h| retained_within(h, as_of, horizon))
                    .collect(),
                None => vec![None; member_histories.len()],
            };
            let eligible = outcomes.iter().filter(|o| o.is_some()).count();
            let retained = outcomes.iter().filter(|o| **o == Some(true)).count();
            RetentionRate {
                horizon_days: horizon,
                eligible,
                retained,
                excluded: outcomes.len() - eligible,
                rate: stats::rate(retained, eligible),
            }
        })
        .collect();

    let ltvs: Vec<f64> = match as_of {
        Some(as_of) => member_histories
            .iter()
            .filter_map(|h| ltv_within(h, as_of, config.ltv_horizon_days))
            .collect(),
        None => Vec::new(),
    };

    CohortMetrics {
        cohort,
        customer_count: members.len(),
        avg_order_count: stats::mean(&orders).unwrap_or(0.0),
        avg_total_spend: stats::mean(&spends).unwrap_or(0.0),
        total_spend_std_dev: stats::std_dev(&spends).unwrap_or(0.0),
        retention,
        ltv: LtvMetric {
            horizon_days: config.ltv_horizon_days,
            eligible: ltvs.len(),
            avg_ltv: stats::mean(&ltvs),
        },
        monthly_spend: MetricSample::from_values(&monthly),
        avg_monthly_orders: stats::mean(&monthly_orders),
        order_progression: order_progression(&member_histories, config.order_progression_depth),
    }
}

fn order_progression(histories: &[&[&Transaction]], depth: u32) -> Vec<OrderStep> {
    let initial = histories.iter().filter(|h| !h.is_empty()).count();
    let mut steps = Vec::new();

    for order_number in 1..=depth {
        let idx = (order_number - 1) as usize;
        let reached: Vec<&[&Transaction]> = histories.iter().copied().filter(|h| h.len() > idx).collect();
        if reached.is_empty() {
            break;
        }

        let spends: Vec<f64> = reached.iter().map(|h| h[idx].revenue_f64()).collect();
        let eligible = reached.iter().filter(|h| h[idx].eligibility_flag).count();
        let gaps: Vec<f64> = if idx == 0 {
            Vec::new()
        } else {
            reached
                .iter()
                .map(|h| days_between(h[idx - 1].bill_date, h[idx].bill_date) as f64)
                .collect()
        };

        steps.push(OrderStep {
            order_number,
            customers: reached.len(),
            reach_rate: stats::rate(reached.len(), initial),
            avg_spend: stats::mean(&spends).unwrap_or(0.0),
            median_spend: stats::median(&spends).unwrap_or(0.0),
            total_revenue: spends.iter().sum(),
            eligible_share: stats::rate(eligible, reached.len()).unwrap_or(0.0),
            avg_days_since_prev: stats::mean(&gaps),
        });
    }
    steps
}

fn compare(zc: &CohortMetrics, non_zc: &CohortMetrics, monthly_spend_test: Option<WelchTest>) -> CohortComparison {
    let populated = zc.customer_count > 0 && non_zc.customer_count > 0;
    let lift = |t: f64, c: f64| if populated { stats::relative_lift(t, c) } else { None };

    let retention_lifts = zc
        .retention
        .iter()
        .zip(&non_zc.retention)
        .map(|(t, c)| match (t.rate, c.rate) {
            (Some(tr), Some(cr)) => RetentionLift {
                horizon_days: t.horizon_days,
                relative_lift: stats::relative_lift(tr, cr),
                difference_points: Some((tr - cr) * 100.0),
            },
            _ => RetentionLift {
                horizon_days: t.horizon_days,
                relative_lift: None,
                difference_points: None,
            },
        })
        .collect();

    CohortComparison {
        spend_lift: lift(zc.avg_total_spend, non_zc.avg_total_spend),
        order_lift: lift(zc.avg_order_count, non_zc.avg_order_count),
        retention_lifts,
        ltv_lift: match (zc.ltv.avg_ltv, non_zc.ltv.avg_ltv) {
            (Some(t), Some(c)) => stats::relative_lift(t, c),
            _ => None,
        },
        monthly_spend_test,
    }
}
