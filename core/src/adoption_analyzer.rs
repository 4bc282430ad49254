//! Adoption impact analyzer: behaviour before and after a customer's
//! first eligible transaction.
//!
//! RULE: an adopter is a customer NOT eligible on the first transaction
//! and eligible on a later one. The adoption event is that first
//! eligible transaction.
//! RULE: Before = transactions preceding the event, After = transactions
//! following it. The event itself belongs to neither side and is
//! reported as `adoption_revenue`.
//! RULE: adopters with no transaction after adoption stay in every
//! aggregate with After metrics of zero.

use crate::{
    cohort_analyzer::RetentionRate,
    config::AdoptionConfig,
    customer_aggregator::group_by_customer,
    stats::{self, MetricSample},
    transaction::{dataset_as_of, Transaction},
    types::{days_between, CustomerId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Day offsets relative to adoption, both ends inclusive.
pub const TIME_WINDOWS: [(i64, i64, &str); 5] = [
    (-90, -31, "3 months before"),
    (-30, -1, "1 month before"),
    (0, 30, "1st month after"),
    (31, 60, "2nd month after"),
    (61, 90, "3rd month after"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdopterMetrics {
    pub customer_id:         CustomerId,
    pub first_purchase_date: NaiveDate,
    pub adoption_date:       NaiveDate,
    pub days_to_adoption:    i64,
    pub adoption_revenue:    f64,

    pub before_orders:       u32,
    pub before_revenue:      f64,
    pub before_days:         i64,
    pub after_orders:        u32,
    pub after_revenue:       f64,
    pub after_days:          i64,

    /// Revenue per 30 days.
    pub before_spend_rate:   f64,
    pub after_spend_rate:    f64,
    /// Orders per 30 days.
    pub before_frequency:    f64,
    pub after_frequency:     f64,

    pub spend_rate_delta:    f64,
    pub frequency_delta:     f64,
    pub spend_lift:          Option<f64>,
    pub frequency_lift:      Option<f64>,
    /// Average-ticket lift; None unless both sides have orders.
    pub ticket_lift:         Option<f64>,

    /// Came back within the post-adoption window. None when the window
    /// is not fully observed.
    pub retained:            Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionSummary {
    pub adopter_count:         usize,
    pub avg_days_to_adoption:  Option<f64>,
    pub avg_before_spend_rate: Option<f64>,
    pub avg_after_spend_rate:  Option<f64>,
    pub avg_before_frequency:  Option<f64>,
    pub avg_after_frequency:   Option<f64>,
    pub spend_rate_delta:      Option<MetricSample>,
    pub frequency_delta:       Option<MetricSample>,
    pub spend_rate_lift:       Option<f64>,
    pub frequency_lift:        Option<f64>,
    pub retention:             RetentionRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowMetrics {
    pub label:            String,
    pub start_day:        i64,
    pub end_day:          i64,
    pub avg_revenue:      Option<f64>,
    pub transactions:     usize,
    pub unique_customers: usize,
    pub eligible_share:   Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactBand {
    Negative,
    Low,
    Medium,
    High,
}

impl ImpactBand {
    pub const ALL: [ImpactBand; 4] = [
        ImpactBand::Negative,
        ImpactBand::Low,
        ImpactBand::Medium,
        ImpactBand::High,
    ];

    /// Band for a relative lift (0.5 = +50 %). Upper edges inclusive.
    pub fn of(lift: f64) -> Self {
        let pct = lift * 100.0;
        if pct <= 0.0 {
            Self::Negative
        } else if pct <= 50.0 {
            Self::Low
        } else if pct <= 100.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Negative => "Negative",
            Self::Low      => "Low (0-50%)",
            Self::Medium   => "Medium (50-100%)",
            Self::High     => "High (>100%)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactBandCount {
    pub band:           ImpactBand,
    pub customer_count: usize,
    pub share:          Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionReport {
    pub as_of:           Option<NaiveDate>,
    pub adopters:        Vec<AdopterMetrics>,
    pub summary:         AdoptionSummary,
    pub time_windows:    Vec<WindowMetrics>,
    pub impact_bands:    Vec<ImpactBandCount>,
    pub retention_curve: Vec<RetentionRate>,
}

/// Index of the adoption event in a chronologically ordered history.
pub fn adoption_index(history: &[&Transaction]) -> Option<usize> {
    let first = history.first()?;
    if first.eligibility_flag {
        return None;
    }
    history.iter().position(|t| t.eligibility_flag)
}

fn per_30_days(value: f64, days: i64) -> f64 {
    value / days.max(1) as f64 * 30.0
}

/// Before/after metrics for one customer; None when not an adopter.
pub fn adopter_metrics(
    customer_id: &str,
    history: &[&Transaction],
    as_of: NaiveDate,
    retention_window_days: u32,
) -> Option<AdopterMetrics> {
    let idx = adoption_index(history)?;
    let first_purchase_date = history.first()?.bill_date;
    let event = history[idx];
    let adoption_date = event.bill_date;
    let before = &history[..idx];
    let after = &history[idx + 1..];

    let before_revenue: f64 = before.iter().map(|t| t.revenue_f64()).sum();
    let after_revenue: f64 = after.iter().map(|t| t.revenue_f64()).sum();
    let before_days = days_between(first_purchase_date, adoption_date).max(1);
    let after_days = days_between(adoption_date, as_of).max(1);

    let before_spend_rate = per_30_days(before_revenue, before_days);
    let after_spend_rate = per_30_days(after_revenue, after_days);
    let before_frequency = per_30_days(before.len() as f64, before_days);
    let after_frequency = per_30_days(after.len() as f64, after_days);

    let ticket_lift = if before.is_empty() || after.is_empty() {
        None
    } else {
        stats::relative_lift(
            after_revenue / after.len() as f64,
            before_revenue / before.len() as f64,
        )
    };

    Some(AdopterMetrics {
        customer_id: customer_id.to_string(),
        first_purchase_date,
        adoption_date,
        days_to_adoption: days_between(first_purchase_date, adoption_date),
        adoption_revenue: event.revenue_f64(),
        before_orders: before.len() as u32,
        before_revenue,
        before_days,
        after_orders: after.len() as u32,
        after_revenue,
        after_days,
        before_spend_rate,
        after_spend_rate,
        before_frequency,
        after_frequency,
        spend_rate_delta: after_spend_rate - before_spend_rate,
        frequency_delta: after_frequency - before_frequency,
        spend_lift: stats::relative_lift(after_spend_rate, before_spend_rate),
        frequency_lift: stats::relative_lift(after_frequency, before_frequency),
        ticket_lift,
        retained: returned_after(history, idx, as_of, retention_window_days),
    })
}

/// Whether any transaction after the adoption event falls within
/// `0 < d ≤ window` days of it. None when as_of cuts the window short.
fn returned_after(history: &[&Transaction], idx: usize, as_of: NaiveDate, window: u32) -> Option<bool> {
    let adoption_date = history.get(idx)?.bill_date;
    if days_between(adoption_date, as_of) < i64::from(window) {
        return None;
    }
    Some(history[idx + 1..].iter().any(|t| {
        let d = days_between(adoption_date, t.bill_date);
        d > 0 && d <= i64::from(window)
    }))
}

fn retention_rate(horizon_days: u32, outcomes: &[Option<bool>]) -> RetentionRate {
    let eligible = outcomes.iter().filter(|o| o.is_some()).count();
    let retained = outcomes.iter().filter(|o| **o == Some(true)).count();
    RetentionRate {
        horizon_days,
        eligible,
        retained,
        excluded: outcomes.len() - eligible,
        rate: stats::rate(retained, eligible),
    }
}

pub fn analyze_adoption(transactions: &[Transaction], config: &AdoptionConfig) -> AdoptionReport {
    let histories = group_by_customer(transactions);
    let as_of = dataset_as_of(transactions);

    let adopter_histories: Vec<(&str, &[&Transaction], usize)> = histories
        .iter()
        .filter_map(|(id, h)| adoption_index(h).map(|idx| (*id, h.as_slice(), idx)))
        .collect();

    let adopters: Vec<AdopterMetrics> = match as_of {
        Some(as_of) => adopter_histories
            .iter()
            .filter_map(|(id, h, _)| adopter_metrics(id, h, as_of, config.retention_window_days))
            .collect(),
        None => Vec::new(),
    };

    let summary = summarise(&adopters, config.retention_window_days);

    let time_windows = TIME_WINDOWS
        .iter()
        .map(|&(start_day, end_day, label)| {
            let in_window: Vec<&Transaction> = adopter_histories
                .iter()
                .flat_map(|(_, h, idx)| {
                    let adoption_date = h[*idx].bill_date;
                    h.iter().copied().filter(move |t| {
                        let d = days_between(adoption_date, t.bill_date);
                        d >= start_day && d <= end_day
                    })
                })
                .collect();
            let revenues: Vec<f64> = in_window.iter().map(|t| t.revenue_f64()).collect();
            let customers: BTreeSet<&str> = in_window.iter().map(|t| t.customer_id.as_str()).collect();
            let eligible = in_window.iter().filter(|t| t.eligibility_flag).count();
            WindowMetrics {
                label: label.to_string(),
                start_day,
                end_day,
                avg_revenue: stats::mean(&revenues),
                transactions: in_window.len(),
                unique_customers: customers.len(),
                eligible_share: stats::rate(eligible, in_window.len()),
            }
        })
        .collect();

    let banded: Vec<ImpactBand> = adopters.iter().filter_map(|a| a.ticket_lift).map(ImpactBand::of).collect();
    let impact_bands = ImpactBand::ALL
        .iter()
        .map(|&band| {
            let customer_count = banded.iter().filter(|b| **b == band).count();
            ImpactBandCount {
                band,
                customer_count,
                share: stats::rate(customer_count, banded.len()),
            }
        })
        .collect();

    let retention_curve = config
        .retention_curve_days
        .iter()
        .map(|&days| {
            let outcomes: Vec<Option<bool>> = match as_of {
                Some(as_of) => adopter_histories
                    .iter()
                    .map(|(_, h, idx)| returned_after(h, *idx, as_of, days))
                    .collect(),
                None => Vec::new(),
            };
            retention_rate(days, &outcomes)
        })
        .collect();

    log::info!(
        "adoption: {} adopters, spend rate {:.2} -> {:.2} per 30 days",
        summary.adopter_count,
        summary.avg_before_spend_rate.unwrap_or(0.0),
        summary.avg_after_spend_rate.unwrap_or(0.0)
    );

    AdoptionReport {
        as_of,
        adopters,
        summary,
        time_windows,
        impact_bands,
        retention_curve,
    }
}

fn summarise(adopters: &[AdopterMetrics], retention_window_days: u32) -> AdoptionSummary {
    let collect = |f: &dyn Fn(&AdopterMetrics) -> f64| -> Vec<f64> { adopters.iter().map(f).collect() };

    let before_spend = stats::mean(&collect(&|a: &AdopterMetrics| a.before_spend_rate));
    let after_spend = stats::mean(&collect(&|a: &AdopterMetrics| a.after_spend_rate));
    let before_freq = stats::mean(&collect(&|a: &AdopterMetrics| a.before_frequency));
    let after_freq = stats::mean(&collect(&|a: &AdopterMetrics| a.after_frequency));
    let retained: Vec<Option<bool>> = adopters.iter().map(|a| a.retained).collect();

    AdoptionSummary {
        adopter_count: adopters.len(),
        avg_days_to_adoption: stats::mean(&collect(&|a: &AdopterMetrics| a.days_to_adoption as f64)),
        avg_before_spend_rate: before_spend,
        avg_after_spend_rate: after_spend,
        avg_before_frequency: before_freq,
        avg_after_frequency: after_freq,
        spend_rate_delta: MetricSample::from_values(&collect(&|a: &AdopterMetrics| a.spend_rate_delta)),
        frequency_delta: MetricSample::from_values(&collect(&|a: &AdopterMetrics| a.frequency_delta)),
        spend_rate_lift: before_spend.zip(after_spend).and_then(|(b, a)| stats::relative_lift(a, b)),
        frequency_lift: before_freq.zip(after_freq).and_then(|(b, a)| stats::relative_lift(a, b)),
        retention: retention_rate(retention_window_days, &retained),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_band_edges_are_upper_inclusive() {
        assert_eq!(ImpactBand::of(-0.2), ImpactBand::Negative);
        assert_eq!(ImpactBand::of(0.0), ImpactBand::Negative);
        assert_eq!(ImpactBand::of(0.5), ImpactBand::Low);
        assert_eq!(ImpactBand::of(0.51), ImpactBand::Medium);
        assert_eq!(ImpactBand::of(1.0), ImpactBand::Medium);
        assert_eq!(ImpactBand::of(1.01), ImpactBand::High);
    }

    #[test]
    fn rates_never_divide_by_zero_days() {
        assert_eq!(per_30_days(100.0, 0), 3000.0);
        assert_eq!(per_30_days(100.0, 30), 100.0);
    }
}
