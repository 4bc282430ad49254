//! Segmentation engine: behavioural segments and value tiers.
//!
//! Rules are evaluated in a fixed priority order; the first match wins
//! and Occasional catches everything else, so every profile receives
//! exactly one label for any threshold configuration.

use crate::{
    config::SegmentationThresholds,
    customer_aggregator::CustomerProfile,
    stats,
    types::CustomerId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    HighValue,
    Frequent,
    AtRisk,
    Occasional,
}

impl Segment {
    /// Priority order. Never reorder without revisiting classify().
    pub const ALL: [Segment; 4] = [
        Segment::HighValue,
        Segment::Frequent,
        Segment::AtRisk,
        Segment::Occasional,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighValue  => "High-Value",
            Self::Frequent   => "Frequent",
            Self::AtRisk     => "At-Risk",
            Self::Occasional => "Occasional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentAssignment {
    pub customer_id: CustomerId,
    pub segment:     Segment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub segment:        Segment,
    pub customer_count: usize,
    pub share:          f64,
    pub avg_spend:      f64,
    pub avg_orders:     f64,
    pub zc_user_share:  f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueTier {
    Low,
    Medium,
    High,
    Premium,
}

impl ValueTier {
    pub const ALL: [ValueTier; 4] = [
        ValueTier::Low,
        ValueTier::Medium,
        ValueTier::High,
        ValueTier::Premium,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueTierSummary {
    pub tier:              ValueTier,
    pub zc_user:           bool,
    pub customer_count:    usize,
    pub avg_monthly_spend: f64,
    pub avg_active_months: f64,
    pub avg_total_spend:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub assignments: Vec<SegmentAssignment>,
    pub summary:     Vec<SegmentSummary>,
    pub value_tiers: Vec<ValueTierSummary>,
}

/// Classify one profile. Pure: no state beyond the arguments.
pub fn classify(profile: &CustomerProfile, thresholds: &SegmentationThresholds) -> Segment {
    if profile.total_spend >= thresholds.high_value_spend_threshold {
        Segment::HighValue
    } else if profile.order_count >= thresholds.high_frequency_count_threshold {
        Segment::Frequent
    } else if profile.order_count <= thresholds.at_risk_max_orders {
        Segment::AtRisk
    } else {
        Segment::Occasional
    }
}

pub fn segment_customers(
    profiles: &[CustomerProfile],
    thresholds: &SegmentationThresholds,
) -> SegmentationReport {
    let assignments: Vec<SegmentAssignment> = profiles
        .iter()
        .map(|p| SegmentAssignment {
            customer_id: p.customer_id.clone(),
            segment:     classify(p, thresholds),
        })
        .collect();

    let summary = Segment::ALL
        .iter()
        .map(|&segment| {
            let members: Vec<&CustomerProfile> = profiles
                .iter()
                .zip(&assignments)
                .filter(|(_, a)| a.segment == segment)
                .map(|(p, _)| p)
                .collect();
            summarise_segment(segment, &members, profiles.len())
        })
        .collect();

    let value_tiers = value_tier_breakdown(profiles);

    log::info!(
        "segmentation: labelled {} customers into {} segments",
        assignments.len(),
        Segment::ALL.len()
    );

    SegmentationReport {
        assignments,
        summary,
        value_tiers,
    }
}

fn summarise_segment(segment: Segment, members: &[&CustomerProfile], total: usize) -> SegmentSummary {
    let spends: Vec<f64> = members.iter().map(|p| p.total_spend_f64()).collect();
    let orders: Vec<f64> = members.iter().map(|p| p.order_count as f64).collect();
    let zc_users = members.iter().filter(|p| p.is_zc_user).count();
    SegmentSummary {
        segment,
        customer_count: members.len(),
        share: stats::rate(members.len(), total).unwrap_or(0.0),
        avg_spend: stats::mean(&spends).unwrap_or(0.0),
        avg_orders: stats::mean(&orders).unwrap_or(0.0),
        zc_user_share: stats::rate(zc_users, members.len()).unwrap_or(0.0),
    }
}

/// Quartile tier of a spend value given the three cut points.
/// Bins are right-inclusive: (-inf, q1], (q1, q2], (q2, q3], (q3, inf).
fn tier_for(spend: f64, cuts: &[f64; 3]) -> ValueTier {
    if spend <= cuts[0] {
        ValueTier::Low
    } else if spend <= cuts[1] {
        ValueTier::Medium
    } else if spend <= cuts[2] {
        ValueTier::High
    } else {
        ValueTier::Premium
    }
}

/// Quartiles of lifetime spend, crossed with ZC usage. Empty groups are
/// omitted.
pub fn value_tier_breakdown(profiles: &[CustomerProfile]) -> Vec<ValueTierSummary> {
    let spends: Vec<f64> = profiles.iter().map(|p| p.total_spend_f64()).collect();
    let (Some(q1), Some(q2), Some(q3)) = (
        stats::quantile(&spends, 0.25),
        stats::quantile(&spends, 0.50),
        stats::quantile(&spends, 0.75),
    ) else {
        return Vec::new();
    };
    let cuts = [q1, q2, q3];

    let mut rows = Vec::new();
    for tier in ValueTier::ALL {
        for zc_user in [true, false] {
            let members: Vec<&CustomerProfile> = profiles
                .iter()
                .filter(|p| p.is_zc_user == zc_user && tier_for(p.total_spend_f64(), &cuts) == tier)
                .collect();
            if members.is_empty() {
                continue;
            }
            let monthly: Vec<f64> = members.iter().map(|p| p.spend_per_active_month()).collect();
            let months: Vec<f64> = members.iter().map(|p| p.active_months as f64).collect();
            let totals: Vec<f64> = members.iter().map(|p| p.total_spend_f64()).collect();
            rows.push(ValueTierSummary {
                tier,
                zc_user,
                customer_count: members.len(),
                avg_monthly_spend: stats::mean(&monthly).unwrap_or(0.0),
                avg_active_months: stats::mean(&months).unwrap_or(0.0),
                avg_total_spend: stats::mean(&totals).unwrap_or(0.0),
            });
        }
    }
    rows
}
