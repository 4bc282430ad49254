//! ROI calculator: scenario projection of programme impact.
//!
//! RULE: the spend lift always comes from an analysis report
//! (cohort or adoption), never from a hard-coded figure.
//! RULE: every sample behind the lift must reach `min_sample_size`,
//! otherwise the projection is refused with InsufficientData.
//! RULE: the confidence interval comes from per-customer variance of
//! the lift metric, not from a fixed percentage of the point estimate.
//! RULE: projection models are non-decreasing in the target rate, so a
//! higher target never moves the point estimate against the lift sign.

use crate::{
    adoption_analyzer::AdoptionReport,
    cohort_analyzer::CohortReport,
    config::{LiftSource, ProjectionConfig, RoiConfig},
    error::{AnalyticsError, AnalyticsResult},
    stats::{self, MetricSample},
};
use serde::{Deserialize, Serialize};

const BASE_INCREMENTALITY: f64 = 0.75;
const CANNIBALISATION_PER_RATE: f64 = 0.3;
const MIN_INCREMENTALITY: f64 = 0.4;
const MAX_VOLUME_DISCOUNT_RATE: f64 = 0.5;
const VOLUME_DISCOUNT_PER_RATE: f64 = 0.1;
const MAX_EXECUTION_RISK: f64 = 0.3;
const EXECUTION_RISK_PER_RATE: f64 = 0.5;
const ROLLOUT_MONTHS: u32 = 12;
const ROLLOUT_SPEED: f64 = 0.8;
const ROLLOUT_MIDPOINT: f64 = 6.0;

// ── Scenario ───────────────────────────────────────────────────────

/// The single scalar a projection is run for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub target_adoption_rate: f64,
}

impl ScenarioInput {
    pub fn new(target_adoption_rate: f64) -> AnalyticsResult<Self> {
        if !target_adoption_rate.is_finite() || !(0.0..=1.0).contains(&target_adoption_rate) {
            return Err(AnalyticsError::InvalidScenario(format!(
                "target adoption rate {target_adoption_rate} must lie in [0, 1]"
            )));
        }
        Ok(Self { target_adoption_rate })
    }
}

// ── Lift estimate ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSize {
    pub metric: String,
    pub size:   usize,
}

/// Per-user monthly spend lift with its sampling error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftEstimate {
    pub source:                   LiftSource,
    /// Currency per user per 30 days.
    pub monthly_spend_lift:       f64,
    pub standard_error:           f64,
    pub samples:                  Vec<SampleSize>,
    /// Orders per 30 days of the treatment group.
    pub treatment_monthly_orders: f64,
}

fn sample_size(metric: &str, sample: Option<&MetricSample>) -> SampleSize {
    SampleSize {
        metric: metric.to_string(),
        size:   sample.map_or(0, |s| s.n),
    }
}

impl LiftEstimate {
    /// ZC-acquired minus NonZC-acquired monthly spend. Standard error of
    /// a difference of independent means.
    pub fn from_cohorts(report: &CohortReport) -> Self {
        let treatment = report.zc_acquired.monthly_spend.as_ref();
        let control = report.non_zc_acquired.monthly_spend.as_ref();
        let se = |s: Option<&MetricSample>| s.map_or(0.0, MetricSample::standard_error);
        Self {
            source: LiftSource::Cohort,
            monthly_spend_lift: treatment.map_or(0.0, |s| s.mean) - control.map_or(0.0, |s| s.mean),
            standard_error: (se(treatment).powi(2) + se(control).powi(2)).sqrt(),
            samples: vec![
                sample_size("zc_acquired.monthly_spend", treatment),
                sample_size("non_zc_acquired.monthly_spend", control),
            ],
            treatment_monthly_orders: report.zc_acquired.avg_monthly_orders.unwrap_or(0.0),
        }
    }

    /// Mean within-adopter change in spend rate. Paired, one sample.
    pub fn from_adoption(report: &AdoptionReport) -> Self {
        let delta = report.summary.spend_rate_delta.as_ref();
        Self {
            source: LiftSource::Adoption,
            monthly_spend_lift: delta.map_or(0.0, |s| s.mean),
            standard_error: delta.map_or(0.0, MetricSample::standard_error),
            samples: vec![sample_size("adopters.spend_rate_delta", delta)],
            treatment_monthly_orders: report.summary.avg_after_frequency.unwrap_or(0.0),
        }
    }

    /// First sample below `minimum`, as the error the calculator returns.
    pub fn check_sample_sizes(&self, minimum: usize) -> AnalyticsResult<()> {
        match self.samples.iter().find(|s| s.size < minimum) {
            Some(s) => Err(AnalyticsError::InsufficientData {
                metric:  s.metric.clone(),
                size:    s.size,
                minimum,
            }),
            None => Ok(()),
        }
    }
}

// ── Projection models ──────────────────────────────────────────────

/// Maps a target adoption rate to the rate the programme is expected to
/// reach. Implementations must be non-decreasing on [0, 1].
pub trait ProjectionModel {
    fn name(&self) -> &'static str;
    fn effective_rate(&self, target_rate: f64) -> f64;
}

/// The target is reached as stated.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearProjection;

impl ProjectionModel for LinearProjection {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn effective_rate(&self, target_rate: f64) -> f64 {
        target_rate
    }
}

/// Logistic S-curve that flattens at `saturation_point`, never above
/// the target itself.
#[derive(Debug, Clone, Copy)]
pub struct SaturatingProjection {
    pub saturation_point: f64,
    pub adoption_speed:   f64,
}

impl Default for SaturatingProjection {
    fn default() -> Self {
        Self {
            saturation_point: 0.45,
            adoption_speed:   0.8,
        }
    }
}

impl ProjectionModel for SaturatingProjection {
    fn name(&self) -> &'static str {
        "saturating"
    }

    fn effective_rate(&self, target_rate: f64) -> f64 {
        let x = target_rate * 10.0 - 5.0;
        let adoption = self.saturation_point / (1.0 + (-self.adoption_speed * x).exp());
        adoption.min(target_rate)
    }
}

impl ProjectionConfig {
    pub fn build(&self) -> Box<dyn ProjectionModel> {
        match *self {
            ProjectionConfig::Linear => Box::new(LinearProjection),
            ProjectionConfig::Saturating { saturation_point, adoption_speed } => {
                Box::new(SaturatingProjection { saturation_point, adoption_speed })
            }
        }
    }
}

// ── Projection ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiProjection {
    pub projection_model:            String,
    pub lift_source:                 LiftSource,
    pub target_adoption_rate:        f64,
    pub effective_adoption_rate:     f64,

    // Users
    pub eligible_customers:          f64,
    pub current_users:               f64,
    pub target_users:                f64,
    /// Negative when the target is below the current rate.
    pub incremental_users:           f64,

    // Revenue
    pub monthly_spend_lift:          f64,
    pub incrementality:              f64,
    pub incremental_spend_per_user:  f64,
    /// Incremental monthly revenue.
    pub point_estimate:              f64,
    pub confidence_interval:         ConfidenceInterval,

    // Cost
    pub redemptions_per_user:        f64,
    pub volume_discount:             f64,
    pub monthly_cost:                f64,
    pub total_monthly_cost:          f64,

    // Outcome
    pub net_monthly_impact:          f64,
    pub annual_impact:               f64,
    /// Percent. None unless the monthly cost is positive.
    pub roi_percentage:              Option<f64>,
    /// None unless the net monthly impact is positive.
    pub payback_months:              Option<f64>,
    pub ltv_increase:                f64,
    /// Percent.
    pub risk_score:                  f64,
    pub risk_adjusted_annual_impact: f64,
}

/// Result of the ROI stage as carried in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoiOutcome {
    Projected(RoiProjection),
    InsufficientData {
        metric:  String,
        size:    usize,
        minimum: usize,
    },
}

pub struct RoiCalculator {
    config: RoiConfig,
    model:  Box<dyn ProjectionModel>,
}

impl RoiCalculator {
    /// Projection model taken from `config.projection`.
    pub fn new(config: RoiConfig) -> Self {
        let model = config.projection.build();
        Self { config, model }
    }

    pub fn with_model(config: RoiConfig, model: Box<dyn ProjectionModel>) -> Self {
        Self { config, model }
    }

    pub fn config(&self) -> &RoiConfig {
        &self.config
    }

    /// Lift estimate from whichever report `lift_source` selects.
    pub fn select_estimate(&self, cohorts: &CohortReport, adoption: &AdoptionReport) -> LiftEstimate {
        match self.config.lift_source {
            LiftSource::Cohort   => LiftEstimate::from_cohorts(cohorts),
            LiftSource::Adoption => LiftEstimate::from_adoption(adoption),
        }
    }

    pub fn incrementality(effective_rate: f64) -> f64 {
        (BASE_INCREMENTALITY - CANNIBALISATION_PER_RATE * effective_rate).max(MIN_INCREMENTALITY)
    }

    pub fn volume_discount(effective_rate: f64) -> f64 {
        1.0 - VOLUME_DISCOUNT_PER_RATE * effective_rate.min(MAX_VOLUME_DISCOUNT_RATE)
    }

    /// Combined execution and market risk, as a fraction.
    pub fn risk_factor(&self, effective_rate: f64) -> f64 {
        let execution = (effective_rate * EXECUTION_RISK_PER_RATE).min(MAX_EXECUTION_RISK);
        let market = self.config.market_risk;
        execution + market - execution * market
    }

    /// Adoption reached in rollout month `month` (0-based) on the way to
    /// `effective_rate`.
    pub fn rollout_rate(month: u32, effective_rate: f64) -> f64 {
        let rate = effective_rate / (1.0 + (-ROLLOUT_SPEED * (month as f64 - ROLLOUT_MIDPOINT)).exp());
        rate.min(effective_rate)
    }

    pub fn project(&self, estimate: &LiftEstimate, scenario: ScenarioInput) -> AnalyticsResult<RoiProjection> {
        estimate.check_sample_sizes(self.config.min_sample_size)?;

        let cfg = &self.config;
        let effective = self.model.effective_rate(scenario.target_adoption_rate);

        let eligible_customers = cfg.total_monthly_customers * cfg.eligible_share;
        let current_users = eligible_customers * cfg.baseline_adoption_rate;
        let target_users = eligible_customers * effective;
        let incremental_users = target_users - current_users;

        let incrementality = Self::incrementality(effective);
        let lift = estimate.monthly_spend_lift;
        let incremental_spend_per_user = lift * incrementality;
        let point_estimate = incremental_users * incremental_spend_per_user;

        let z = stats::z_score(cfg.confidence_level);
        let a = incremental_users * incrementality * (lift - z * estimate.standard_error);
        let b = incremental_users * incrementality * (lift + z * estimate.standard_error);
        let confidence_interval = ConfidenceInterval {
            level: cfg.confidence_level,
            lower: a.min(b),
            upper: a.max(b),
        };

        let redemptions_per_user = estimate.treatment_monthly_orders;
        let volume_discount = Self::volume_discount(effective);
        let cost_per_user = cfg.discount_per_redemption * redemptions_per_user * volume_discount;
        let monthly_cost = incremental_users * cost_per_user;
        let total_monthly_cost = target_users * cost_per_user;
        let net_monthly_impact = point_estimate - monthly_cost;

        let annual_impact: f64 = (0..ROLLOUT_MONTHS)
            .map(|month| {
                let users = eligible_customers * Self::rollout_rate(month, effective);
                users * (incremental_spend_per_user - cost_per_user)
            })
            .sum();

        let risk = self.risk_factor(effective);

        let projection = RoiProjection {
            projection_model: self.model.name().to_string(),
            lift_source: estimate.source,
            target_adoption_rate: scenario.target_adoption_rate,
            effective_adoption_rate: effective,
            eligible_customers,
            current_users,
            target_users,
            incremental_users,
            monthly_spend_lift: lift,
            incrementality,
            incremental_spend_per_user,
            point_estimate,
            confidence_interval,
            redemptions_per_user,
            volume_discount,
            monthly_cost,
            total_monthly_cost,
            net_monthly_impact,
            annual_impact,
            roi_percentage: (monthly_cost > 0.0).then(|| annual_impact / (monthly_cost * 12.0) * 100.0),
            payback_months: (net_monthly_impact > 0.0).then(|| monthly_cost / net_monthly_impact),
            ltv_increase: incremental_spend_per_user * cfg.avg_lifetime_months,
            risk_score: risk * 100.0,
            risk_adjusted_annual_impact: annual_impact * (1.0 - risk),
        };

        log::info!(
            "roi: target {:.0}% -> effective {:.1}% ({}), incremental revenue {:.2}/month",
            scenario.target_adoption_rate * 100.0,
            effective * 100.0,
            projection.projection_model,
            projection.point_estimate
        );
        Ok(projection)
    }

    /// `project`, with InsufficientData folded into the outcome instead of
    /// failing the run.
    pub fn outcome(&self, estimate: &LiftEstimate, scenario: ScenarioInput) -> AnalyticsResult<RoiOutcome> {
        match self.project(estimate, scenario) {
            Ok(projection) => Ok(RoiOutcome::Projected(projection)),
            Err(AnalyticsError::InsufficientData { metric, size, minimum }) => {
                log::warn!("roi: insufficient data for '{metric}': {size} < {minimum}, projection skipped");
                Ok(RoiOutcome::InsufficientData { metric, size, minimum })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_curve_is_capped_and_non_decreasing() {
        let model = SaturatingProjection::default();
        let mut previous = 0.0;
        for step in 0..=100 {
            let target = step as f64 / 100.0;
            let effective = model.effective_rate(target);
            assert!(effective <= target + 1e-12);
            assert!(effective >= previous - 1e-12, "dropped at {target}");
            previous = effective;
        }
        assert!(model.effective_rate(1.0) <= 0.45);
    }

    #[test]
    fn incrementality_has_a_floor() {
        assert!((RoiCalculator::incrementality(0.0) - 0.75).abs() < 1e-12);
        assert!((RoiCalculator::incrementality(0.5) - 0.60).abs() < 1e-12);
        assert!(RoiCalculator::incrementality(1.0) >= MIN_INCREMENTALITY);
    }

    #[test]
    fn scenario_rejects_out_of_range_rates() {
        assert!(ScenarioInput::new(0.4).is_ok());
        assert!(matches!(ScenarioInput::new(1.2), Err(AnalyticsError::InvalidScenario(_))));
        assert!(matches!(ScenarioInput::new(f64::NAN), Err(AnalyticsError::InvalidScenario(_))));
    }
}
