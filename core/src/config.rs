use crate::types::YearMonth;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── Loader ─────────────────────────────────────────────────────────

/// What the loader does with a row holding an unconvertible value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    /// Return the first ParseError and stop.
    #[default]
    Abort,
    /// Drop the row, log a warning and record a RowSkipped event.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub parse_policy: ParsePolicy,
    /// Keep only rows whose `bill-flag` is `gross` when the column exists.
    pub gross_only: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            parse_policy: ParsePolicy::Abort,
            gross_only: true,
        }
    }
}

// ── Segmentation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentationThresholds {
    /// Lifetime spend at or above which a customer is High-Value.
    pub high_value_spend_threshold: Decimal,
    /// Order count at or above which a customer is Frequent.
    pub high_frequency_count_threshold: u32,
    /// Order count at or below which a customer is At-Risk.
    pub at_risk_max_orders: u32,
}

impl Default for SegmentationThresholds {
    fn default() -> Self {
        Self {
            high_value_spend_threshold: Decimal::new(3000, 0),
            high_frequency_count_threshold: 6,
            at_risk_max_orders: 1,
        }
    }
}

// ── Cohorts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    pub retention_horizons_days: Vec<u32>,
    pub ltv_horizon_days: u32,
    pub order_progression_depth: u32,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            retention_horizons_days: vec![7, 30],
            ltv_horizon_days: 90,
            order_progression_depth: 5,
        }
    }
}

// ── Adoption ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdoptionConfig {
    pub retention_window_days: u32,
    pub retention_curve_days: Vec<u32>,
}

impl Default for AdoptionConfig {
    fn default() -> Self {
        Self {
            retention_window_days: 30,
            retention_curve_days: vec![7, 14, 30, 60, 90],
        }
    }
}

// ── Monthly ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonthlyConfig {
    /// First month counted in the redemption rate. None counts every month.
    pub redemption_start_month: Option<YearMonth>,
}

// ── ROI ────────────────────────────────────────────────────────────

/// Which analysis feeds the spend lift into the ROI projection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiftSource {
    #[default]
    Cohort,
    Adoption,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionConfig {
    Linear,
    Saturating { saturation_point: f64, adoption_speed: f64 },
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self::Saturating {
            saturation_point: 0.45,
            adoption_speed: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub min_sample_size: usize,
    pub confidence_level: f64,
    /// Scenario input used by the pipeline run.
    pub target_adoption_rate: f64,
    pub baseline_adoption_rate: f64,
    pub total_monthly_customers: f64,
    pub eligible_share: f64,
    pub discount_per_redemption: f64,
    pub avg_lifetime_months: f64,
    pub market_risk: f64,
    pub lift_source: LiftSource,
    pub projection: ProjectionConfig,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 30,
            confidence_level: 0.95,
            target_adoption_rate: 0.40,
            baseline_adoption_rate: 0.21,
            total_monthly_customers: 20_000.0,
            eligible_share: 0.80,
            discount_per_redemption: 30.0,
            avg_lifetime_months: 4.8,
            market_risk: 0.10,
            lift_source: LiftSource::Cohort,
            projection: ProjectionConfig::default(),
        }
    }
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub loader: LoaderConfig,
    pub segmentation: SegmentationThresholds,
    pub cohort: CohortConfig,
    pub adoption: AdoptionConfig,
    pub monthly: MonthlyConfig,
    pub roi: RoiConfig,
}

impl AnalysisConfig {
    /// Load from a JSON file. Missing sections and fields keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no analysis stage can work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cohort.retention_horizons_days.iter().any(|&h| h == 0) {
            anyhow::bail!("cohort.retention_horizons_days must all be > 0");
        }
        if self.cohort.order_progression_depth == 0 {
            anyhow::bail!("cohort.order_progression_depth must be > 0");
        }
        if self.roi.min_sample_size < 2 {
            anyhow::bail!("roi.min_sample_size must be at least 2");
        }
        if !(0.0..=1.0).contains(&self.roi.baseline_adoption_rate) {
            anyhow::bail!("roi.baseline_adoption_rate must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.roi.eligible_share) {
            anyhow::bail!("roi.eligible_share must lie in [0, 1]");
        }
        if ![0.90, 0.95, 0.99].contains(&self.roi.confidence_level) {
            anyhow::bail!("roi.confidence_level must be one of 0.90, 0.95, 0.99");
        }
        Ok(())
    }
}
