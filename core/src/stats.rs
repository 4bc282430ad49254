//! Descriptive statistics over plain f64 samples.
//!
//! Every function returns None instead of NaN when the sample is too
//! small for the statistic to exist.

use serde::{Deserialize, Serialize};

/// Summary of one per-customer metric: enough to build a standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub n:       usize,
    pub mean:    f64,
    pub std_dev: f64,
}

impl MetricSample {
    /// None for an empty sample. A single value has a std dev of 0.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        Some(Self {
            n: values.len(),
            mean,
            std_dev: std_dev(values).unwrap_or(0.0),
        })
    }

    pub fn standard_error(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.std_dev / (self.n as f64).sqrt()
        }
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Linear-interpolated quantile, q in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Relative lift of treatment over control. None when control is zero.
pub fn relative_lift(treatment: f64, control: f64) -> Option<f64> {
    if control == 0.0 {
        None
    } else {
        Some((treatment - control) / control)
    }
}

/// Rate as a fraction of a denominator. None when nothing is eligible.
pub fn rate(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WelchTest {
    pub t_statistic:        f64,
    pub degrees_of_freedom: f64,
    /// |t| ≥ 1.96: the large-sample two-sided 5% cut-off.
    pub significant:        bool,
}

/// Welch's unequal-variance t-test. Needs two values on each side and
/// a non-zero pooled variance.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<WelchTest> {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (ma, mb) = (mean(a)?, mean(b)?);
    let (va, vb) = (std_dev(a)?.powi(2), std_dev(b)?.powi(2));
    let (sa, sb) = (va / na, vb / nb);
    let se = (sa + sb).sqrt();
    if se == 0.0 {
        return None;
    }
    let t = (ma - mb) / se;
    let df = (sa + sb).powi(2) / (sa.powi(2) / (na - 1.0) + sb.powi(2) / (nb - 1.0));
    Some(WelchTest {
        t_statistic: t,
        degrees_of_freedom: df,
        significant: t.abs() >= 1.96,
    })
}

/// Two-sided z critical value for the supported confidence levels.
pub fn z_score(confidence_level: f64) -> f64 {
    if confidence_level >= 0.99 {
        2.576
    } else if confidence_level >= 0.95 {
        1.960
    } else {
        1.645
    }
}
