use zc_analytics_core::{
    cohort_analyzer::analyze_cohorts,
    config::{CohortConfig, LiftSource, ProjectionConfig, RoiConfig},
    customer_aggregator::aggregate,
    roi_calculator::{
        LiftEstimate, LinearProjection, ProjectionModel, RoiCalculator, RoiOutcome, SampleSize,
        SaturatingProjection, ScenarioInput,
    },
    synthetic::{generate, SyntheticConfig},
    AnalyticsError,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn estimate(lift: f64, standard_error: f64, size: usize) -> LiftEstimate {
    LiftEstimate {
        source: LiftSource::Cohort,
        monthly_spend_lift: lift,
        standard_error,
        samples: vec![
            SampleSize { metric: "zc_acquired.monthly_spend".into(), size },
            SampleSize { metric: "non_zc_acquired.monthly_spend".into(), size },
        ],
        treatment_monthly_orders: 2.0,
    }
}

fn targets() -> impl Iterator<Item = ScenarioInput> {
    (0..=20).map(|i| ScenarioInput::new(i as f64 / 20.0).unwrap())
}

fn calculators() -> Vec<RoiCalculator> {
    vec![
        RoiCalculator::with_model(RoiConfig::default(), Box::new(LinearProjection)),
        RoiCalculator::with_model(RoiConfig::default(), Box::new(SaturatingProjection::default())),
    ]
}

/// Never reaches more than half the target.
struct HalfProjection;

impl ProjectionModel for HalfProjection {
    fn name(&self) -> &'static str {
        "half"
    }

    fn effective_rate(&self, target_rate: f64) -> f64 {
        target_rate / 2.0
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A positive lift never projects less revenue for a higher target.
#[test]
fn point_estimate_rises_with_target_for_positive_lift() {
    for calc in calculators() {
        let est = estimate(464.0, 20.0, 100);
        let mut previous = f64::NEG_INFINITY;
        for scenario in targets() {
            let p = calc.project(&est, scenario).unwrap();
            assert!(
                p.point_estimate >= previous - 1e-9,
                "{}: estimate fell at target {}",
                p.projection_model,
                scenario.target_adoption_rate
            );
            previous = p.point_estimate;
        }
    }
}

/// A negative lift never projects more revenue for a higher target.
#[test]
fn point_estimate_falls_with_target_for_negative_lift() {
    for calc in calculators() {
        let est = estimate(-120.0, 15.0, 100);
        let mut previous = f64::INFINITY;
        for scenario in targets() {
            let p = calc.project(&est, scenario).unwrap();
            assert!(p.point_estimate <= previous + 1e-9);
            previous = p.point_estimate;
        }
    }
}

/// A sample below the minimum refuses the projection and names the metric.
#[test]
fn small_samples_are_insufficient() {
    let calc = RoiCalculator::new(RoiConfig::default());
    let result = calc.project(&estimate(100.0, 5.0, 29), ScenarioInput::new(0.4).unwrap());
    match result {
        Err(AnalyticsError::InsufficientData { metric, size, minimum }) => {
            assert_eq!(metric, "zc_acquired.monthly_spend");
            assert_eq!(size, 29);
            assert_eq!(minimum, 30);
        }
        other => panic!("expected InsufficientData, got {other:?}"),
    }

    let outcome = calc.outcome(&estimate(100.0, 5.0, 29), ScenarioInput::new(0.4).unwrap()).unwrap();
    assert!(matches!(outcome, RoiOutcome::InsufficientData { size: 29, .. }));
}

/// A tiny cohort dataset fails the minimum through the real lift estimate.
#[test]
fn cohort_estimate_carries_real_sample_sizes() {
    let txns = generate(&SyntheticConfig::with_customers(20), 1);
    let cohorts = analyze_cohorts(&aggregate(&txns), &txns, &CohortConfig::default());
    let est = LiftEstimate::from_cohorts(&cohorts);
    let sizes: usize = est.samples.iter().map(|s| s.size).sum();
    assert_eq!(sizes, 20);
    assert!(est.check_sample_sizes(30).is_err());
}

/// The interval is centred on the point estimate and widens with the error.
#[test]
fn confidence_interval_comes_from_standard_error() {
    let calc = RoiCalculator::with_model(RoiConfig::default(), Box::new(LinearProjection));
    let scenario = ScenarioInput::new(0.4).unwrap();

    let narrow = calc.project(&estimate(300.0, 10.0, 200), scenario).unwrap();
    let wide = calc.project(&estimate(300.0, 40.0, 200), scenario).unwrap();

    for p in [&narrow, &wide] {
        let ci = p.confidence_interval;
        assert!(ci.lower <= p.point_estimate && p.point_estimate <= ci.upper);
        let centre = (ci.lower + ci.upper) / 2.0;
        assert!((centre - p.point_estimate).abs() < 1e-6);
    }
    let width = |p: &zc_analytics_core::roi_calculator::RoiProjection| {
        p.confidence_interval.upper - p.confidence_interval.lower
    };
    assert!(width(&wide) > width(&narrow));

    // 0.95 -> z = 1.96
    let expected = 2.0 * 1.96 * 10.0 * narrow.incremental_users * narrow.incrementality;
    assert!((width(&narrow) - expected).abs() < 1e-6);
}

/// Hand-checked figures for a linear projection at a 40 % target.
#[test]
fn linear_projection_figures() {
    let calc = RoiCalculator::with_model(RoiConfig::default(), Box::new(LinearProjection));
    let p = calc.project(&estimate(464.0, 0.0, 100), ScenarioInput::new(0.4).unwrap()).unwrap();

    assert_eq!(p.eligible_customers, 16_000.0);
    assert!((p.current_users - 3_360.0).abs() < 1e-9);
    assert!((p.target_users - 6_400.0).abs() < 1e-9);
    assert!((p.incremental_users - 3_040.0).abs() < 1e-9);
    assert!((p.incrementality - 0.63).abs() < 1e-12);
    assert!((p.point_estimate - 3_040.0 * 464.0 * 0.63).abs() < 1e-6);
    assert!((p.volume_discount - 0.96).abs() < 1e-12);
    assert!((p.monthly_cost - 3_040.0 * 30.0 * 2.0 * 0.96).abs() < 1e-6);
    assert!((p.ltv_increase - 464.0 * 0.63 * 4.8).abs() < 1e-9);
    // execution 0.2, market 0.1 -> 0.28
    assert!((p.risk_score - 28.0).abs() < 1e-9);
}

/// A target below the baseline shrinks the user base and the revenue.
#[test]
fn target_below_baseline_goes_negative() {
    let calc = RoiCalculator::with_model(RoiConfig::default(), Box::new(LinearProjection));
    let p = calc.project(&estimate(464.0, 10.0, 100), ScenarioInput::new(0.1).unwrap()).unwrap();
    assert!(p.incremental_users < 0.0);
    assert!(p.point_estimate < 0.0);
    assert!(p.confidence_interval.lower <= p.confidence_interval.upper);
    assert_eq!(p.payback_months, None);
}

/// Any ProjectionModel can be plugged in; the configured one is the default.
#[test]
fn projection_model_is_pluggable() {
    let scenario = ScenarioInput::new(0.8).unwrap();
    let est = estimate(200.0, 5.0, 100);

    let half = RoiCalculator::with_model(RoiConfig::default(), Box::new(HalfProjection));
    let p = half.project(&est, scenario).unwrap();
    assert_eq!(p.projection_model, "half");
    assert!((p.effective_adoption_rate - 0.4).abs() < 1e-12);

    let config = RoiConfig { projection: ProjectionConfig::Linear, ..RoiConfig::default() };
    let linear = RoiCalculator::new(config).project(&est, scenario).unwrap();
    assert_eq!(linear.projection_model, "linear");
    assert!((linear.effective_adoption_rate - 0.8).abs() < 1e-12);

    let saturating = RoiCalculator::new(RoiConfig::default()).project(&est, scenario).unwrap();
    assert_eq!(saturating.projection_model, "saturating");
    assert!(saturating.effective_adoption_rate <= 0.45);
}
