//! The analysis pipeline: one batch pass over a loaded table.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Load          (data_loader, skipped when given a table)
//!   2. Aggregate     (customer_aggregator)
//!   3. Segment       (segmentation_engine)
//!   4. Cohort        (cohort_analyzer)
//!   5. Adoption      (adoption_analyzer)
//!   6. Monthly       (monthly_analyzer)
//!   7. Roi           (roi_calculator, fed by 4 or 5)
//!
//! RULES:
//!   - Stages read the transaction table by shared reference only.
//!   - Each stage returns a new owned value; none mutates another's output.
//!   - Every stage completion is recorded in the event log.
//!   - The config is validated before any stage runs, however it was built.

use crate::{
    adoption_analyzer::analyze_adoption,
    cohort_analyzer::analyze_cohorts,
    config::AnalysisConfig,
    customer_aggregator::aggregate,
    data_loader::{load_transactions, load_transactions_file, LoadedTable},
    error::AnalyticsResult,
    event::AnalysisEvent,
    monthly_analyzer::analyze_monthly,
    report::{AnalysisReport, DatasetSummary},
    roi_calculator::{RoiCalculator, RoiOutcome, ScenarioInput},
    segmentation_engine::segment_customers,
    transaction::{dataset_as_of, Transaction},
    types::RunId,
};
use std::io::Read;
use uuid::Uuid;

/// Stable stage identifiers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Aggregate,
    Segment,
    Cohort,
    Adoption,
    Monthly,
    Roi,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load      => "load",
            Self::Aggregate => "aggregate",
            Self::Segment   => "segment",
            Self::Cohort    => "cohort",
            Self::Adoption  => "adoption",
            Self::Monthly   => "monthly",
            Self::Roi       => "roi",
        }
    }
}

pub struct AnalysisPipeline {
    pub run_id: RunId,
    config:     AnalysisConfig,
}

impl AnalysisPipeline {
    /// A pipeline with a fresh v4 run id.
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_run_id(Uuid::new_v4().to_string(), config)
    }

    pub fn with_run_id(run_id: RunId, config: AnalysisConfig) -> Self {
        Self { run_id, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load a CSV source and run every stage.
    pub fn run_csv<R: Read>(&self, reader: R) -> AnalyticsResult<AnalysisReport> {
        let table = load_transactions(reader, &self.config.loader)?;
        self.run_table(&table)
    }

    pub fn run_file(&self, path: &str) -> AnalyticsResult<AnalysisReport> {
        let table = load_transactions_file(path, &self.config.loader)?;
        self.run_table(&table)
    }

    /// Run every stage over already-validated transactions.
    pub fn run(&self, transactions: &[Transaction]) -> AnalyticsResult<AnalysisReport> {
        let table = LoadedTable {
            transactions:  transactions.to_vec(),
            rows_read:     transactions.len(),
            rows_filtered: 0,
            rows_skipped:  0,
            events:        Vec::new(),
        };
        self.run_table(&table)
    }

    pub fn run_table(&self, table: &LoadedTable) -> AnalyticsResult<AnalysisReport> {
        let scenario = ScenarioInput::new(self.config.roi.target_adoption_rate)?;
        self.config.validate()?;
        let transactions = table.transactions.as_slice();

        let mut events = table.events.clone();
        completed(&mut events, Stage::Load, transactions.len());

        let profiles = aggregate(transactions);
        completed(&mut events, Stage::Aggregate, profiles.len());

        let segmentation = segment_customers(&profiles, &self.config.segmentation);
        completed(&mut events, Stage::Segment, segmentation.assignments.len());

        let cohorts = analyze_cohorts(&profiles, transactions, &self.config.cohort);
        completed(
            &mut events,
            Stage::Cohort,
            cohorts.zc_acquired.customer_count + cohorts.non_zc_acquired.customer_count,
        );

        let adoption = analyze_adoption(transactions, &self.config.adoption);
        completed(&mut events, Stage::Adoption, adoption.summary.adopter_count);

        let monthly = analyze_monthly(transactions, &self.config.monthly);
        completed(&mut events, Stage::Monthly, monthly.customer_months.len());

        let calculator = RoiCalculator::new(self.config.roi.clone());
        let estimate = calculator.select_estimate(&cohorts, &adoption);
        let roi = calculator.outcome(&estimate, scenario)?;
        match &roi {
            RoiOutcome::Projected(_) => completed(&mut events, Stage::Roi, 1),
            RoiOutcome::InsufficientData { metric, size, minimum } => {
                events.push(AnalysisEvent::InsufficientData {
                    stage:   Stage::Roi.name().to_string(),
                    metric:  metric.clone(),
                    size:    *size,
                    minimum: *minimum,
                });
            }
        }

        let dataset = DatasetSummary {
            rows_read:          table.rows_read,
            rows_filtered:      table.rows_filtered,
            rows_skipped:       table.rows_skipped,
            transaction_count:  transactions.len(),
            customer_count:     profiles.len(),
            zc_user_count:      profiles.iter().filter(|p| p.is_zc_user).count(),
            earliest_bill_date: transactions.iter().map(|t| t.bill_date).min(),
            as_of:              dataset_as_of(transactions),
        };

        log::info!(
            "run={} complete: {} transactions, {} customers, {} events",
            self.run_id,
            dataset.transaction_count,
            dataset.customer_count,
            events.len()
        );

        Ok(AnalysisReport {
            run_id: self.run_id.clone(),
            dataset,
            segmentation,
            cohorts,
            adoption,
            monthly,
            roi,
            events,
        })
    }
}

fn completed(events: &mut Vec<AnalysisEvent>, stage: Stage, records: usize) {
    log::debug!("stage {} completed ({records} records)", stage.name());
    events.push(AnalysisEvent::StageCompleted {
        stage: stage.name().to_string(),
        records,
    });
}
