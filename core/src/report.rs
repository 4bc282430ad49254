//! Report serialization: one complete analysis run to/from JSON.
//!
//! A report carries every stage's output plus the event log, so a
//! reader can tell which rows and samples the metrics rest on.

use crate::{
    adoption_analyzer::AdoptionReport,
    cohort_analyzer::CohortReport,
    error::AnalyticsResult,
    event::AnalysisEvent,
    monthly_analyzer::MonthlyReport,
    roi_calculator::RoiOutcome,
    segmentation_engine::SegmentationReport,
    types::RunId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows_read:          usize,
    pub rows_filtered:      usize,
    pub rows_skipped:       usize,
    pub transaction_count:  usize,
    pub customer_count:     usize,
    pub zc_user_count:      usize,
    pub earliest_bill_date: Option<NaiveDate>,
    /// Latest bill date: the end of every observation window.
    pub as_of:              Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id:       RunId,
    pub dataset:      DatasetSummary,
    pub segmentation: SegmentationReport,
    pub cohorts:      CohortReport,
    pub adoption:     AdoptionReport,
    pub monthly:      MonthlyReport,
    pub roi:          RoiOutcome,
    pub events:       Vec<AnalysisEvent>,
}

impl AnalysisReport {
    pub fn to_json(&self) -> AnalyticsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> AnalyticsResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> AnalyticsResult<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Events of one type, in the order they were recorded.
    pub fn events_of_type<'a>(&'a self, event_type: &'a str) -> impl Iterator<Item = &'a AnalysisEvent> + 'a {
        self.events.iter().filter(move |e| e.event_type() == event_type)
    }
}
