//! The run event log.
//!
//! RULE: nothing is dropped, filtered or degraded silently.
//! Every such decision taken by a stage is recorded here and ends up
//! in the AnalysisReport next to the metrics it affected.

use serde::{Deserialize, Serialize};

/// Every event recorded during an analysis run.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    // ── Loader events ──────────────────────────────
    RowSkipped {
        row:    usize,
        field:  String,
        value:  String,
    },
    RowsFiltered {
        reason: String,
        count:  usize,
    },

    // ── Stage events ───────────────────────────────
    StageCompleted {
        stage:   String,
        records: usize,
    },
    InsufficientData {
        stage:   String,
        metric:  String,
        size:    usize,
        minimum: usize,
    },
}

impl AnalysisEvent {
    /// Stable short name, used in log lines and summaries.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RowSkipped { .. }       => "row_skipped",
            Self::RowsFiltered { .. }     => "rows_filtered",
            Self::StageCompleted { .. }   => "stage_completed",
            Self::InsufficientData { .. } => "insufficient_data",
        }
    }
}
