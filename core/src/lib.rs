//! ZenoCoin loyalty analytics: a batch pipeline from raw transaction
//! rows to cohort, adoption and ROI metrics.

pub mod adoption_analyzer;
pub mod cohort_analyzer;
pub mod config;
pub mod customer_aggregator;
pub mod data_loader;
pub mod error;
pub mod event;
pub mod monthly_analyzer;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod roi_calculator;
pub mod segmentation_engine;
pub mod stats;
pub mod synthetic;
pub mod transaction;
pub mod types;

pub use config::AnalysisConfig;
pub use error::{AnalyticsError, AnalyticsResult};
pub use pipeline::AnalysisPipeline;
pub use report::AnalysisReport;
pub use transaction::Transaction;
