use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Schema error: missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Parse error at row {row}, field '{field}': cannot convert '{value}'")]
    Parse {
        row:   usize,
        field: String,
        value: String,
    },

    #[error("Insufficient data for '{metric}': sample size {size} is below the minimum of {minimum}")]
    InsufficientData {
        metric:  String,
        size:    usize,
        minimum: usize,
    },

    #[error("Invalid scenario input: {0}")]
    InvalidScenario(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
