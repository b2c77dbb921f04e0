// crates/hearth-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data quality error in {dataset}.{column}: {detail}")]
    DataQuality {
        dataset: String,
        column: String,
        detail: String,
    },

    #[error("warehouse unreachable: {0}")]
    Connectivity(#[source] sqlx::Error),

    #[error("destination constraint violated: {0}")]
    Integrity(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    /// Connectivity failures are the only retryable class; everything else
    /// indicates a data or configuration defect.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Connectivity(_))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
