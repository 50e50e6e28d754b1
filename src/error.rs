use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Survey {vintage} is missing required column '{column}'")]
    MissingColumn { vintage: u16, column: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<PolarsError> for EtlError {
    fn from(e: PolarsError) -> Self {
        EtlError::Polars(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
