use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading, aggregating, unifying or merging KPI data.
#[derive(Error, Debug)]
pub enum KpiError {
    /// File system error, with the offending path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// No aggregation policy is known for this metric type
    #[error("Unsupported aggregation on {metric_name}")]
    UnsupportedMetric { metric_name: String },

    /// The payload holds no usable data
    #[error("Empty payload: {context}")]
    EmptyPayload { context: String },

    /// Wrong-shaped or undecodable payload
    #[error("Invalid data format: {message} in {context}")]
    InvalidDataFormat { message: String, context: String },

    #[error("Duplicate KPI index {index} in {context}")]
    DuplicateIndex { index: u32, context: String },

    /// A grouping needs a label column the catalog does not have
    #[error("No label can be aggregated: missing {label} in {metric_name}")]
    MissingLabel { label: String, metric_name: String },

    #[error("Invalid column name: {0}")]
    InvalidColumnName(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl KpiError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        KpiError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_data_format(message: &str, context: &str) -> Self {
        KpiError::InvalidDataFormat {
            message: message.to_string(),
            context: context.to_string(),
        }
    }

    pub fn empty_payload(context: impl Into<String>) -> Self {
        KpiError::EmptyPayload {
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KpiError>;
