//! Error types for the sales dashboard

use thiserror::Error;

/// Failures that can occur before a dataset is loaded.
///
/// Once a [`Dataset`](crate::loader::Dataset) exists, nothing in the engine
/// returns this type: aggregation, trends and insights resolve every edge case
/// to a numeric default.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported data format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
