//! Error Types for Data Access

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error("Series not found: {0}")]
    SeriesNotFound(String),

    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
