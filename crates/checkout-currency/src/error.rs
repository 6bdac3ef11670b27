//! Error Types for Currency Handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurrencyError>;

#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Rate unavailable for {0}")]
    RateUnavailable(String),

    #[error("Rate feed error: {0}")]
    Feed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
