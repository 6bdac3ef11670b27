//! Error Types

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Assistant error types
#[derive(Error, Debug)]
pub enum AssistantError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited by the provider
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Bad request input (e.g. empty message)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

const BUSY_MESSAGE: &str =
    "Our assistant is receiving a lot of questions right now. Please try again in a minute.";
const UNAVAILABLE_MESSAGE: &str =
    "Our assistant is temporarily unavailable. Please try again later or contact support.";
const GENERIC_MESSAGE: &str = "Our assistant couldn't answer that right now. Please try again.";

impl AssistantError {
    /// Whether the caller sent bad input
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    /// Branded, client-safe message. Upstream details such as quota errors
    /// (`429`) or key problems (`API key`) are masked.
    pub fn user_message(&self) -> String {
        if let Self::InvalidRequest(msg) = self {
            return msg.clone();
        }

        let detail = self.to_string();
        if matches!(self, Self::RateLimited(_)) || detail.contains("429") {
            BUSY_MESSAGE.into()
        } else if matches!(self, Self::Config(_)) || detail.contains("API key") {
            UNAVAILABLE_MESSAGE.into()
        } else if matches!(self, Self::ProviderUnavailable(_)) {
            UNAVAILABLE_MESSAGE.into()
        } else {
            GENERIC_MESSAGE.into()
        }
    }
}

impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
