//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Unknown plan key
    #[error("Invalid plan type: {0}")]
    UnknownPlan(String),

    /// Currency the provider cannot charge in
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Amount rejected before reaching the provider
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        Self::Stripe(err.to_string())
    }
}

impl PaymentError {
    /// Whether the caller sent bad input (as opposed to an upstream failure)
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPlan(_)
                | Self::UnsupportedCurrency(_)
                | Self::InvalidAmount(_)
                | Self::WebhookSignature(_)
                | Self::WebhookParse(_)
        )
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) => "Payment processing failed. Please try again.",
            Self::UnknownPlan(_) => "Invalid plan type.",
            Self::UnsupportedCurrency(_) => "Invalid currency.",
            Self::InvalidAmount(_) => "Invalid amount.",
            Self::WebhookSignature(_) | Self::WebhookParse(_) => "Webhook Error",
            Self::Config(_) => "Service configuration error.",
            Self::Storage(_) => "An error occurred processing your request.",
        }
    }
}
