//! HTTP Error Responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use assistant_core::AssistantError;
use checkout_currency::CurrencyError;
use checkout_payments::PaymentError;

/// Errors returned by route handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid input → 400 `{error}`
    #[error("{0}")]
    BadRequest(String),

    /// Nothing stored under the requested key → 404 `{error}`
    #[error("{0}")]
    NotFound(String),

    /// Upstream call failed → 500 `{error, message, details}`
    #[error("{error}: {message}")]
    Upstream {
        error: String,
        message: String,
        details: Option<String>,
    },

    /// Feature not configured on this deployment → 503 `{error}`
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Debug, Serialize)]
struct UpstreamErrorBody<'a> {
    error: &'a str,
    message: &'a str,
    details: Option<&'a str>,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Map a payment failure raised while doing `context`
    pub fn payment(context: &str, err: &PaymentError) -> Self {
        match err {
            e if e.is_client_error() => Self::BadRequest(e.user_message().into()),
            PaymentError::Config(_) => Self::Unavailable("Payments are not configured.".into()),
            e => {
                tracing::error!(error = %e, "{context}");
                Self::Upstream {
                    error: context.into(),
                    message: e.user_message().into(),
                    details: Some(e.to_string()),
                }
            }
        }
    }

    /// Map an assistant failure; upstream detail never reaches the client
    pub fn assistant(err: &AssistantError) -> Self {
        if err.is_client_error() {
            return Self::BadRequest(err.user_message());
        }
        tracing::error!(error = %err, "Assistant request failed");
        let message = err.user_message();
        Self::Upstream {
            error: message.clone(),
            message,
            details: None,
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<CurrencyError> for ApiError {
    fn from(err: CurrencyError) -> Self {
        match err {
            CurrencyError::UnsupportedCurrency(_) => Self::bad_request("Invalid currency."),
            CurrencyError::InvalidAmount(_) => Self::bad_request("Invalid amount."),
            e => Self::Upstream {
                error: "Currency conversion failed".into(),
                message: e.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::BadRequest(error) | Self::NotFound(error) | Self::Unavailable(error) => {
                (status, Json(ErrorBody { error })).into_response()
            }
            Self::Upstream {
                error,
                message,
                details,
            } => (
                status,
                Json(UpstreamErrorBody {
                    error,
                    message,
                    details: details.as_deref(),
                }),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_client_errors_are_bad_requests() {
        let err = ApiError::payment("Checkout failed", &PaymentError::UnknownPlan("weekly".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid plan type.");
    }

    #[test]
    fn test_payment_upstream_error_carries_details() {
        let err = ApiError::payment(
            "Error creating checkout session",
            &PaymentError::Stripe("No such price".into()),
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        match err {
            ApiError::Upstream { error, details, .. } => {
                assert_eq!(error, "Error creating checkout session");
                assert!(details.unwrap().contains("No such price"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_stripe_config_is_unavailable() {
        let err = ApiError::payment("x", &PaymentError::Config("STRIPE_SECRET_KEY not set".into()));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_assistant_errors_are_masked() {
        let err = ApiError::assistant(&AssistantError::RateLimited("429 quota".into()));
        let ApiError::Upstream { error, message, details } = err else {
            panic!("expected upstream error");
        };
        assert!(!error.contains("429"));
        assert!(!message.contains("429"));
        assert!(details.is_none());
    }
}
