//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that classifies every failure into the
//! checkout taxonomy before responding, captures server-side errors to
//! Sentry, and never leaks internals to the client. All route handlers
//! return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::gateway::ChargeError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or missing required fields. Recoverable, surfaced inline.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No authenticated session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Acting identity does not own the resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced resource absent. Non-fatal to the session.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing gateway keys or similar. Fatal for payment, logged server-side;
    /// the shopper sees a generic message.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The gateway reported a merchant-facing decline reason.
    #[error("Payment declined: {0}")]
    PaymentDeclined(String),

    /// The gateway answered with a non-success status and no decline reason.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// No response from the gateway or backend. Retryable by the shopper,
    /// never retried automatically.
    #[error("Network error: {0}")]
    Network(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChargeError> for AppError {
    fn from(err: ChargeError) -> Self {
        match err {
            ChargeError::Declined { message } => Self::PaymentDeclined(message),
            ChargeError::Gateway { status, message } => {
                Self::Gateway(format!("gateway returned {status}: {message}"))
            }
            ChargeError::Network(message) => Self::Network(message),
            ChargeError::InvalidResponse(message) => {
                Self::Gateway(format!("unparseable gateway response: {message}"))
            }
        }
    }
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) | Self::Configuration(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) | Self::PaymentDeclined(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Gateway(_) | Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Database(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_)
            | Self::Session(_)
            | Self::Internal(_)
            | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Configuration(_) => {
                "Payment is temporarily unavailable, please try again later".to_string()
            }
            Self::Gateway(_) => "Payment could not be completed, please try again".to_string(),
            Self::Network(_) => {
                "Could not reach the payment provider, please try again".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("address 123".to_string());
        assert_eq!(err.to_string(), "Not found: address 123");

        let err = AppError::PaymentDeclined("insufficient funds".to_string());
        assert_eq!(err.to_string(), "Payment declined: insufficient funds");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("no session".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("not yours".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::NotFound("gone".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::PaymentDeclined("declined".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Network("timed out".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Configuration("no keys".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_declined_charge_maps_to_payment_declined() {
        let err: AppError = ChargeError::Declined {
            message: "card_declined".to_string(),
        }
        .into();
        assert!(matches!(err, AppError::PaymentDeclined(_)));
    }

    #[test]
    fn test_configuration_error_hides_details() {
        let response = AppError::Configuration("CULQI_SECRET_KEY missing".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The env var name must never reach the client; the body is generic.
    }
}
