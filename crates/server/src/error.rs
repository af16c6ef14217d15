//! Unified error handling for the API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ReconcileError;
use crate::stripe::StripeError;

/// Application-level error type for API handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing, blank, or malformed.
    #[error("{0}")]
    Validation(String),

    /// Stripe API operation failed.
    #[error("Stripe error: {0}")]
    Remote(#[from] StripeError),

    /// Coach store operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The account has not finished onboarding.
    #[error("Account onboarding not complete")]
    OnboardingIncomplete,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ReconcileError> for AppError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Remote(e) => Self::Remote(e),
            ReconcileError::Storage(e) => Self::Storage(e),
            ReconcileError::OnboardingIncomplete => Self::OnboardingIncomplete,
            ReconcileError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl AppError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidSignature | Self::OnboardingIncomplete => {
                StatusCode::BAD_REQUEST
            }
            Self::Remote(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Remote(_) | Self::Storage(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Stripe messages are passed through; storage and internal details are not
        let message = match &self {
            Self::Storage(_) => "Storage unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        let body = ErrorBody {
            success: false,
            message,
        };

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Validation("Email is required".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidSignature.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::OnboardingIncomplete.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Storage(RepositoryError::Conflict("acct_1".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_remote_message_is_passed_through() {
        let err = AppError::Remote(StripeError::Api {
            status: 400,
            code: Some("email_invalid".to_string()),
            message: "Invalid email address".to_string(),
        });

        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Stripe error: Invalid email address");
    }

    #[tokio::test]
    async fn test_storage_details_are_hidden() {
        let err = AppError::Storage(RepositoryError::DataCorruption(
            "invalid email in database".to_string(),
        ));

        let (_, body) = body_json(err).await;

        assert_eq!(body["message"], "Storage unavailable");
    }

    #[tokio::test]
    async fn test_validation_message() {
        let (status, body) = body_json(AppError::Validation("Email is required".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is required");
    }

    #[test]
    fn test_reconcile_error_conversion() {
        let err: AppError = ReconcileError::OnboardingIncomplete.into();
        assert!(matches!(err, AppError::OnboardingIncomplete));
    }
}
