//! Unified error handling for HTTP.
//!
//! Every failure leaves the service as one of six client-visible classes
//! (validation, unauthenticated, forbidden, not found, conflict, unexpected)
//! and is rendered as the `{status, message}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{AccessError, DomainError, LifecycleError};
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    // Resource errors
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    // Rate limiting
    #[error("{0}")]
    TooManyRequests(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "cache")]
    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error envelope for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

/// Internal detail of a 5xx response, carried as a response extension.
///
/// It never reaches the body unless a development-only layer puts it there.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl AppError {
    /// Get error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "cache")]
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Envelope status: `fail` for client errors, `error` otherwise
    pub fn envelope_status(&self) -> &'static str {
        if self.status().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }

    /// Internal detail hidden from clients, if any
    pub fn detail(&self) -> Option<String> {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(e) => Some(format!("{:?}", e)),
            #[cfg(feature = "cache")]
            AppError::Cache(e) => Some(format!("{:?}", e)),
            AppError::Internal(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "cache")]
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                "A cache error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Client errors carry their own message
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.detail();
        let body = ErrorResponse {
            status: self.envelope_status(),
            message: self.user_message(),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::NotFound(msg) => AppError::NotFound(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            DomainError::Forbidden(msg) => AppError::Forbidden(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        AppError::from(DomainError::from(err))
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        AppError::from(DomainError::from(err))
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(message.into()))
    }
}

/// Convenience constructors
impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_lifecycle_errors_are_conflicts() {
        let err = AppError::from(LifecycleError::AlreadyDeleted("Place"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.user_message(), "Place already deleted");
    }

    #[test]
    fn test_access_errors_keep_their_class() {
        let err = AppError::from(AccessError::Unauthenticated);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let err = AppError::from(AccessError::Forbidden("nope".to_string()));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "nope");
    }

    #[tokio::test]
    async fn test_client_error_envelope() {
        let response = AppError::not_found("Place not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ErrorDetail>().is_none());

        let json = body_json(response).await;
        assert_eq!(json["status"], "fail");
        assert_eq!(json["message"], "Place not found");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = AppError::internal("connection reset by peer").into_response();
        let detail = response.extensions().get::<ErrorDetail>().cloned();
        assert_eq!(detail.map(|d| d.0), Some("connection reset by peer".to_string()));

        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "An internal error occurred");
    }

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_not_found("User not found").unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "User not found"));
    }
}
