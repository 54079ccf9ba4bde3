//! # Error Handling
//!
//! This module provides unified error handling for the DevTrack API,
//! implementing a consistent problem+json response format with trace ID
//! propagation. Domain errors from the collector, synchronizer, and
//! summary services map onto distinct error codes so callers can tell
//! "nothing changed, safe to retry" from "external side effect occurred".

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::ai::GenerationError;
use crate::github::GitHubError;
use crate::models::summary::InvalidTimeframe;
use crate::summary::SummaryError;
use crate::sync::SyncError;
use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Suggested retry delay in seconds (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Extract current trace ID from the active trace context (falls back to
    /// a generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Internal Server Error")]
    InternalServerError,
}

impl ErrorType {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error
        .code()
        .is_some_and(|code| code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code.as_ref()))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            &error_type.to_string(),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

impl From<GitHubError> for ApiError {
    fn from(error: GitHubError) -> Self {
        match error {
            GitHubError::AuthenticationFailed(message) => {
                tracing::error!(%message, "GitHub authentication failure");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_AUTH_FAILED",
                    "GitHub rejected the configured token",
                )
            }
            GitHubError::RateLimited { retry_after } => {
                let mut api_error = Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "GitHub API rate limit exhausted",
                );
                if let Some(seconds) = retry_after {
                    api_error = api_error.with_retry_after(seconds);
                }
                api_error
            }
            other => {
                tracing::error!(error = %other, "GitHub provider error");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "PROVIDER_ERROR",
                    "GitHub API request failed",
                )
            }
        }
    }
}

impl From<GenerationError> for ApiError {
    fn from(error: GenerationError) -> Self {
        match error {
            GenerationError::AuthenticationFailed(message) => {
                tracing::error!(%message, "generation API authentication failure");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_AUTH_FAILED",
                    "The generation API rejected the configured key",
                )
            }
            GenerationError::RateLimited { retry_after } => {
                let mut api_error = Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "Generation API rate limit exceeded",
                );
                if let Some(seconds) = retry_after {
                    api_error = api_error.with_retry_after(seconds);
                }
                api_error
            }
            other => {
                tracing::error!(error = %other, "generation API error");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "GENERATION_FAILED",
                    "Summary generation failed; the cache was left untouched",
                )
            }
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::GitHub(inner) => inner.into(),
            SyncError::Database(inner) => inner.into(),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(error: SummaryError) -> Self {
        match error {
            SummaryError::UserNotSynced(username) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("User '{username}' not synced yet. Call POST /sync first."),
            ),
            SummaryError::Generation(inner) => inner.into(),
            SummaryError::Database(inner) => inner.into(),
        }
    }
}

impl From<InvalidTimeframe> for ApiError {
    fn from(error: InvalidTimeframe) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            &error.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_basic() {
        let error = ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Test error message",
        );

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Test error message"));
        assert_eq!(error.retry_after, None);
        assert!(error.trace_id.is_some());
    }

    #[test]
    fn test_content_type_and_retry_after_headers() {
        let error = ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Rate limit exceeded",
        )
        .with_retry_after(60);

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
        assert_eq!(response.headers().get("retry-after").unwrap(), "60");
    }

    #[test]
    fn test_github_error_mapping() {
        let auth: ApiError = GitHubError::AuthenticationFailed("bad token".to_string()).into();
        assert_eq!(auth.status, StatusCode::BAD_GATEWAY);
        assert_eq!(auth.code, Box::from("PROVIDER_AUTH_FAILED"));

        let limited: ApiError = GitHubError::RateLimited {
            retry_after: Some(90),
        }
        .into();
        assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.code, Box::from("RATE_LIMITED"));
        assert_eq!(limited.retry_after, Some(90));

        let api: ApiError = GitHubError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }
        .into();
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.code, Box::from("PROVIDER_ERROR"));
    }

    #[test]
    fn test_generation_error_mapping() {
        let failed: ApiError = GenerationError::Api {
            status: 500,
            message: "overloaded".to_string(),
        }
        .into();
        assert_eq!(failed.status, StatusCode::BAD_GATEWAY);
        assert_eq!(failed.code, Box::from("GENERATION_FAILED"));

        let auth: ApiError =
            GenerationError::AuthenticationFailed("bad key".to_string()).into();
        assert_eq!(auth.code, Box::from("GENERATION_AUTH_FAILED"));
    }

    #[test]
    fn test_summary_error_not_synced_maps_to_404() {
        let error: ApiError = SummaryError::UserNotSynced("octocat".to_string()).into();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert!(error.message.contains("octocat"));
    }

    #[test]
    fn test_invalid_timeframe_maps_to_validation_failure() {
        let error: ApiError = InvalidTimeframe("fortnight".to_string()).into();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
    }

    #[test]
    fn test_database_error_mapping() {
        let db_error = sea_orm::DbErr::RecordNotFound("test_record".to_string());
        let api_error: ApiError = db_error.into();

        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert!(api_error.message.contains("test_record"));
    }
}
