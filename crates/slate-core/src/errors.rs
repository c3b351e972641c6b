//! Application error taxonomy.
//!
//! Every failure a caller can observe carries an [`ErrorCode`] (one per
//! taxonomy entry) and, where the code alone is too coarse, a reason code from
//! [`reasons`]. Callers branch on these, never on the message text.

use std::fmt;

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Machine-readable error codes exposed to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A permission rule is missing or ambiguous. Operator-facing.
    ConfigurationError,
    PermissionDenied,
    InvalidArgument,
    NotFound,
    ValidationError,
    Duplicate,
    /// Lock contention, deadlock or a dropped connection; the call may be retried.
    TransientStoreError,
    Cancelled,
    Unauthenticated,
    RateLimitExceeded,
    InternalError,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::Duplicate => "DUPLICATE",
            ErrorCode::TransientStoreError => "TRANSIENT_STORE_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    pub const fn status(self) -> StatusCode {
        match self {
            ErrorCode::ConfigurationError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::Duplicate => StatusCode::CONFLICT,
            ErrorCode::TransientStoreError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason codes refining `PERMISSION_DENIED` and `VALIDATION_ERROR`.
pub mod reasons {
    pub const ROLE_NOT_PERMITTED: &str = "role_not_permitted";
    pub const NOT_OWNER: &str = "not_owner";
    pub const PRINCIPAL_INACTIVE: &str = "principal_inactive";
    pub const ROLE_CEILING: &str = "role_ceiling";

    pub const COURSE_INACTIVE: &str = "course_inactive";
    pub const COURSE_AT_CAPACITY: &str = "course_at_capacity";
    pub const STUDENT_INACTIVE: &str = "student_inactive";
    pub const CLASS_GROUP_MISMATCH: &str = "class_group_mismatch";
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub reason: Option<&'static str>,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(code: ErrorCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status: code.status(),
            code,
            reason: None,
            error: err.into(),
        }
    }

    fn msg(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, Error::msg(message.into()))
    }

    pub fn with_reason(mut self, reason: &'static str) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::InternalError, err)
    }

    pub fn database<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::InternalError, err)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::ConfigurationError, message)
    }

    pub fn forbidden(reason: &'static str, message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::PermissionDenied, message).with_reason(reason)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::NotFound, message)
    }

    pub fn validation(reason: &'static str, message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::ValidationError, message).with_reason(reason)
    }

    /// Request payload failed field validation (no business reason attached).
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::ValidationError, message)
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::Duplicate, message)
    }

    pub fn transient<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(ErrorCode::TransientStoreError, err)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::Cancelled, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::Unauthenticated, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::msg(ErrorCode::RateLimitExceeded, message)
    }

    /// Only transient store failures are safe to retry; a duplicate after a
    /// retry means the earlier attempt won and must be reported as such.
    pub fn is_transient(&self) -> bool {
        self.code == ErrorCode::TransientStoreError
    }

    /// Message safe to show callers; configuration and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self.code {
            ErrorCode::ConfigurationError | ErrorCode::InternalError => {
                "Internal server error".to_string()
            }
            _ => self.error.to_string(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Some(reason) => write!(f, "{} ({}): {}", self.code, reason, self.error),
            None => write!(f, "{}: {}", self.code, self.error),
        }
    }
}

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub reason: Option<String>,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.code {
            ErrorCode::ConfigurationError => {
                tracing::error!(error = %self.error, "Authorization configuration error");
            }
            ErrorCode::InternalError => {
                tracing::error!(error = ?self.error, "Internal error");
            }
            _ => {}
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code,
                "reason": self.reason,
                "message": self.public_message(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}
