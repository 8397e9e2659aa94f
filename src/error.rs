use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt;

use crate::provider::ProviderCallFailed;
use crate::tree::TreeError;

/// Request-scoped failure, rendered as `{error:{code,message,details?}, status, timestamp}`.
#[derive(Debug)]
pub enum AppError {
    /// Unexpected failure. Details are logged under an error id and never sent to the client.
    Internal(anyhow::Error),
    Database(String),
    ServiceUnavailable(String),
    /// No live session accompanied the request.
    Unauthenticated(String),
    /// The credential does not exist or belongs to another user.
    CredentialNotFound(String),
    NotFound(String),
    Conflict(String),
    /// Talking to the remote drive API failed.
    ProviderCallFailed {
        /// Upstream HTTP status, when the provider answered at all.
        status: Option<u16>,
        message: String,
        drive_id: Option<String>,
    },
    RateLimited {
        retry_after_seconds: u64,
    },
    ValidationError {
        field: String,
        message: String,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::CredentialNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            // A refused credential is reported as the caller's auth problem
            AppError::ProviderCallFailed { status: Some(401 | 403), .. } => StatusCode::UNAUTHORIZED,
            AppError::ProviderCallFailed { .. } | AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::CredentialNotFound(_) => "CREDENTIAL_NOT_FOUND",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::ProviderCallFailed { .. } => "PROVIDER_CALL_FAILED",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::CredentialNotFound(msg) => write!(f, "Credential not found: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ProviderCallFailed { status: Some(s), message, .. } => {
                write!(f, "Provider call failed (HTTP {}): {}", s, message)
            }
            AppError::ProviderCallFailed { status: None, message, .. } => {
                write!(f, "Provider call failed: {}", message)
            }
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let (message, details): (String, Option<Value>) = match self {
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                (
                    "An internal server error occurred".to_string(),
                    Some(json!({ "error_id": error_id.to_string() })),
                )
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                ("A database error occurred".to_string(), None)
            }
            AppError::ProviderCallFailed { status, message, drive_id } => {
                tracing::warn!(upstream_status = ?status, "Provider call failed: {}", message);
                (
                    format!("Drive provider connection failed: {}", message),
                    Some(json!({ "upstream_status": status, "drive_id": drive_id })),
                )
            }
            AppError::RateLimited { retry_after_seconds } => (
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ValidationError { field, message } => (
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
            AppError::ServiceUnavailable(msg)
            | AppError::Unauthenticated(msg)
            | AppError::CredentialNotFound(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => (msg, None),
        };

        let mut body = json!({
            "error": { "code": code, "message": message },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => AppError::Database(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => {
                AppError::ServiceUnavailable("Database connection pool timed out".to_string())
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<ProviderCallFailed> for AppError {
    fn from(err: ProviderCallFailed) -> Self {
        AppError::ProviderCallFailed { status: err.status, message: err.to_string(), drive_id: None }
    }
}

impl From<TreeError> for AppError {
    fn from(err: TreeError) -> Self {
        // a whole-fetch timeout has no upstream status and lands on 400 like any other provider failure
        AppError::ProviderCallFailed {
            status: err.upstream_status(),
            drive_id: err.drive_id().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// Turns a missing credential lookup into `CredentialNotFound`.
pub trait OptionExt<T> {
    fn ok_or_credential_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_credential_not_found(self) -> AppResult<T> {
        self.ok_or_else(|| AppError::CredentialNotFound("no such credential for this user".to_string()))
    }
}

/// Request field checks.
pub mod validation {
    use super::*;

    const MAX_TITLE_LEN: usize = 100;
    const MAX_TOKEN_LEN: usize = 2048;

    fn field_error(field: &str, message: impl Into<String>) -> AppError {
        AppError::ValidationError { field: field.to_string(), message: message.into() }
    }

    /// Trims `value` and rejects empty, oversized or NUL-containing input.
    pub fn required_text(value: Option<&str>, field: &str, max_len: usize) -> AppResult<String> {
        let v = value.map(str::trim).unwrap_or_default();
        if v.is_empty() {
            return Err(field_error(field, "must not be empty"));
        }
        if v.len() > max_len {
            return Err(field_error(field, format!("must be at most {} bytes", max_len)));
        }
        if v.contains('\0') {
            return Err(field_error(field, "contains null characters"));
        }
        Ok(v.to_string())
    }

    pub fn api_title(value: Option<&str>) -> AppResult<String> {
        required_text(value, "apiTitle", MAX_TITLE_LEN)
    }

    pub fn api_token(value: Option<&str>) -> AppResult<String> {
        let token = required_text(value, "apiURL", MAX_TOKEN_LEN)?;
        if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(field_error("apiURL", "must not contain whitespace or control characters"));
        }
        Ok(token)
    }
}
