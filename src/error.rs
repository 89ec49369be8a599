/// Unified error types for the job board
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum BoardError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (role or ownership mismatch)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Malformed input that is not tied to a single field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Per-field validation failures, surfaced inline by clients
    #[error("Validation failed for {} field(s)", .0.len())]
    InvalidFields(Vec<FieldError>),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate application)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// State machine transition attempted from an invalid source state
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Account banned
    #[error("Account banned: {0}")]
    AccountBanned(String),

    /// Account suspended
    #[error("Account suspended: {0}")]
    AccountSuspended(String),

    /// Notification channel failure. Logged by the notifier, never returned to a client.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Upload storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoardError {
    pub fn invalid_field(field: &str, message: &str) -> Self {
        BoardError::InvalidFields(vec![FieldError::new(field, message)])
    }

    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        BoardError::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Stable machine-readable code used in response bodies and metrics
    pub fn code(&self) -> &'static str {
        match self {
            BoardError::Authentication(_) => "AuthenticationRequired",
            BoardError::Authorization(_) => "Forbidden",
            BoardError::Validation(_) => "InvalidRequest",
            BoardError::InvalidFields(_) => "ValidationFailed",
            BoardError::NotFound(_) => "NotFound",
            BoardError::Conflict(_) => "Conflict",
            BoardError::InvalidTransition { .. } => "InvalidTransition",
            BoardError::RateLimitExceeded { .. } => "RateLimitExceeded",
            BoardError::AccountBanned(_) => "AccountBanned",
            BoardError::AccountSuspended(_) => "AccountSuspended",
            _ => "InternalServerError",
        }
    }
}

/// True when the error is a violated UNIQUE constraint
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

impl From<validator::ValidationErrors> for BoardError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed '{}' check", err.code));
                fields.push(FieldError::new(field.to_string(), message));
            }
        }
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        BoardError::InvalidFields(fields)
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Convert BoardError to HTTP response
impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = match &self {
            BoardError::Authentication(_) => StatusCode::UNAUTHORIZED,
            BoardError::Authorization(_)
            | BoardError::AccountBanned(_)
            | BoardError::AccountSuspended(_) => StatusCode::FORBIDDEN,
            BoardError::Validation(_) => StatusCode::BAD_REQUEST,
            BoardError::InvalidFields(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::Conflict(_) | BoardError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BoardError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let fields = match &self {
            BoardError::InvalidFields(errors) => {
                let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
                for err in errors {
                    map.entry(err.field.clone())
                        .or_default()
                        .push(err.message.clone());
                }
                Some(map)
            }
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
            fields,
        });

        let mut response = (status, body).into_response();
        if let BoardError::RateLimitExceeded { retry_after } = self {
            if let Ok(value) = retry_after.as_secs().max(1).to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

/// Result type alias for service operations
pub type BoardResult<T> = Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (BoardError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (BoardError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (BoardError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (BoardError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                BoardError::invalid_transition("job", "approved", "rejected"),
                StatusCode::CONFLICT,
            ),
            (
                BoardError::invalid_field("reason", "required"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (BoardError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let response = BoardError::Internal("secret connection string".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "Internal server error");
        assert!(body.fields.is_none());
    }

    #[tokio::test]
    async fn test_field_errors_are_grouped() {
        let err = BoardError::InvalidFields(vec![
            FieldError::new("title", "too short"),
            FieldError::new("title", "contains markup"),
            FieldError::new("location", "required"),
        ]);
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        let fields = body.fields.unwrap();
        assert_eq!(fields["title"].len(), 2);
        assert_eq!(fields["location"], vec!["required".to_string()]);
    }
}
