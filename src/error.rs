use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Startup configuration problems. These are fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("FORM_DESIGNER_CLASSES contains an empty entry")]
    EmptyBaseName,

    #[error("Unknown form base '{0}' in FORM_DESIGNER_CLASSES")]
    UnknownBase(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Validation failures raised by the data layer before a row is stored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("You can't specify choices for {0} fields")]
    ChoicesNotAllowed(String),

    #[error("Unknown field type '{0}'")]
    UnknownFieldType(String),

    #[error("Field name '{0}' must only contain letters, digits, '_' or '-'")]
    InvalidFieldName(String),

    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid form config: {0}")]
    InvalidConfig(String),
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: u64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Validation(#[from] FormError),

    #[error("Failed to access database file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read or write CSV record: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to encode or decode stored data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stored row is unreadable: {0}")]
    Corrupt(String),

    #[error("Failed to acquire database lock")]
    Poisoned,
}

/// Outbound notification failures. Callers log and drop these.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// Errors returned from HTTP handlers, rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid authorization token")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FormError> for ApiError {
    fn from(e: FormError) -> Self {
        ApiError::Store(StoreError::Validation(e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Store(StoreError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "Internal storage error".to_string()
        } else {
            warn!("Request rejected with {}: {}", status, self);
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_mapping() {
        let not_found = ApiError::from(StoreError::NotFound { resource: "form", id: 3 });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.to_string(), "form 3 not found");

        let invalid = ApiError::from(FormError::ChoicesNotAllowed("text".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "You can't specify choices for text fields");

        assert_eq!(
            ApiError::from(StoreError::Conflict("dup".to_string())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::from(StoreError::Poisoned).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
