use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Malformed record: {0}")]
    MalformedRecord(String),
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Import error: {0}")]
    Import(String),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(_) | AppError::MalformedRecord(_) | AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        // Storage details stay in the logs
        let message = match &self {
            AppError::Persistence(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = match &self {
            AppError::Validation { field, .. } => json!({
                "success": false,
                "error": message,
                "field": field,
            }),
            _ => json!({
                "success": false,
                "error": message,
            }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Persistence(value.to_string())
    }
}

/// Body rejections join the validation envelope. Deserialization failures
/// carry the offending field path; anything else is reported against `body`.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                let text = e.body_text();
                let detail = text.split_once(": ").map(|(_, rest)| rest).unwrap_or(&text);
                let (field, message) = split_field_path(detail);
                AppError::validation(field, message)
            }
            other => AppError::validation("body", other.body_text()),
        }
    }
}

/// Split `path: message` as rendered by the JSON extractor. A leading segment
/// containing whitespace is part of the message, not a path.
fn split_field_path(detail: &str) -> (String, String) {
    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && path != "." && !path.contains(char::is_whitespace) => {
            (path.to_string(), message.to_string())
        }
        _ => ("body".to_string(), detail.to_string()),
    }
}
