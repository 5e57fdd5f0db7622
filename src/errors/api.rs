use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::CatalogError;

/// Body of every error response.
///
/// `path` is left empty by handlers and filled in by the error envelope
/// middleware, which knows the request URI.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    pub code: String,
    pub path: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// HTTP-facing error returned by handlers and extractors
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub code: String,
    pub message: String,
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        error: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            error: error.into(),
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", "UNAUTHORIZED", message)
    }

    /// Build an error for a bare status produced outside the handlers
    /// (router fallback, body limits, method mismatch).
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let code = match status {
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::FORBIDDEN => "PERMISSION_DENIED",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::METHOD_NOT_ALLOWED => "METHOD_NOT_ALLOWED",
            StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
            StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
            StatusCode::SERVICE_UNAVAILABLE => "SERVICE_UNAVAILABLE",
            s if s.is_server_error() => "INTERNAL_ERROR",
            _ => "REQUEST_ERROR",
        };
        let error = status.canonical_reason().unwrap_or("Error");
        Self::new(status, error, code, message)
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.error.clone(),
            message: self.message.clone(),
            code: self.code.clone(),
            path: String::new(),
            timestamp: Utc::now().to_rfc3339(),
            field: self.field.clone(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::Validation { .. }
            | CatalogError::CrossProject(_)
            | CatalogError::CyclicReference(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Conflict(_) => StatusCode::CONFLICT,
            CatalogError::Upstream(_) => StatusCode::BAD_GATEWAY,
            CatalogError::Structural(_) | CatalogError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Storage details stay in the log
        let message = match &err {
            CatalogError::Database(db_err) => {
                tracing::error!("Database error: {}", db_err);
                "A database error occurred. Please try again later.".to_string()
            }
            CatalogError::Structural(_) | CatalogError::Upstream(_) => {
                tracing::error!("{}", err);
                err.to_string()
            }
            _ => err.to_string(),
        };

        Self {
            status,
            error: err.title().to_string(),
            code: err.code().to_string(),
            message,
            field: err.field_name().map(str::to_string),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::from_status(status, rejection.body_text());
        }
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid JSON",
            "INVALID_JSON",
            format!("Request body contains invalid JSON: {}", rejection.body_text()),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Validation Error",
            "VALIDATION_ERROR",
            rejection.body_text(),
        )
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Validation Error",
            "VALIDATION_ERROR",
            rejection.body_text(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.envelope();
        let mut response = (self.status, Json(envelope.clone())).into_response();
        response.extensions_mut().insert(envelope);
        response
    }
}
