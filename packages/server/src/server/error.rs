//! HTTP error responses.
//!
//! Every failure renders as `{error_code, message, details?}` with the status
//! mapped from its code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gemini_client::{Details, GeminiError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Provider or lifecycle failure
    #[error(transparent)]
    Gemini(#[from] GeminiError),

    /// Malformed or invalid request body
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer token
    #[error("Authentication required")]
    Unauthorized,
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error_code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Details>,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Gemini(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            Self::Gemini(e) => e.code().as_str(),
            Self::Validation(_) => "validation_error",
            Self::Unauthorized => "not_authenticated",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Self::Gemini(e) = &self {
            if status.is_server_error() {
                tracing::error!(code = %e.code(), details = ?e.details(), "Gemini error: {}", e);
            } else {
                tracing::warn!(code = %e.code(), "Gemini error: {}", e);
            }
        }

        let details = match &self {
            Self::Gemini(e) => e.details(),
            _ => None,
        };

        let body = ErrorResponse {
            error_code: self.error_code(),
            message: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
