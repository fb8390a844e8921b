//! Error taxonomy for the Gemini Interactions API.
//!
//! Every failure that leaves this crate is a [`GeminiError`]: a stable
//! machine-readable [`GeminiErrorCode`], a human-readable message, and an
//! optional structured `details` map. The HTTP status a caller should render
//! is derived from the code, so all provider errors look the same at the API
//! boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for Gemini client operations.
pub type Result<T> = std::result::Result<T, GeminiError>;

/// Structured error details rendered next to the message.
pub type Details = Map<String, Value>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeminiErrorCode {
    RateLimitExceeded,
    InvalidApiKey,
    RequestTimeout,
    InvalidRequest,
    ResearchFailed,
    InteractionNotFound,
    MaxPollsExceeded,
    /// The caller abandoned a wait through its cancellation token.
    WaitCancelled,
    #[serde(rename = "gemini_api_error")]
    ApiError,
}

impl GeminiErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidApiKey => "invalid_api_key",
            Self::RequestTimeout => "request_timeout",
            Self::InvalidRequest => "invalid_request",
            Self::ResearchFailed => "research_failed",
            Self::InteractionNotFound => "interaction_not_found",
            Self::MaxPollsExceeded => "max_polls_exceeded",
            Self::WaitCancelled => "wait_cancelled",
            Self::ApiError => "gemini_api_error",
        }
    }

    /// HTTP status code a client-facing response should use for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RateLimitExceeded => 429,
            Self::InvalidApiKey => 401,
            Self::RequestTimeout => 504,
            Self::InvalidRequest => 400,
            Self::InteractionNotFound => 404,
            Self::MaxPollsExceeded => 408,
            // nginx's "client closed request"
            Self::WaitCancelled => 499,
            Self::ResearchFailed | Self::ApiError => 500,
        }
    }
}

impl fmt::Display for GeminiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gemini client error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GeminiError {
    code: GeminiErrorCode,
    message: String,
    details: Option<Details>,
    transient: bool,
}

impl GeminiError {
    pub fn new(code: GeminiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            transient: false,
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn rate_limit_exceeded() -> Self {
        Self::new(
            GeminiErrorCode::RateLimitExceeded,
            "Gemini API rate limit exceeded. Please try again later.",
        )
        .transient()
    }

    pub fn invalid_api_key() -> Self {
        Self::new(
            GeminiErrorCode::InvalidApiKey,
            "Invalid or missing Gemini API key.",
        )
    }

    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::new(GeminiErrorCode::RequestTimeout, message).transient()
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(GeminiErrorCode::InvalidRequest, message)
    }

    pub fn research_failed(message: impl Into<String>) -> Self {
        Self::new(GeminiErrorCode::ResearchFailed, message)
    }

    pub fn interaction_not_found() -> Self {
        Self::new(
            GeminiErrorCode::InteractionNotFound,
            "Gemini interaction not found. The interaction ID may be invalid or expired.",
        )
    }

    pub fn max_polls_exceeded(attempts: u32) -> Self {
        Self::new(
            GeminiErrorCode::MaxPollsExceeded,
            format!("Maximum polling attempts ({}) exceeded.", attempts),
        )
    }

    pub fn wait_cancelled() -> Self {
        Self::new(
            GeminiErrorCode::WaitCancelled,
            "Waiting for the deep research job was cancelled.",
        )
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::new(GeminiErrorCode::ApiError, message)
    }

    /// Map a non-success HTTP response from the provider to a typed error.
    ///
    /// The kind depends only on the status code; the body is attached as
    /// `details.response_body` when non-empty.
    pub fn from_status(status: u16, body: &str) -> Self {
        let error = match status {
            401 => Self::invalid_api_key(),
            404 => Self::interaction_not_found(),
            429 => Self::rate_limit_exceeded(),
            400 => Self::invalid_request(format!(
                "Invalid request: {}",
                if body.is_empty() { "Bad Request" } else { body }
            )),
            _ => {
                let error = Self::api_error(format!("Gemini API error (HTTP {})", status));
                if status >= 500 {
                    error.transient()
                } else {
                    error
                }
            }
        };

        if body.is_empty() {
            error
        } else {
            error.with_detail("response_body", body)
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    /// Attach a single detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Details::new)
            .insert(key.into(), value.into());
        self
    }

    /// Mark the error as a candidate for retry inside a wait loop.
    pub(crate) fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn code(&self) -> GeminiErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Details> {
        self.details.as_ref()
    }

    pub fn status_code(&self) -> u16 {
        self.code.status_code()
    }

    /// Whether the failure may clear up on its own (timeouts, connection
    /// failures, 429 and 5xx responses). Parse failures and 4xx are never
    /// transient.
    pub fn is_transient(&self) -> bool {
        self.transient
    }
}
