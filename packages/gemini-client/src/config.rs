//! Client configuration.

use std::time::Duration;

use crate::error::{GeminiError, GeminiErrorCode, Result};
use crate::secret::ApiKey;

/// Gemini API v1beta base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Deep research agent used when none is configured.
pub const DEFAULT_AGENT: &str = "deep-research-pro-preview-12-2025";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 360;

/// Configuration for a [`ResearchManager`](crate::ResearchManager).
///
/// Passed by value into the manager; nothing is read from the environment
/// here. The server crate owns env parsing.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    /// Processing agent tagged on every submission.
    pub agent: String,
    /// Bound on a single HTTP exchange.
    pub timeout: Duration,
    /// Fixed delay between polls in `wait_until_terminal`.
    pub poll_interval: Duration,
    /// Poll budget for `wait_until_terminal`.
    pub max_poll_attempts: u32,
    /// Transient poll failures tolerated per wait before giving up.
    pub transient_retries: u32,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            agent: DEFAULT_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            transient_retries: 0,
        }
    }

    /// Set a custom base URL (proxies, regional endpoints, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }

    /// Check the configuration is usable. A missing key is a hard failure.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_blank() {
            return Err(GeminiError::new(
                GeminiErrorCode::InvalidApiKey,
                "Gemini API key is not configured.",
            ));
        }
        if self.agent.trim().is_empty() {
            return Err(GeminiError::api_error("Gemini agent is not configured."));
        }
        Ok(())
    }
}
