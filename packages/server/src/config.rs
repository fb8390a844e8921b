use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use gemini_client::config::{
    DEFAULT_AGENT, DEFAULT_BASE_URL, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_TIMEOUT_SECS,
};
use gemini_client::GeminiConfig;

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub gemini: GeminiConfig,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub allowed_origins: Vec<String>,
    pub api_prefix: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?;

        let gemini = GeminiConfig::new(api_key)
            .with_base_url(
                var("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            )
            .with_agent(var("GEMINI_AGENT").unwrap_or_else(|| DEFAULT_AGENT.to_string()))
            .with_timeout(Duration::from_secs(parse_or(
                &var,
                "GEMINI_TIMEOUT",
                DEFAULT_TIMEOUT_SECS,
            )?))
            .with_poll_interval(Duration::from_secs(parse_or(
                &var,
                "GEMINI_POLL_INTERVAL",
                DEFAULT_POLL_INTERVAL_SECS,
            )?))
            .with_max_poll_attempts(parse_or(
                &var,
                "GEMINI_MAX_POLL_ATTEMPTS",
                DEFAULT_MAX_POLL_ATTEMPTS,
            )?)
            .with_transient_retries(parse_or(&var, "GEMINI_TRANSIENT_RETRIES", 0)?);

        Ok(Self {
            port: parse_or(&var, "PORT", 8000)?,
            gemini,
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| "research-gateway".to_string()),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            api_prefix: var("API_PREFIX").unwrap_or_else(|| "/api/v1".to_string()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("gemini", &self.gemini)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("allowed_origins", &self.allowed_origins)
            .field("api_prefix", &self.api_prefix)
            .finish_non_exhaustive()
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}
