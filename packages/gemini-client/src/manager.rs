//! Deep research job lifecycle.
//!
//! [`ResearchManager`] submits background interactions, polls them, waits for
//! a terminal status with a fixed interval and a bounded number of attempts,
//! and cancels them. It holds no per-job state: every operation re-reads the
//! job from the provider.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::GeminiConfig;
use crate::error::{GeminiError, Result};
use crate::transport::{
    HttpTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::types::{DeepResearchRequest, InteractionStatus, PollResult, ResearchJob};

/// Overrides for a single [`ResearchManager::wait_until_terminal`] call.
///
/// Unset (or zero) values fall back to the manager's configuration.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    pub poll_interval: Option<Duration>,
    pub max_attempts: Option<u32>,
    pub transient_retries: Option<u32>,
    /// Abandons the wait (not the job) when cancelled.
    pub cancellation: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = Some(retries);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Result of a successful [`ResearchManager::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The provider accepted the cancellation.
    Cancelled,
    /// The job had already finished; nothing to cancel.
    AlreadyTerminal(InteractionStatus),
}

/// Which lifecycle call a transport failure happened in.
#[derive(Debug, Clone, Copy)]
enum Operation {
    Submit,
    Poll,
    Cancel,
}

impl Operation {
    fn timeout_message(self, timeout: Duration) -> String {
        let secs = timeout.as_secs();
        match self {
            Self::Submit => format!("Request timed out after {} seconds.", secs),
            Self::Poll => format!("Poll request timed out after {} seconds.", secs),
            Self::Cancel => format!("Cancel request timed out after {} seconds.", secs),
        }
    }

    fn connection_message(self) -> &'static str {
        match self {
            Self::Submit => "HTTP error occurred while communicating with Gemini API.",
            Self::Poll => "HTTP error occurred while polling Gemini API.",
            Self::Cancel => "HTTP error occurred while cancelling Gemini job.",
        }
    }
}

/// Gemini deep research lifecycle manager.
#[derive(Clone)]
pub struct ResearchManager {
    transport: Arc<dyn Transport>,
    config: GeminiConfig,
}

impl ResearchManager {
    /// Create a manager that talks to the configured base URL over HTTP.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;

        let transport = HttpTransport::new(config.base_url.clone(), &config.api_key, config.timeout)
            .map_err(|e| {
                GeminiError::api_error("Failed to build Gemini HTTP client.")
                    .with_detail("original_error", e.to_string())
            })?;

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a manager over an arbitrary transport.
    pub fn with_transport(config: GeminiConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Start a background research job. Never retried.
    pub async fn submit(&self, request: DeepResearchRequest) -> Result<ResearchJob> {
        let request = request.validate()?;
        let payload = codec::encode_payload(&request, &self.config.agent)?;

        let response = self
            .send(
                Operation::Submit,
                TransportRequest::post("/interactions", payload),
            )
            .await?;
        let response = self.check_status(response)?;

        let job = codec::parse_job(&response.body)?;
        info!(
            interaction_id = %job.interaction_id,
            status = %job.status,
            agent = %self.config.agent,
            "Submitted deep research job"
        );
        Ok(job)
    }

    /// Read the current state of a job once.
    ///
    /// `last_event_id` is sent only when present and non-empty.
    pub async fn poll_once(
        &self,
        interaction_id: &str,
        last_event_id: Option<&str>,
    ) -> Result<PollResult> {
        let mut request = TransportRequest::get(interaction_path(interaction_id)?);
        if let Some(cursor) = last_event_id.filter(|c| !c.is_empty()) {
            request = request.with_query("last_event_id", cursor);
        }

        let response = self.send(Operation::Poll, request).await?;
        let response = self.check_status(response)?;

        codec::parse_poll(&response.body)
    }

    /// Poll until the job reaches a terminal status.
    ///
    /// Polls at a fixed interval, resuming from the last observed `event_id`.
    /// `Completed` returns the final snapshot; `Failed` and `Cancelled` become
    /// errors. No sleep follows the last attempt. Protocol errors abort the
    /// wait unless they are transient and retry budget remains.
    pub async fn wait_until_terminal(
        &self,
        interaction_id: &str,
        options: WaitOptions,
    ) -> Result<PollResult> {
        let poll_interval = options
            .poll_interval
            .filter(|d| !d.is_zero())
            .unwrap_or(self.config.poll_interval);
        let max_attempts = options
            .max_attempts
            .filter(|n| *n > 0)
            .unwrap_or(self.config.max_poll_attempts);
        let mut retries_left = options
            .transient_retries
            .unwrap_or(self.config.transient_retries);
        let token = options.cancellation.unwrap_or_default();

        let mut cursor: Option<String> = None;

        for attempt in 1..=max_attempts {
            let polled = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(wait_cancelled(interaction_id, attempt - 1)),
                polled = self.poll_once(interaction_id, cursor.as_deref()) => polled,
            };

            match polled {
                Ok(result) => {
                    if let Some(event_id) = &result.event_id {
                        cursor = Some(event_id.clone());
                    }

                    debug!(
                        interaction_id = %interaction_id,
                        attempt,
                        status = %result.status,
                        outputs = result.outputs.len(),
                        "Polled deep research job"
                    );

                    match result.status {
                        InteractionStatus::Completed => {
                            info!(
                                interaction_id = %interaction_id,
                                attempt,
                                "Deep research job completed"
                            );
                            return Ok(result);
                        }
                        InteractionStatus::Failed => {
                            let message = result
                                .error_message
                                .filter(|m| !m.is_empty())
                                .unwrap_or_else(|| "Deep research job failed.".to_string());
                            info!(
                                interaction_id = %interaction_id,
                                error = %message,
                                "Deep research job failed"
                            );
                            return Err(
                                GeminiError::research_failed(message)
                                    .with_detail("interaction_id", interaction_id),
                            );
                        }
                        InteractionStatus::Cancelled => {
                            info!(
                                interaction_id = %interaction_id,
                                "Deep research job was cancelled"
                            );
                            return Err(
                                GeminiError::api_error("Deep research job was cancelled.")
                                    .with_detail("interaction_id", interaction_id),
                            );
                        }
                        InteractionStatus::Pending | InteractionStatus::InProgress => {}
                    }
                }
                Err(error) if error.is_transient() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(
                        interaction_id = %interaction_id,
                        attempt,
                        code = %error.code(),
                        retries_left,
                        error = %error,
                        "Transient poll failure, retrying"
                    );
                }
                Err(error) => return Err(error),
            }

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(wait_cancelled(interaction_id, attempt)),
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }

        warn!(
            interaction_id = %interaction_id,
            attempts = max_attempts,
            "Deep research job did not finish within the polling budget"
        );
        Err(GeminiError::max_polls_exceeded(max_attempts)
            .with_detail("interaction_id", interaction_id)
            .with_detail("attempts", max_attempts)
            .with_detail("poll_interval", poll_interval.as_secs_f64()))
    }

    /// Submit a job and wait for it with the configured defaults.
    pub async fn run_to_completion(
        &self,
        request: DeepResearchRequest,
        options: WaitOptions,
    ) -> Result<PollResult> {
        let job = self.submit(request).await?;
        self.wait_until_terminal(&job.interaction_id, options).await
    }

    /// Cancel a job.
    ///
    /// A job that has already finished is not an error: when the provider
    /// refuses the cancellation with 400 or 409, the job is polled once and
    /// a terminal status is reported as [`CancelOutcome::AlreadyTerminal`].
    pub async fn cancel(&self, interaction_id: &str) -> Result<CancelOutcome> {
        let request = TransportRequest::delete(interaction_path(interaction_id)?);
        let response = self.send(Operation::Cancel, request).await?;

        if response.is_success() {
            info!(interaction_id = %interaction_id, "Cancelled deep research job");
            return Ok(CancelOutcome::Cancelled);
        }

        if matches!(response.status, 400 | 409) {
            if let Ok(snapshot) = self.poll_once(interaction_id, None).await {
                if snapshot.is_terminal() {
                    info!(
                        interaction_id = %interaction_id,
                        status = %snapshot.status,
                        "Deep research job already finished, nothing to cancel"
                    );
                    return Ok(CancelOutcome::AlreadyTerminal(snapshot.status));
                }
            }
        }

        Err(self.map_status(&response))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn send(
        &self,
        operation: Operation,
        request: TransportRequest,
    ) -> Result<TransportResponse> {
        self.transport
            .send(request)
            .await
            .map_err(|e| self.map_transport_error(operation, e))
    }

    fn check_status(&self, response: TransportResponse) -> Result<TransportResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(self.map_status(&response))
        }
    }

    fn map_status(&self, response: &TransportResponse) -> GeminiError {
        let error = GeminiError::from_status(response.status, &response.body);
        warn!(
            http_status = response.status,
            code = %error.code(),
            "Gemini API returned an error"
        );
        error
    }

    fn map_transport_error(&self, operation: Operation, error: TransportError) -> GeminiError {
        let mapped = match &error {
            TransportError::Timeout(_) => {
                GeminiError::request_timeout(operation.timeout_message(self.config.timeout))
            }
            TransportError::Connection(_) => {
                GeminiError::api_error(operation.connection_message()).transient()
            }
            TransportError::Build(_) => {
                GeminiError::api_error("Failed to build Gemini HTTP request.")
            }
        };
        warn!(operation = ?operation, error = %error, "Gemini transport failure");
        mapped.with_detail("original_error", error.to_string())
    }
}

fn interaction_path(interaction_id: &str) -> Result<String> {
    let id = interaction_id.trim();
    if id.is_empty() {
        return Err(GeminiError::invalid_request(
            "interaction_id must not be empty",
        ));
    }
    Ok(format!("/interactions/{}", urlencoding::encode(id)))
}

fn wait_cancelled(interaction_id: &str, attempts: u32) -> GeminiError {
    info!(interaction_id = %interaction_id, attempts, "Stopped waiting for deep research job");
    GeminiError::wait_cancelled()
        .with_detail("interaction_id", interaction_id)
        .with_detail("attempts", attempts)
}
