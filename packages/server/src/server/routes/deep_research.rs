//! Deep research endpoints.
//!
//! Thin handlers over [`ResearchManager`](gemini_client::ResearchManager):
//! submit, submit-and-wait, poll once, cancel.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    Json,
};
use gemini_client::{CancelOutcome, DeepResearchRequest, PollResult, ResearchJob, WaitOptions};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::app::AxumAppState;
use crate::server::error::{ApiError, ApiResult};
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct PollParams {
    pub last_event_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Decode and validate a request body; any failure is a 422.
fn validated(
    payload: Result<Json<DeepResearchRequest>, JsonRejection>,
) -> ApiResult<DeepResearchRequest> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    request.validate().map_err(|e| ApiError::validation(e.message()))
}

/// POST /deep-research
///
/// Starts a background job and returns immediately.
pub async fn start_deep_research(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    payload: Result<Json<DeepResearchRequest>, JsonRejection>,
) -> ApiResult<Json<ResearchJob>> {
    let request = validated(payload)?;
    let job = state.research.submit(request).await?;

    info!(
        user_id = %user.user_id,
        interaction_id = %job.interaction_id,
        "Deep research job started"
    );
    Ok(Json(job))
}

/// POST /deep-research/sync
///
/// Starts a job and holds the connection until it finishes. A client
/// disconnect drops this future, which stops the polling loop.
pub async fn run_deep_research_sync(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    payload: Result<Json<DeepResearchRequest>, JsonRejection>,
) -> ApiResult<Json<PollResult>> {
    let request = validated(payload)?;

    info!(user_id = %user.user_id, "Running deep research job synchronously");
    let result = state
        .research
        .run_to_completion(request, WaitOptions::new())
        .await?;

    Ok(Json(result))
}

/// GET /deep-research/:interaction_id
pub async fn poll_deep_research(
    Extension(state): Extension<AxumAppState>,
    _user: AuthUser,
    Path(interaction_id): Path<String>,
    Query(params): Query<PollParams>,
) -> ApiResult<Json<PollResult>> {
    let result = state
        .research
        .poll_once(&interaction_id, params.last_event_id.as_deref())
        .await?;

    Ok(Json(result))
}

/// DELETE /deep-research/:interaction_id
///
/// Succeeds both when the job is cancelled and when it had already finished.
pub async fn cancel_deep_research(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(interaction_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let outcome = state.research.cancel(&interaction_id).await?;

    if let CancelOutcome::AlreadyTerminal(status) = outcome {
        info!(
            user_id = %user.user_id,
            interaction_id = %interaction_id,
            status = %status,
            "Cancel requested for finished job"
        );
    }

    Ok(Json(MessageResponse {
        message: "Research job cancelled successfully".to_string(),
    }))
}
