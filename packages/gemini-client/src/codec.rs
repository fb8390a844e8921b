//! Wire format for the Gemini Interactions API.
//!
//! Outbound: [`DeepResearchRequest`] becomes the `interactions` payload
//! (`query` is sent as `input`, absent options are omitted).
//!
//! Inbound: job and poll bodies are decoded through private wire structs and
//! converted to [`ResearchJob`] / [`PollResult`]. A body that does not match
//! the expected schema is never swallowed; it becomes an API error carrying
//! the serde message and the top-level keys that were present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{GeminiError, Result};
use crate::types::{
    DeepResearchRequest, DeltaType, InteractionStatus, Output, PollResult, ResearchJob,
    StreamEventType, Usage,
};

// =============================================================================
// Outbound
// =============================================================================

/// Body of `POST /interactions`.
#[derive(Debug, Serialize)]
pub struct InteractionPayload<'a> {
    input: &'a str,
    agent: &'a str,
    background: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_search_store_names: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_interaction_id: Option<&'a str>,
}

/// Build the submission payload for a (validated) request.
pub fn build_payload<'a>(
    request: &'a DeepResearchRequest,
    agent: &'a str,
) -> InteractionPayload<'a> {
    InteractionPayload {
        input: &request.query,
        agent,
        background: true,
        file_search_store_names: request
            .file_search_store_names
            .as_deref()
            .filter(|names| !names.is_empty()),
        previous_interaction_id: request.previous_interaction_id.as_deref(),
    }
}

/// Serialize the submission payload to JSON.
pub fn encode_payload(request: &DeepResearchRequest, agent: &str) -> Result<Value> {
    serde_json::to_value(build_payload(request, agent)).map_err(|e| {
        GeminiError::api_error("Failed to encode Gemini request payload.")
            .with_detail("original_error", e.to_string())
    })
}

// =============================================================================
// Inbound
// =============================================================================

// Only the provider's own field names are accepted (`id`, `createTime`,
// `text`). Anything else lands in `extra`.

#[derive(Debug, Deserialize)]
struct JobWire {
    id: String,
    #[serde(default)]
    status: InteractionStatus,
    #[serde(default, rename = "createTime")]
    create_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct OutputWire {
    #[serde(default)]
    text: String,
    #[serde(default)]
    thinking_summary: Option<String>,
    #[serde(default)]
    delta_type: DeltaType,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PollWire {
    status: InteractionStatus,
    #[serde(default)]
    outputs: Vec<OutputWire>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    event_type: Option<StreamEventType>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<OutputWire> for Output {
    fn from(wire: OutputWire) -> Self {
        Self {
            content: wire.text,
            thinking_summary: wire.thinking_summary,
            delta_type: wire.delta_type,
            extra: without(wire.extra, &["content"]),
        }
    }
}

/// Parse the response of `POST /interactions`.
pub fn parse_job(body: &str) -> Result<ResearchJob> {
    let wire: JobWire = decode(body, "Failed to parse Gemini job creation response.")?;
    Ok(ResearchJob {
        interaction_id: wire.id,
        status: wire.status,
        created_at: wire.create_time,
        extra: without(wire.extra, &["interaction_id", "created_at"]),
    })
}

/// Parse the response of `GET /interactions/{id}`.
pub fn parse_poll(body: &str) -> Result<PollResult> {
    let wire: PollWire = decode(body, "Failed to parse Gemini poll response.")?;
    Ok(PollResult {
        status: wire.status,
        outputs: wire.outputs.into_iter().map(Output::from).collect(),
        usage: wire.usage,
        completed_at: wire.completed_at,
        event_id: wire.event_id.filter(|id| !id.is_empty()),
        event_type: wire.event_type,
        error_message: wire.error_message,
        extra: wire.extra,
    })
}

/// Drop extra keys that would collide with a renamed field on serialization.
fn without(mut extra: Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    for key in keys {
        extra.remove(*key);
    }
    extra
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str, message: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body).map_err(|e| parse_failure(message, &e, None))?;

    T::deserialize(&value).map_err(|e| parse_failure(message, &e, Some(&value)))
}

fn parse_failure(message: &str, error: &serde_json::Error, value: Option<&Value>) -> GeminiError {
    let keys: Vec<Value> = value
        .and_then(Value::as_object)
        .map(|object| object.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();

    trace!(error = %error, payload = ?value, "Unparseable Gemini payload");

    GeminiError::api_error(message)
        .with_detail("original_error", error.to_string())
        .with_detail("response_keys", Value::Array(keys))
}
