//! Deep research request and result types.
//!
//! These are the internal shapes the rest of the system works with. Wire
//! quirks (field renames, optional nesting) live in [`codec`](crate::codec).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GeminiError, Result};

/// Maximum query length in characters, after trimming.
pub const MAX_QUERY_CHARS: usize = 32_000;

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle state of a research interaction.
///
/// `Pending -> InProgress -> {Completed, Failed, Cancelled}`. The three
/// terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl InteractionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InteractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event kinds reported while a job is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    ThinkingUpdate,
    ResearchUpdate,
    FinalResult,
    Error,
}

/// Kind of content carried by an output segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaType {
    #[default]
    Text,
    ToolCall,
    Status,
}

// =============================================================================
// Request
// =============================================================================

/// Request to start a deep research job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeepResearchRequest {
    pub query: String,

    /// Accepted for forward compatibility; not sent to the provider yet.
    #[serde(default)]
    pub enable_thinking_summaries: bool,

    #[serde(default)]
    pub file_search_store_names: Option<Vec<String>>,

    /// Continue from an earlier interaction.
    #[serde(default)]
    pub previous_interaction_id: Option<String>,
}

impl DeepResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            enable_thinking_summaries: false,
            file_search_store_names: None,
            previous_interaction_id: None,
        }
    }

    pub fn with_file_search_store_names(mut self, names: Vec<String>) -> Self {
        self.file_search_store_names = Some(names);
        self
    }

    pub fn with_previous_interaction_id(mut self, id: impl Into<String>) -> Self {
        self.previous_interaction_id = Some(id.into());
        self
    }

    pub fn with_thinking_summaries(mut self, enabled: bool) -> Self {
        self.enable_thinking_summaries = enabled;
        self
    }

    /// Normalize and check the request.
    ///
    /// The query is trimmed and must be 1..=32000 characters. Store names are
    /// trimmed and blank entries dropped; an empty list becomes `None`. A
    /// blank continuation id is treated as absent.
    pub fn validate(mut self) -> Result<Self> {
        self.query = self.query.trim().to_string();

        let len = self.query.chars().count();
        if len == 0 {
            return Err(GeminiError::invalid_request("query must not be empty"));
        }
        if len > MAX_QUERY_CHARS {
            return Err(GeminiError::invalid_request(format!(
                "query must be at most {} characters (got {})",
                MAX_QUERY_CHARS, len
            ))
            .with_detail("max_length", MAX_QUERY_CHARS as u64));
        }

        self.file_search_store_names = self
            .file_search_store_names
            .map(|names| {
                names
                    .iter()
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|names| !names.is_empty());

        self.previous_interaction_id = self
            .previous_interaction_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        Ok(self)
    }
}

// =============================================================================
// Results
// =============================================================================

/// A submitted research job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchJob {
    pub interaction_id: String,
    pub status: InteractionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Provider fields this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token accounting, present once a job completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    /// Provider fields this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One output segment: text, thinking summary, tool call or status delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_summary: Option<String>,
    #[serde(default)]
    pub delta_type: DeltaType,
    /// Provider fields this crate does not model (annotations, citations).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Output {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Snapshot of a job returned by a single poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResult {
    pub status: InteractionStatus,
    #[serde(default)]
    pub outputs: Vec<Output>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Resume cursor for the next poll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<StreamEventType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Provider fields this crate does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PollResult {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Concatenated text of all output segments.
    pub fn text(&self) -> String {
        self.outputs
            .iter()
            .map(|o| o.content.as_str())
            .collect::<Vec<_>>()
            .join("")
    }
}
