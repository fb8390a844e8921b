//! Gemini Interactions API client for deep research jobs.
//!
//! Submits long-running background research interactions, polls them with a
//! resumable event cursor, waits for a terminal status with a fixed interval
//! and a bounded attempt budget, and cancels them. Every failure comes back as
//! a [`GeminiError`] with a stable code and an HTTP status to render.
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_client::{DeepResearchRequest, GeminiConfig, ResearchManager, WaitOptions};
//!
//! let manager = ResearchManager::new(GeminiConfig::new(api_key))?;
//!
//! let job = manager.submit(DeepResearchRequest::new("State of solid-state batteries")).await?;
//! let result = manager
//!     .wait_until_terminal(&job.interaction_id, WaitOptions::new())
//!     .await?;
//! println!("{}", result.text());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod manager;
pub mod secret;
pub mod testing;
pub mod transport;
pub mod types;

pub use config::GeminiConfig;
pub use error::{Details, GeminiError, GeminiErrorCode, Result};
pub use manager::{CancelOutcome, ResearchManager, WaitOptions};
pub use secret::ApiKey;
pub use transport::{HttpTransport, Transport, TransportError};
pub use types::{
    DeepResearchRequest, DeltaType, InteractionStatus, Output, PollResult, ResearchJob,
    StreamEventType, Usage, MAX_QUERY_CHARS,
};

pub use tokio_util::sync::CancellationToken;
