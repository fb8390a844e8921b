//! Testing utilities.
//!
//! [`ScriptedTransport`] replays canned provider replies in order and records
//! every request it receives, so lifecycle behavior can be asserted without a
//! network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

#[derive(Debug, Clone)]
enum Step {
    Reply(TransportResponse),
    Fail(TransportError),
    /// Never completes; for exercising cancellation and timeouts.
    Hang,
}

#[derive(Debug, Default)]
struct Inner {
    steps: VecDeque<Step>,
    requests: Vec<TransportRequest>,
}

/// A [`Transport`] that plays back a script.
///
/// Clones share the same script and request log. Once the script runs out,
/// every further call fails with a connection error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, step: Step) -> Self {
        self.lock().steps.push_back(step);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the log from the others.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a JSON reply.
    pub fn with_json(self, status: u16, body: Value) -> Self {
        self.push(Step::Reply(TransportResponse::new(status, body.to_string())))
    }

    /// Queue a reply with a raw body.
    pub fn with_status(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Step::Reply(TransportResponse::new(status, body)))
    }

    /// Queue a transport failure.
    pub fn with_error(self, error: TransportError) -> Self {
        self.push(Step::Fail(error))
    }

    /// Queue a call that never returns.
    pub fn with_hang(self) -> Self {
        self.push(Step::Hang)
    }

    /// Queue the same JSON reply `times` times.
    pub fn with_repeated_json(mut self, times: usize, status: u16, body: Value) -> Self {
        for _ in 0..times {
            self = self.with_json(status, body.clone());
        }
        self
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// `last_event_id` sent with each request (`None` when absent).
    pub fn cursors(&self) -> Vec<Option<String>> {
        self.lock()
            .requests
            .iter()
            .map(|r| r.query_param("last_event_id").map(str::to_string))
            .collect()
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let step = {
            let mut inner = self.lock();
            inner.requests.push(request);
            inner.steps.pop_front()
        };

        match step {
            Some(Step::Reply(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => std::future::pending().await,
            None => Err(TransportError::Connection("script exhausted".into())),
        }
    }
}
