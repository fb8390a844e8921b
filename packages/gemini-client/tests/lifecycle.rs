//! End-to-end lifecycle scenarios against a scripted provider.
//!
//! Tests run on a paused tokio clock, so inter-poll sleeps are virtual and the
//! elapsed time tells exactly how many delays the wait loop took.

use std::sync::Arc;
use std::time::Duration;

use gemini_client::testing::ScriptedTransport;
use gemini_client::transport::TransportError;
use gemini_client::{
    CancelOutcome, CancellationToken, DeepResearchRequest, GeminiConfig, GeminiErrorCode,
    InteractionStatus, ResearchManager, WaitOptions,
};
use serde_json::json;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(10);

fn manager(transport: &ScriptedTransport) -> ResearchManager {
    let config = GeminiConfig::new("test-key").with_poll_interval(INTERVAL);
    ResearchManager::with_transport(config, Arc::new(transport.clone()))
}

fn in_progress() -> serde_json::Value {
    json!({"status": "in_progress"})
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_two_polls_one_delay() {
    let transport = ScriptedTransport::new()
        .with_json(200, json!({"id": "abc123", "status": "pending"}))
        .with_json(200, json!({"status": "in_progress", "event_id": "e1"}))
        .with_json(
            200,
            json!({
                "status": "completed",
                "outputs": [{"text": "result text"}],
                "usage": {"total_tokens": 500}
            }),
        );
    let manager = manager(&transport);

    let job = manager
        .submit(DeepResearchRequest::new("happy path"))
        .await
        .unwrap();
    assert_eq!(job.interaction_id, "abc123");
    assert_eq!(job.status, InteractionStatus::Pending);

    let start = Instant::now();
    let result = manager
        .wait_until_terminal(&job.interaction_id, WaitOptions::new())
        .await
        .unwrap();

    assert_eq!(start.elapsed(), INTERVAL);
    assert_eq!(result.status, InteractionStatus::Completed);
    assert_eq!(result.outputs[0].content, "result text");
    assert_eq!(result.usage.as_ref().unwrap().total_tokens, 500);

    // submit + 2 polls
    assert_eq!(transport.request_count(), 3);
    let cursors = transport.cursors();
    assert_eq!(cursors[1], None);
    assert_eq!(cursors[2].as_deref(), Some("e1"));
    assert_eq!(transport.requests()[2].path, "/interactions/abc123");
}

#[tokio::test(start_paused = true)]
async fn test_cursor_follows_latest_event_and_never_regresses() {
    let transport = ScriptedTransport::new()
        .with_json(200, json!({"status": "pending", "event_id": "e1"}))
        .with_json(200, json!({"status": "in_progress"}))
        .with_json(200, json!({"status": "in_progress", "event_id": "e2"}))
        .with_json(200, json!({"status": "in_progress", "event_id": ""}))
        .with_json(200, json!({"status": "completed", "event_id": "e3"}));

    let result = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new())
        .await
        .unwrap();

    assert_eq!(result.event_id.as_deref(), Some("e3"));
    assert_eq!(
        transport.cursors(),
        vec![
            None,
            Some("e1".to_string()),
            Some("e1".to_string()),
            Some("e2".to_string()),
            Some("e2".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_stops_polling() {
    let transport = ScriptedTransport::new()
        .with_json(200, json!({"status": "completed"}))
        .with_json(200, in_progress());

    let start = Instant::now();
    manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new())
        .await
        .unwrap();

    assert_eq!(transport.request_count(), 1);
    assert_eq!(transport.remaining(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_surfaces_provider_message() {
    let transport = ScriptedTransport::new()
        .with_json(200, in_progress())
        .with_json(200, json!({"status": "failed", "error_message": "quota exceeded"}));

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::ResearchFailed);
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.message(), "quota exceeded");
    assert_eq!(err.details().unwrap()["interaction_id"], json!("abc123"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_without_message_uses_default() {
    let transport = ScriptedTransport::new().with_json(200, json!({"status": "failed"}));

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Deep research job failed.");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_is_generic_api_error() {
    let transport = ScriptedTransport::new().with_json(200, json!({"status": "cancelled"}));

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::ApiError);
    assert_eq!(err.message(), "Deep research job was cancelled.");
    assert_eq!(err.details().unwrap()["interaction_id"], json!("abc123"));
}

#[tokio::test(start_paused = true)]
async fn test_attempt_budget_is_exact() {
    let transport = ScriptedTransport::new().with_repeated_json(10, 200, in_progress());

    let start = Instant::now();
    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_max_attempts(3))
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::MaxPollsExceeded);
    assert_eq!(err.status_code(), 408);
    assert_eq!(err.message(), "Maximum polling attempts (3) exceeded.");

    let details = err.details().unwrap();
    assert_eq!(details["attempts"], json!(3));
    assert_eq!(details["interaction_id"], json!("abc123"));
    assert_eq!(details["poll_interval"], json!(10.0));

    assert_eq!(transport.request_count(), 3);
    // No sleep after the final attempt.
    assert_eq!(start.elapsed(), INTERVAL * 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_options_override_interval() {
    let transport = ScriptedTransport::new()
        .with_json(200, in_progress())
        .with_json(200, json!({"status": "completed"}));

    let start = Instant::now();
    manager(&transport)
        .wait_until_terminal(
            "abc123",
            WaitOptions::new().with_poll_interval(Duration::from_secs(2)),
        )
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_protocol_error_aborts_wait_by_default() {
    let transport = ScriptedTransport::new()
        .with_json(200, in_progress())
        .with_status(500, "internal")
        .with_json(200, json!({"status": "completed"}));

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::ApiError);
    assert_eq!(err.message(), "Gemini API error (HTTP 500)");
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_consume_retry_budget() {
    let transport = ScriptedTransport::new()
        .with_json(200, json!({"status": "in_progress", "event_id": "e1"}))
        .with_status(503, "unavailable")
        .with_error(TransportError::Timeout("deadline".into()))
        .with_json(200, json!({"status": "completed"}));

    let start = Instant::now();
    let result = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_transient_retries(2))
        .await
        .unwrap();

    assert_eq!(result.status, InteractionStatus::Completed);
    assert_eq!(start.elapsed(), INTERVAL * 3);
    assert_eq!(
        transport.cursors(),
        vec![
            None,
            Some("e1".to_string()),
            Some("e1".to_string()),
            Some("e1".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_transient_budget_exhausted_returns_error() {
    let transport = ScriptedTransport::new()
        .with_status(429, "")
        .with_status(429, "slow down");

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_transient_retries(1))
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::RateLimitExceeded);
    assert_eq!(err.details().unwrap()["response_body"], json!("slow down"));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_error_ignores_retry_budget() {
    let transport = ScriptedTransport::new()
        .with_status(404, "")
        .with_json(200, json!({"status": "completed"}));

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_transient_retries(5))
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::InteractionNotFound);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_count_against_attempts() {
    let transport = ScriptedTransport::new()
        .with_status(502, "")
        .with_status(502, "")
        .with_json(200, json!({"status": "completed"}));

    let err = manager(&transport)
        .wait_until_terminal(
            "abc123",
            WaitOptions::new()
                .with_max_attempts(2)
                .with_transient_retries(10),
        )
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::MaxPollsExceeded);
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_sleep() {
    let transport = ScriptedTransport::new().with_repeated_json(10, 200, in_progress());
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_cancellation(token))
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::WaitCancelled);
    assert_eq!(err.status_code(), 499);
    assert_eq!(start.elapsed(), Duration::from_secs(15));
    // Polled at t=0 and t=10; no DELETE was sent.
    assert_eq!(transport.request_count(), 2);
    assert!(transport
        .requests()
        .iter()
        .all(|r| r.method == gemini_client::transport::HttpMethod::Get));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_hung_transport() {
    let transport = ScriptedTransport::new().with_hang();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        canceller.cancel();
    });

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_cancellation(token))
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::WaitCancelled);
    assert_eq!(err.details().unwrap()["attempts"], json!(0));
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_token_sends_nothing() {
    let transport = ScriptedTransport::new().with_json(200, in_progress());
    let token = CancellationToken::new();
    token.cancel();

    let err = manager(&transport)
        .wait_until_terminal("abc123", WaitOptions::new().with_cancellation(token))
        .await
        .unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::WaitCancelled);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_timeout_maps_to_request_timeout() {
    let transport =
        ScriptedTransport::new().with_error(TransportError::Timeout("operation timed out".into()));

    let err = manager(&transport).poll_once("abc123", None).await.unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::RequestTimeout);
    assert_eq!(err.status_code(), 504);
    assert_eq!(err.message(), "Poll request timed out after 120 seconds.");
    assert!(err
        .details()
        .unwrap()["original_error"]
        .as_str()
        .unwrap()
        .contains("operation timed out"));
}

#[tokio::test]
async fn test_status_mapping_is_stable_across_operations() {
    let cases = [
        (401, GeminiErrorCode::InvalidApiKey),
        (404, GeminiErrorCode::InteractionNotFound),
        (429, GeminiErrorCode::RateLimitExceeded),
        (400, GeminiErrorCode::InvalidRequest),
        (418, GeminiErrorCode::ApiError),
        (500, GeminiErrorCode::ApiError),
    ];

    for (status, expected) in cases {
        let transport = ScriptedTransport::new()
            .with_status(status, r#"{"error": {"message": "whatever"}}"#)
            .with_status(status, "");
        let manager = manager(&transport);

        let submit = manager
            .submit(DeepResearchRequest::new("q"))
            .await
            .unwrap_err();
        let poll = manager.poll_once("abc123", None).await.unwrap_err();

        assert_eq!(submit.code(), expected, "submit, HTTP {}", status);
        assert_eq!(poll.code(), expected, "poll, HTTP {}", status);
    }
}

#[tokio::test]
async fn test_malformed_poll_body_is_diagnosable() {
    let transport =
        ScriptedTransport::new().with_json(200, json!({"state": "RUNNING", "name": "x"}));

    let err = manager(&transport).poll_once("abc123", None).await.unwrap_err();

    assert_eq!(err.code(), GeminiErrorCode::ApiError);
    assert_eq!(err.message(), "Failed to parse Gemini poll response.");
    let details = err.details().unwrap();
    assert!(details["original_error"].as_str().unwrap().contains("status"));
    let keys = details["response_keys"].as_array().unwrap();
    assert!(keys.contains(&json!("state")));
    assert!(keys.contains(&json!("name")));
}

#[tokio::test]
async fn test_cancel_already_finished_job_is_success() {
    let transport = ScriptedTransport::new()
        .with_status(400, "interaction is not running")
        .with_json(200, json!({"status": "completed"}));

    let outcome = manager(&transport).cancel("abc123").await.unwrap();

    assert_eq!(
        outcome,
        CancelOutcome::AlreadyTerminal(InteractionStatus::Completed)
    );
    let requests = transport.requests();
    assert_eq!(
        requests[0].method,
        gemini_client::transport::HttpMethod::Delete
    );
    assert_eq!(requests[1].method, gemini_client::transport::HttpMethod::Get);
}

#[tokio::test(start_paused = true)]
async fn test_run_to_completion_composes_submit_and_wait() {
    let transport = ScriptedTransport::new()
        .with_json(200, json!({"id": "job-9"}))
        .with_json(200, json!({"status": "completed", "outputs": [{"text": "done"}]}));

    let result = manager(&transport)
        .run_to_completion(DeepResearchRequest::new("q"), WaitOptions::new())
        .await
        .unwrap();

    assert_eq!(result.text(), "done");
    assert_eq!(transport.requests()[1].path, "/interactions/job-9");
}
