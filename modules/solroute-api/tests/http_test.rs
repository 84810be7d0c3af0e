//! HTTP surface tests. The router runs in-process against in-memory stores
//! and a mock platform; no sockets are opened.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use solroute_api::build_router;
use solroute_api::db::OperationStatus;
use solroute_api::runner::RunOutcome;
use solroute_api::testing::{
    app_state, GatedSleeper, MemoryCredentialStore, MemoryOperationStore, MockAutomation,
    RecordingSleeper,
};
use solroute_api::traits::{OperationStore, Sleeper};
use solroute_api::AppState;

const TOKEN: &str = "token-alice";
const OTHER_TOKEN: &str = "token-bob";

struct Harness {
    state: Arc<AppState>,
    app: Router,
    operations: Arc<MemoryOperationStore>,
    automation: Arc<MockAutomation>,
}

fn harness_with(automation: MockAutomation, sleeper: Arc<dyn Sleeper>) -> Harness {
    let operations = Arc::new(MemoryOperationStore::new());
    let automation = Arc::new(automation);
    let credentials = MemoryCredentialStore::new()
        .with_token(TOKEN, 7)
        .with_token(OTHER_TOKEN, 8);
    let state = app_state(operations.clone(), credentials, automation.clone(), sleeper);
    Harness {
        app: build_router(state.clone(), &[]),
        state,
        operations,
        automation,
    }
}

fn harness() -> Harness {
    harness_with(MockAutomation::new(), Arc::new(RecordingSleeper::new()))
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("Authorization={token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

async fn status_of(app: &Router, operation_id: &str) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::GET,
            &format!("/sol-route/operation-status?operationid={operation_id}"),
            Some(TOKEN),
            None,
        ),
    )
    .await
}

// =========================================================================
// Batch lifecycle
// =========================================================================

#[tokio::test]
async fn batch_is_active_until_the_run_completes() {
    let sleeper = Arc::new(GatedSleeper::new());
    let h = harness_with(MockAutomation::new(), sleeper.clone());

    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/batch-comments",
            Some(TOKEN),
            Some(json!({"mint": "ABC", "variable": [0, 0], "comments": ["a", "b"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let operation_id = body["operation_id"].as_str().unwrap().to_string();
    assert!(!operation_id.is_empty());

    // The run is parked in its first delay.
    let (status, body) = status_of(&h.app, &operation_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"operation_id": operation_id, "is_active": true}));

    sleeper.release(2);
    let report = h.state.scheduler.wait(&operation_id).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.submitted, 2);

    let (_, body) = status_of(&h.app, &operation_id).await;
    assert_eq!(body["is_active"], json!(false));

    let texts: Vec<_> = h.automation.posted().into_iter().map(|p| p.text).collect();
    assert_eq!(texts, vec!["a", "b"]);
}

#[tokio::test]
async fn batch_records_owner_and_target() {
    let h = harness();

    let (_, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/batch-comments",
            Some(OTHER_TOKEN),
            Some(json!({"mint": "XYZ", "variable": [0, 0], "comments": []})),
        ),
    )
    .await;
    let operation_id = body["operation_id"].as_str().unwrap().to_string();
    h.state.scheduler.wait(&operation_id).await;

    let operation = h.operations.find(&operation_id).await.unwrap().unwrap();
    assert_eq!(operation.owner_id, 8);
    assert_eq!(operation.target, "XYZ");
    assert_eq!(operation.status, OperationStatus::Finished);
}

#[tokio::test]
async fn batch_with_wrong_variable_type_is_rejected() {
    let h = harness();

    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/batch-comments",
            Some(TOKEN),
            Some(json!({"mint": "ABC", "variable": "notanarray", "comments": ["a"]})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], json!("variable"));
    assert_eq!(body["expected_type"], json!("array of integers"));
    assert_eq!(body["received_type"], json!("string"));
    assert!(h.state.scheduler.in_flight_ids().await.is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let h = harness();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/sol-route/batch-comments")
        .header(header::COOKIE, format!("Authorization={TOKEN}"))
        .body(Body::from("{nope"))
        .unwrap();

    let (status, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid JSON format"}));
}

#[tokio::test]
async fn unknown_operation_is_inactive() {
    let h = harness();
    let (status, body) = status_of(&h.app, "does-not-exist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"operation_id": "does-not-exist", "is_active": false}));
}

#[tokio::test]
async fn status_without_id_is_bad_request() {
    let h = harness();
    for uri in ["/sol-route/operation-status", "/sol-route/operation-status?operationid="] {
        let (status, body) = send(&h.app, request(Method::GET, uri, Some(TOKEN), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing operation ID"}));
    }
}

// =========================================================================
// Stop
// =========================================================================

#[tokio::test]
async fn owner_can_stop_an_operation() {
    let h = harness();
    h.operations.insert("op-1", 7, "ABC");

    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/operation-stop",
            Some(TOKEN),
            Some(json!({"operation_id": "op-1"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"operation_id": "op-1", "is_active": false}));
    assert_eq!(h.operations.status("op-1"), Some(OperationStatus::Finished));
}

#[tokio::test]
async fn stopping_twice_only_transitions_once() {
    let h = harness();
    h.operations.insert("op-1", 7, "ABC");

    for _ in 0..2 {
        let (status, body) = send(
            &h.app,
            request(
                Method::POST,
                "/sol-route/operation-stop",
                Some(TOKEN),
                Some(json!({"operation_id": "op-1"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"operation_id": "op-1", "is_active": false}));
    }

    assert_eq!(h.operations.finish_calls(), 2);
    assert!(!h.operations.finish("op-1").await.unwrap());
    assert_eq!(h.operations.status("op-1"), Some(OperationStatus::Finished));
}

#[tokio::test]
async fn stopping_an_unknown_operation_is_a_no_op() {
    let h = harness();

    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/operation-stop",
            Some(TOKEN),
            Some(json!({"operation_id": "does-not-exist"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"operation_id": "does-not-exist", "is_active": false}));
    assert!(h.operations.status("does-not-exist").is_none());
    assert!(!h.operations.is_active("does-not-exist").await.unwrap());
}

#[tokio::test]
async fn stopping_someone_elses_operation_is_not_found() {
    let h = harness();
    h.operations.insert("op-1", 7, "ABC");

    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/operation-stop",
            Some(OTHER_TOKEN),
            Some(json!({"operation_id": "op-1"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Operation not found"}));
    assert_eq!(h.operations.status("op-1"), Some(OperationStatus::Ongoing));
}

#[tokio::test]
async fn stopped_batch_halts_before_its_next_comment() {
    let sleeper = Arc::new(GatedSleeper::new());
    let h = harness_with(MockAutomation::new(), sleeper.clone());

    let (_, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/batch-comments",
            Some(TOKEN),
            Some(json!({"mint": "ABC", "variable": [0, 0], "comments": ["a", "b", "c"]})),
        ),
    )
    .await;
    let operation_id = body["operation_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/operation-stop",
            Some(TOKEN),
            Some(json!({"operation_id": operation_id})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    sleeper.release(3);
    let report = h.state.scheduler.wait(&operation_id).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Stopped);
    assert!(report.submitted <= 1);
    assert_eq!(h.operations.finish_calls(), 1);
}

// =========================================================================
// Authentication
// =========================================================================

#[tokio::test]
async fn missing_cookie_is_denied_before_body_validation() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/batch-comments",
            None,
            Some(json!({"variable": "notanarray"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Access Denied"}));
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let h = harness();
    let (status, body) = status_of_with_token(&h.app, "nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Invalid Auth Token"}));
}

#[tokio::test]
async fn credential_store_failure_is_a_server_error() {
    let operations = Arc::new(MemoryOperationStore::new());
    let state = app_state(
        operations,
        MemoryCredentialStore::unavailable(),
        Arc::new(MockAutomation::new()),
        Arc::new(RecordingSleeper::new()),
    );
    let app = build_router(state, &[]);

    let (status, body) = status_of_with_token(&app, TOKEN).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Authentication Failed"}));
}

async fn status_of_with_token(app: &Router, token: &str) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::GET,
            "/sol-route/operation-status?operationid=x",
            Some(token),
            None,
        ),
    )
    .await
}

// =========================================================================
// Single actions
// =========================================================================

#[tokio::test]
async fn comment_is_posted_with_link() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/comment",
            Some(TOKEN),
            Some(json!({"mint": "ABC", "message": "gm", "link": "https://img.test/a.png"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "Comment posted successfully"}));

    let posted = h.automation.posted();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].target, "ABC");
    assert_eq!(posted[0].attachment.as_deref(), Some("https://img.test/a.png"));
}

#[tokio::test]
async fn comment_login_failure_is_reported() {
    let h = harness_with(
        MockAutomation::new().fail_auth_on(0),
        Arc::new(RecordingSleeper::new()),
    );
    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/comment",
            Some(TOKEN),
            Some(json!({"mint": "ABC", "message": "gm"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to start client"}));
}

#[tokio::test]
async fn comment_submission_failure_is_reported() {
    let h = harness_with(
        MockAutomation::new().fail_comment("gm"),
        Arc::new(RecordingSleeper::new()),
    );
    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/comment",
            Some(TOKEN),
            Some(json!({"mint": "ABC", "message": "gm"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to post comment"}));
}

#[tokio::test]
async fn like_is_submitted() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        request(
            Method::POST,
            "/sol-route/like",
            Some(TOKEN),
            Some(json!({"message_id": "12345"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "Message liked successfully"}));
    assert_eq!(h.automation.liked(), vec!["12345".to_string()]);
}

// =========================================================================
// Routing
// =========================================================================

#[tokio::test]
async fn wrong_method_is_405() {
    let h = harness();
    let (status, body) = send(
        &h.app,
        request(Method::GET, "/sol-route/batch-comments", Some(TOKEN), None),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, json!({"error": "Method not allowed"}));
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let h = harness();
    let (status, body) = send(&h.app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}
