pub mod auth;
pub mod automation;
pub mod config;
pub mod db;
pub mod error;
pub mod rest;
pub mod runner;
pub mod scheduler;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use runner::BatchRunner;
use scheduler::BatchScheduler;
use traits::{Automation, CredentialStore, OperationStore, Sleeper};

/// Everything handlers need, constructed once at startup.
pub struct AppState {
    pub operations: Arc<dyn OperationStore>,
    pub credentials: Arc<dyn CredentialStore>,
    pub automation: Arc<dyn Automation>,
    pub runner: Arc<BatchRunner>,
    pub scheduler: BatchScheduler,
}

impl AppState {
    pub fn new(
        operations: Arc<dyn OperationStore>,
        credentials: Arc<dyn CredentialStore>,
        automation: Arc<dyn Automation>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let runner = Arc::new(BatchRunner::new(
            operations.clone(),
            automation.clone(),
            sleeper,
        ));
        Self {
            operations,
            credentials,
            automation,
            runner,
            scheduler: BatchScheduler::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(rest::health))
        .route("/sol-route/comment", post(rest::post_comment))
        .route("/sol-route/batch-comments", post(rest::post_batch_comments))
        .route("/sol-route/like", post(rest::like_message))
        .route("/sol-route/operation-status", get(rest::operation_status))
        .route("/sol-route/operation-stop", post(rest::stop_operation))
        .method_not_allowed_fallback(rest::method_not_allowed)
        .with_state(state)
        .layer(cors)
        // Method + path only; bodies and cookies stay out of the logs
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
