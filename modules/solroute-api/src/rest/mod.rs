pub mod request;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::runner::BatchJob;
use crate::AppState;

use request::{BatchCommentRequest, CommentRequest, LikeRequest, StopRequest};

// --- Query / response structs ---

#[derive(Deserialize)]
pub struct StatusQuery {
    operationid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct OperationStatusResponse {
    pub operation_id: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperationCreatedResponse {
    pub operation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn new(status: &str) -> Json<Self> {
        Json(Self {
            status: status.to_string(),
        })
    }
}

// --- Batch operations ---

/// Accept a batch, record it as `ongoing` and hand it to the scheduler.
/// Responds as soon as the operation exists; the run happens in the background.
pub async fn post_batch_comments(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req = BatchCommentRequest::decode(&body)?;

    let operation_id = state.operations.create(user.user_id, &req.mint).await?;
    info!(
        operation_id = %operation_id,
        user_id = user.user_id,
        mint = %req.mint,
        comments = req.comments.len(),
        "Batch operation created"
    );

    state
        .scheduler
        .submit(
            state.runner.clone(),
            BatchJob {
                operation_id: operation_id.clone(),
                target: req.mint,
                comments: req.comments,
                delay: req.delay,
            },
        )
        .await;

    Ok((StatusCode::CREATED, Json(OperationCreatedResponse { operation_id })))
}

pub async fn operation_status(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(params): Query<StatusQuery>,
) -> Result<Json<OperationStatusResponse>, ApiError> {
    let operation_id = params
        .operationid
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::BadRequest("Missing operation ID"))?;

    let is_active = state.operations.is_active(&operation_id).await?;

    Ok(Json(OperationStatusResponse {
        operation_id,
        is_active,
    }))
}

/// Mark one of the caller's operations finished. The running batch notices
/// before its next step.
pub async fn stop_operation(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<OperationStatusResponse>, ApiError> {
    let req = StopRequest::decode(&body)?;

    if let Some(operation) = state.operations.find(&req.operation_id).await? {
        if operation.owner_id != user.user_id {
            return Err(ApiError::NotFound("Operation not found"));
        }
    }

    let stopped = state.operations.finish(&req.operation_id).await?;
    info!(operation_id = %req.operation_id, user_id = user.user_id, stopped, "Stop requested");

    Ok(Json(OperationStatusResponse {
        operation_id: req.operation_id,
        is_active: false,
    }))
}

// --- Single actions ---

pub async fn post_comment(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let req = CommentRequest::decode(&body)?;

    let mut session = state
        .automation
        .authenticate()
        .await
        .map_err(|e| ApiError::automation("Failed to start client", e))?;

    session
        .post_comment(&req.mint, &req.message, req.link.as_deref())
        .await
        .map_err(|e| ApiError::automation("Failed to post comment", e))?;

    info!(mint = %req.mint, has_link = req.link.is_some(), "Comment posted");
    Ok(StatusResponse::new("Comment posted successfully"))
}

pub async fn like_message(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let req = LikeRequest::decode(&body)?;

    let mut session = state
        .automation
        .authenticate()
        .await
        .map_err(|e| ApiError::automation("Failed to start client", e))?;

    session
        .like(&req.message_id)
        .await
        .map_err(|e| ApiError::automation("Failed to like message", e))?;

    info!(message_id = %req.message_id, "Message liked");
    Ok(StatusResponse::new("Message liked successfully"))
}

// --- Misc ---

pub async fn health() -> &'static str {
    "ok"
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
