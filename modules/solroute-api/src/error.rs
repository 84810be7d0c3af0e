//! Error taxonomy for the API and its background runs.
//!
//! Library errors are `thiserror` enums; `ApiError` folds them into HTTP
//! responses with a JSON body of the form
//! `{"error": ..., "field": ..., "expected_type": ..., "received_type": ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Submission failed: {0}")]
    Submission(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access Denied")]
    MissingCredential,

    #[error("Invalid Auth Token")]
    InvalidCredential,

    #[error("Authentication Failed")]
    Store(#[source] StoreError),
}

/// A request field that is missing, mistyped or out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field: Option<&'static str>,
    pub expected_type: Option<&'static str>,
    pub received_type: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
            expected_type: None,
            received_type: None,
        }
    }

    pub fn invalid_json() -> Self {
        Self::new("Invalid JSON format")
    }

    pub fn for_field(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            ..Self::new(message)
        }
    }

    pub fn wrong_type(
        field: &'static str,
        message: impl Into<String>,
        expected: &'static str,
        received: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            field: Some(field),
            expected_type: Some(expected),
            received_type: Some(received.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{context}: {source}")]
    Automation {
        context: &'static str,
        #[source]
        source: AutomationError,
    },

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn automation(context: &'static str, source: AutomationError) -> Self {
        ApiError::Automation { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Automation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::Validation(v) => ErrorResponse {
                error: v.message.clone(),
                field: v.field,
                expected_type: v.expected_type,
                received_type: v.received_type.clone(),
            },
            ApiError::Auth(e) => ErrorResponse::message(e.to_string()),
            ApiError::Store(_) => ErrorResponse::message("Internal server error"),
            ApiError::Automation { context, .. } => ErrorResponse::message(*context),
            other => ErrorResponse::message(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_type: Option<String>,
}

impl ErrorResponse {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
            expected_type: None,
            received_type: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(e) => error!(error = %e, "Store failure"),
            ApiError::Auth(AuthError::Store(e)) => error!(error = %e, "Credential lookup failed"),
            ApiError::Automation { context, source } => {
                error!(error = %source, context, "Automation failure")
            }
            _ => {}
        }
        (self.status(), Json(self.body())).into_response()
    }
}
