use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts},
};

use crate::error::{ApiError, AuthError};
use crate::AppState;

/// Cookie carrying the caller's bearer token.
pub const AUTH_COOKIE: &str = "Authorization";

/// Authenticated caller. Extract this first in handlers that require auth,
/// so the credential check runs before the body is looked at.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: i64,
}

impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| parse_cookie(header, AUTH_COOKIE))
            .ok_or(AuthError::MissingCredential)?;

        match state.credentials.resolve(token).await {
            Ok(Some(user_id)) => Ok(AuthenticatedUser { user_id }),
            Ok(None) => Err(AuthError::InvalidCredential.into()),
            Err(e) => Err(AuthError::Store(e).into()),
        }
    }
}

fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value);
            }
        }
    }
    None
}
