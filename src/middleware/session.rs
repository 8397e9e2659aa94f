use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::error::AppError;
use crate::state::AppState;
use crate::types::UserId;

pub const SESSION_COOKIE: &str = "session";

/// The authenticated caller. Rejects with `Unauthenticated` when no live session is presented.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

/// Session token from `Authorization: Bearer <token>`, falling back to the `session` cookie.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthenticated("login required".to_string()))?;
        match state.sessions.resolve(token).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(AppError::Unauthenticated("session is invalid or expired".to_string())),
        }
    }
}
