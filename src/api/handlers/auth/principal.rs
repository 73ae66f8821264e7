//! Session-backed endpoints: verify, logout, logout-all.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};

use super::{
    rate_limit::Endpoint,
    session::{clear_session_cookie, extract_session_token},
    state::AuthState,
    types::{LogoutAllResponse, LogoutResponse, SessionResponse, SessionUserBody},
    utils::extract_client_ip,
};
use crate::{api::error::ApiError, store::Session};

/// Resolve the presented token into a live session, or fail with 401.
pub(crate) async fn verify_token(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Session, ApiError> {
    let token = extract_session_token(headers).ok_or(ApiError::InvalidSession)?;
    state.sessions.verify(&token).await
}

/// Session-class rate limit plus token verification, in that order.
pub(crate) async fn require_session(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Session, ApiError> {
    let client_ip = extract_client_ip(headers);
    if !state.limiter.allow(&client_ip, Endpoint::Session) {
        return Err(ApiError::RateLimited);
    }
    verify_token(headers, state).await
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is valid.", body = SessionResponse),
        (status = 401, description = "Invalid or expired session."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = require_session(&headers, &state).await?;
    Ok(Json(SessionResponse {
        success: true,
        valid: true,
        user: SessionUserBody {
            uid: session.uid,
            display_name: session.display_name,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out; cookie cleared.", body = LogoutResponse),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    // Idempotent: an absent or already-dead token still clears the cookie.
    if let Some(token) = extract_session_token(&headers) {
        state.sessions.revoke(&token).await?;
    }
    let cookie = clear_session_cookie(state.config.cookie_secure());
    let body = LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout-all",
    responses(
        (status = 200, description = "All sessions revoked; cookie cleared.", body = LogoutAllResponse),
        (status = 401, description = "Invalid or expired session."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "auth"
)]
pub async fn logout_all(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let session = require_session(&headers, &state).await?;
    let revoked = state.sessions.revoke_all(session.uid).await?;
    let cookie = clear_session_cookie(state.config.cookie_secure());
    let body = LogoutAllResponse {
        success: true,
        revoked,
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}
