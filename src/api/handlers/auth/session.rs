//! Session lifecycle: opaque bearer tokens stored by hash, rolling
//! expiry, lazy cleanup of expired rows, and the `kc_session` cookie.

use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::utils::{generate_session_token, hash_session_token, truncate_user_agent};
use crate::{
    api::error::ApiError,
    store::{Session, SessionStore},
};

pub(crate) const SESSION_COOKIE: &str = "kc_session";

/// Manages opaque session tokens. Only the SHA-256 of a token is ever
/// persisted; the raw token leaves this module exactly once, on create.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    ttl_seconds: u64,
    rolling: bool,
}

impl SessionManager {
    pub fn new(sessions: Arc<dyn SessionStore>, ttl_seconds: u64, rolling: bool) -> Self {
        Self {
            sessions,
            ttl_seconds,
            rolling,
        }
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Create a session and return the raw token. The row is persisted
    /// before the token is handed out, so a returned token always verifies.
    pub async fn create(
        &self,
        uid: Uuid,
        display_name: &str,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<String, ApiError> {
        let raw_token = generate_session_token().map_err(|err| {
            tracing::error!("Session token generation failed: {err}");
            ApiError::Internal
        })?;
        let now = Utc::now();
        let session = Session {
            token_hash: hash_session_token(&raw_token),
            uid,
            display_name: display_name.to_string(),
            created_at: now,
            last_activity_at: now,
            expires_at: now + Duration::seconds(self.ttl_seconds as i64),
            client_ip: client_ip.to_string(),
            user_agent: truncate_user_agent(user_agent),
        };
        self.sessions.put(session).await?;
        info!(target: "security", %uid, client_ip, "Session created");
        Ok(raw_token)
    }

    /// Verify a raw token. Expired rows are deleted on first read. With
    /// rolling expiry enabled a valid session is extended by the full TTL.
    pub async fn verify(&self, raw_token: &str) -> Result<Session, ApiError> {
        self.verify_at(raw_token, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, ApiError> {
        let token_hash = hash_session_token(raw_token);
        let Some(mut session) = self.sessions.get(&token_hash).await? else {
            return Err(ApiError::InvalidSession);
        };

        if now >= session.expires_at {
            debug!(uid = %session.uid, "Deleting expired session");
            self.sessions.delete(&token_hash).await?;
            return Err(ApiError::InvalidSession);
        }

        if self.rolling {
            let expires_at = now + Duration::seconds(self.ttl_seconds as i64);
            self.sessions.touch(&token_hash, now, expires_at).await?;
            session.last_activity_at = now;
            session.expires_at = expires_at;
        }
        Ok(session)
    }

    /// Revoke a session by raw token. Idempotent: revoking an unknown or
    /// already-revoked token succeeds.
    pub async fn revoke(&self, raw_token: &str) -> Result<(), ApiError> {
        self.sessions
            .delete(&hash_session_token(raw_token))
            .await?;
        Ok(())
    }

    /// Revoke every session belonging to a user. Returns the count removed.
    pub async fn revoke_all(&self, uid: Uuid) -> Result<u64, ApiError> {
        let removed = self.sessions.delete_all_for_uid(uid).await?;
        info!(target: "security", %uid, removed, "All sessions revoked");
        Ok(removed)
    }
}

/// Build the `Set-Cookie` value for a fresh or refreshed session.
pub(crate) fn session_cookie(raw_token: &str, ttl_seconds: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={raw_token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build the `Set-Cookie` value that clears the session cookie.
pub(crate) fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}

/// Extract the session token from a request. A bearer token in the
/// `Authorization` header takes precedence over the cookie.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
        })
}
