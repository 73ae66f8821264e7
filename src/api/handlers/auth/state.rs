//! Shared handler state, injected via `Extension<Arc<AuthState>>`.

use std::sync::Arc;

use url::Url;

use super::{brute_force::BruteForceGuard, rate_limit::RateLimiter, session::SessionManager};
use crate::{
    audit::AuditRecorder,
    rbac::RbacEngine,
    store::{AuditSink, RoleStore, SessionStore, UserStore},
};

pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 28_800;

/// Auth behavior knobs, built up with `with_*` setters.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    frontend_base_url: Url,
    session_ttl_seconds: u64,
    rolling_sessions: bool,
}

impl AuthConfig {
    pub fn new(frontend_base_url: Url) -> Self {
        Self {
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            rolling_sessions: true,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.session_ttl_seconds = ttl_seconds;
        self
    }

    #[must_use]
    pub fn with_rolling_sessions(mut self, rolling: bool) -> Self {
        self.rolling_sessions = rolling;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &Url {
        &self.frontend_base_url
    }

    /// Exact origin for the CORS allow-list: scheme, host, and explicit
    /// port only. Any path on the configured URL is dropped.
    #[must_use]
    pub fn frontend_origin(&self) -> String {
        let host = self.frontend_base_url.host_str().unwrap_or_default();
        let port = self
            .frontend_base_url
            .port()
            .map_or_else(String::new, |port| format!(":{port}"));
        format!("{}://{host}{port}", self.frontend_base_url.scheme())
    }

    #[must_use]
    pub const fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub const fn rolling_sessions(&self) -> bool {
        self.rolling_sessions
    }

    /// The session cookie carries `Secure` exactly when the frontend is
    /// served over https.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.scheme() == "https"
    }
}

/// Everything the auth handlers need, shared through one `Arc`.
pub struct AuthState {
    pub config: AuthConfig,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionManager,
    pub limiter: RateLimiter,
    pub guard: BruteForceGuard,
    pub rbac: RbacEngine,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        roles: Arc<dyn RoleStore>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        let sessions = SessionManager::new(
            sessions,
            config.session_ttl_seconds(),
            config.rolling_sessions(),
        );
        Self {
            config,
            users,
            sessions,
            limiter: RateLimiter::new(),
            guard: BruteForceGuard::new(),
            rbac: RbacEngine::new(roles, AuditRecorder::new(audit_sink)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::new(Url::parse("http://localhost:5173").unwrap());
        assert_eq!(config.session_ttl_seconds(), 28_800);
        assert!(config.rolling_sessions());
        assert!(!config.cookie_secure());
    }

    #[test]
    fn https_frontend_implies_secure_cookie() {
        let config = AuthConfig::new(Url::parse("https://chat.example.com").unwrap());
        assert!(config.cookie_secure());
    }

    #[test]
    fn builder_setters() {
        let config = AuthConfig::new(Url::parse("http://localhost:5173").unwrap())
            .with_session_ttl_seconds(60)
            .with_rolling_sessions(false);
        assert_eq!(config.session_ttl_seconds(), 60);
        assert!(!config.rolling_sessions());
    }

    #[test]
    fn frontend_origin_strips_trailing_slash() {
        let config = AuthConfig::new(Url::parse("http://localhost:5173/").unwrap());
        assert_eq!(config.frontend_origin(), "http://localhost:5173");
    }
}
