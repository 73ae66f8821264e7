//! Sliding-window rate limiting keyed by client identity and endpoint
//! class. In-memory per process, so counts reset on restart.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::warn;

/// Endpoint classes with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Login and register share the strictest budget.
    Credentials,
    /// Session verification, polled by frontends.
    Session,
    /// Admin role management.
    Admin,
}

impl Endpoint {
    /// (max requests, window seconds)
    const fn budget(self) -> (usize, u64) {
        match self {
            Endpoint::Credentials => (15, 60),
            Endpoint::Session => (60, 60),
            Endpoint::Admin => (10, 60),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Endpoint::Credentials => "credentials",
            Endpoint::Session => "session",
            Endpoint::Admin => "admin",
        }
    }
}

/// Sliding-window request log. The window slides per request, so a burst
/// that exhausted the budget stays blocked until entries age out.
#[derive(Debug, Default)]
pub struct RateLimiter {
    requests: Mutex<HashMap<(String, Endpoint), Vec<u64>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request and return whether it fits the budget. A rejected
    /// request is not recorded, so probing while blocked does not extend
    /// the block.
    pub fn allow(&self, identity: &str, endpoint: Endpoint) -> bool {
        self.allow_at(identity, endpoint, unix_now())
    }

    /// Timestamp-injected variant of [`allow`](Self::allow).
    pub fn allow_at(&self, identity: &str, endpoint: Endpoint, now: u64) -> bool {
        let (max_requests, window) = endpoint.budget();
        let cutoff = now.saturating_sub(window);

        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let log = requests
            .entry((identity.to_string(), endpoint))
            .or_default();
        log.retain(|at| *at > cutoff);

        if log.len() >= max_requests {
            warn!(
                target: "security",
                identity,
                endpoint = endpoint.as_str(),
                requests = log.len(),
                "Rate limit exceeded"
            );
            return false;
        }
        log.push(now);
        true
    }

    /// Drop identities whose logs are empty after expiry. Called
    /// opportunistically, never required for correctness.
    pub fn prune(&self, now: u64) {
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        requests.retain(|(_, endpoint), log| {
            let (_, window) = endpoint.budget();
            log.retain(|at| *at > now.saturating_sub(window));
            !log.is_empty()
        });
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_budget() {
        let limiter = RateLimiter::new();
        for _ in 0..15 {
            assert!(limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100));
        }
        assert!(!limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new();
        for _ in 0..15 {
            assert!(limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100));
        }
        assert!(!limiter.allow_at("1.2.3.4", Endpoint::Credentials, 159));
        // The burst at t=100 ages out once the window has fully passed.
        assert!(limiter.allow_at("1.2.3.4", Endpoint::Credentials, 161));
    }

    #[test]
    fn rejected_requests_are_not_recorded() {
        let limiter = RateLimiter::new();
        for _ in 0..15 {
            limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100);
        }
        // Hammering while blocked must not push the unblock time out.
        for t in 101..160 {
            assert!(!limiter.allow_at("1.2.3.4", Endpoint::Credentials, t));
        }
        assert!(limiter.allow_at("1.2.3.4", Endpoint::Credentials, 161));
    }

    #[test]
    fn identities_and_endpoints_are_isolated() {
        let limiter = RateLimiter::new();
        for _ in 0..15 {
            assert!(limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100));
        }
        assert!(!limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100));
        assert!(limiter.allow_at("5.6.7.8", Endpoint::Credentials, 100));
        assert!(limiter.allow_at("1.2.3.4", Endpoint::Session, 100));
    }

    #[test]
    fn session_budget_is_wider() {
        let limiter = RateLimiter::new();
        for _ in 0..60 {
            assert!(limiter.allow_at("1.2.3.4", Endpoint::Session, 100));
        }
        assert!(!limiter.allow_at("1.2.3.4", Endpoint::Session, 100));
    }

    #[test]
    fn prune_drops_stale_identities() {
        let limiter = RateLimiter::new();
        limiter.allow_at("1.2.3.4", Endpoint::Credentials, 100);
        limiter.prune(1000);
        assert!(limiter.requests.lock().unwrap().is_empty());
    }
}
