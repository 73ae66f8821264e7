//! Login failure tracking with exponential backoff. Keyed by client IP,
//! in-memory per process.

use std::{collections::HashMap, sync::Mutex};

use tracing::warn;

use super::rate_limit::unix_now;

const MAX_LOGIN_ATTEMPTS: u32 = 5;
const BLOCK_DURATION_BASE: u64 = 300;
const MAX_BLOCK_DURATION: u64 = 7200;

#[derive(Debug, Default, Clone)]
struct FailureRecord {
    attempts: u32,
    blocked_until: u64,
}

/// Tracks consecutive login failures per identity and blocks once the
/// threshold is hit. The block doubles with every further failure, capped
/// at two hours, and only a successful login resets it.
#[derive(Debug, Default)]
pub struct BruteForceGuard {
    failures: Mutex<HashMap<String, FailureRecord>>,
}

impl BruteForceGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the identity may attempt a login. Returns the failure
    /// count so far, or `Err((attempts, remaining_seconds))` while blocked.
    pub fn check(&self, identity: &str) -> Result<u32, (u32, u64)> {
        self.check_at(identity, unix_now())
    }

    pub fn check_at(&self, identity: &str, now: u64) -> Result<u32, (u32, u64)> {
        let failures = lock(&self.failures);
        match failures.get(identity) {
            Some(record) if record.blocked_until > now => {
                let remaining = record.blocked_until - now;
                warn!(
                    target: "security",
                    identity,
                    attempts = record.attempts,
                    remaining,
                    "Blocked identity attempted access"
                );
                Err((record.attempts, remaining))
            }
            Some(record) => Ok(record.attempts),
            None => Ok(0),
        }
    }

    /// Record a failed login. Returns the new attempt count and, once the
    /// threshold is reached, the block duration applied.
    pub fn record_failure(&self, identity: &str) -> (u32, Option<u64>) {
        self.record_failure_at(identity, unix_now())
    }

    pub fn record_failure_at(&self, identity: &str, now: u64) -> (u32, Option<u64>) {
        let mut failures = lock(&self.failures);
        let record = failures.entry(identity.to_string()).or_default();
        record.attempts += 1;

        if record.attempts < MAX_LOGIN_ATTEMPTS {
            return (record.attempts, None);
        }

        let exponent = record.attempts - MAX_LOGIN_ATTEMPTS;
        let duration = BLOCK_DURATION_BASE
            .saturating_mul(1u64.checked_shl(exponent).unwrap_or(u64::MAX))
            .min(MAX_BLOCK_DURATION);
        record.blocked_until = now + duration;
        warn!(
            target: "security",
            identity,
            attempts = record.attempts,
            block_seconds = duration,
            "Login blocked after repeated failures"
        );
        (record.attempts, Some(duration))
    }

    /// Clear the failure record after a successful login.
    pub fn record_success(&self, identity: &str) {
        lock(&self.failures).remove(identity);
    }

    /// Drop records whose block has expired. Sub-threshold counts are kept
    /// so slow-rolling attacks still accumulate.
    pub fn prune(&self, now: u64) {
        lock(&self.failures)
            .retain(|_, record| record.blocked_until == 0 || record.blocked_until > now);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
