//! Auth handlers and supporting modules.
//!
//! Request flow for a credential endpoint: rate limiter, then brute-force
//! guard, then password verification, then session issue. Authenticated
//! endpoints verify the session token first and run RBAC checks after.
//!
//! Session tokens are opaque: 48 random bytes, URL-safe encoded, stored
//! only as their SHA-256. Losing the raw token means the session can only
//! be revoked, never recovered.

pub(crate) mod admin;
mod brute_force;
pub(crate) mod login;
pub(crate) mod principal;
mod rate_limit;
pub(crate) mod register;
pub(crate) mod session;
mod state;
pub(crate) mod types;
mod utils;
mod validation;

mod password;

pub use brute_force::BruteForceGuard;
pub use rate_limit::{Endpoint, RateLimiter};
pub use session::SessionManager;
pub use state::{AuthConfig, AuthState, DEFAULT_SESSION_TTL_SECONDS};
