//! # Kitchen Chat Auth
//!
//! Authentication, session, and role-based access control service for the
//! Kitchen Chat backend.
//!
//! ## Passwords
//!
//! Passwords are hashed with bcrypt (cost 12). Accounts carried over from
//! the legacy deployment may hold a `salt:sha256` hash; those are verified
//! once and transparently upgraded to bcrypt on the next successful login.
//!
//! ## Sessions
//!
//! Sessions are opaque bearer tokens with 384 bits of entropy, presented
//! via the `Authorization` header or the `kc_session` cookie. The store
//! only ever sees the SHA-256 of a token. Expiry is rolling by default:
//! each verified request extends the session by the full TTL.
//!
//! ## Authorization
//!
//! Roles and permissions are keyed strictly by user id. Display names are
//! cosmetic and never consulted for any access decision. Admin role
//! mutations are written to an append-only audit trail.
//!
//! ## Storage
//!
//! All persistence goes through the traits in [`store`]. The service runs
//! against Postgres in production and an in-memory store in demo mode and
//! tests. A store outage surfaces as 503, never as a denied login.

pub mod api;
pub mod audit;
pub mod cli;
pub mod rbac;
pub mod store;
