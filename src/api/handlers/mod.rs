//! HTTP handlers: health plus the auth surface.

pub(crate) mod auth;
pub(crate) mod health;
