//! Small helpers: session token generation/hashing and client IP extraction.

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use base64::Engine;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// 48 bytes = 384 bits of entropy for the opaque bearer token.
const SESSION_TOKEN_BYTES: usize = 48;

/// Create a new raw session token.
/// The raw value is returned to the client exactly once; only its hash is
/// ever stored or logged.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a session token for storage lookups. SHA-256 is fine here: the input
/// is high-entropy random, not a password.
pub(crate) fn hash_session_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract a client identity for rate limiting from common proxy headers,
/// in order of preference. Values that do not parse as an IP address are
/// skipped, so a spoofed garbage header cannot mint arbitrary buckets.
/// Falls back to "unknown" so unproxied local requests still share a bucket.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|candidate| is_ip(candidate));
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    for header in ["x-real-ip", "cf-connecting-ip"] {
        let candidate = headers
            .get(header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|candidate| is_ip(candidate));
        if let Some(ip) = candidate {
            return ip.to_string();
        }
    }
    "unknown".to_string()
}

fn is_ip(candidate: &str) -> bool {
    candidate.parse::<std::net::IpAddr>().is_ok()
}

/// User agents are stored truncated; some clients send kilobytes of junk.
pub(crate) fn truncate_user_agent(user_agent: &str) -> String {
    user_agent.chars().take(200).collect()
}
