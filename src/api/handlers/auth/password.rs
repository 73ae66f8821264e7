//! Password hashing via bcrypt, plus one-time migration of the legacy
//! salted-SHA-256 format.

use sha2::{Digest, Sha256};
use tracing::error;

use crate::api::error::ApiError;

/// bcrypt cost factor. Raising it only affects new hashes; existing ones
/// verify with the cost embedded in the hash string.
const BCRYPT_COST: u32 = 12;

/// Hash a password with bcrypt (cost 12).
pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|err| {
        error!("Password hashing failed: {err}");
        ApiError::Internal
    })
}

/// Verify a password against a stored bcrypt hash. Malformed hashes count as
/// a failed verification rather than an error.
pub(crate) fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}

/// One-time migration of the legacy `salt:hex(sha256(password + salt))`
/// format. Returns a fresh bcrypt hash when the legacy hash verifies, `None`
/// otherwise; callers cannot tell which branch failed.
pub(crate) fn migrate_legacy_password(password: &str, stored_hash: &str) -> Option<String> {
    let (salt, expected_hex) = stored_hash.split_once(':')?;
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    let computed = hex::encode(hasher.finalize());
    if computed != expected_hex.to_lowercase() {
        return None;
    }
    hash_password(password).ok()
}
