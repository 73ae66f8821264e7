//! Store collaborators for the auth core.
//!
//! The core never talks to a persistence engine directly: it goes through the
//! traits below, constructed once at startup. Records are typed at this
//! boundary and never passed around as loose maps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Failures surfaced by a store backend.
///
/// A timeout or transport failure is retryable and maps to 503 at the API
/// boundary; it is never folded into "not found".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store timed out")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Blocked,
}

impl AccountStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Blocked => "blocked",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == "blocked" {
            Self::Blocked
        } else {
            Self::Active
        }
    }
}

/// A registered user. `uid` is assigned at creation and never changes;
/// `display_name` is cosmetic and must never be used for authorization.
#[derive(Debug, Clone)]
pub struct UserCredential {
    pub uid: Uuid,
    pub username_lower: String,
    pub display_name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub account_status: AccountStatus,
}

/// A session row, keyed by the SHA-256 hex of the opaque bearer token.
/// The raw token is never stored.
#[derive(Debug, Clone)]
pub struct Session {
    pub token_hash: String,
    pub uid: Uuid,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub client_ip: String,
    pub user_agent: String,
}

/// Roles and permissions for a single UID. A record with `is_active = false`
/// grants nothing regardless of its contents.
#[derive(Debug, Clone)]
pub struct RoleRecord {
    pub uid: Uuid,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RoleRecord {
    /// The default for a UID with no role record: inactive, grants nothing.
    #[must_use]
    pub fn inactive(uid: Uuid) -> Self {
        Self {
            uid,
            roles: Vec::new(),
            permissions: Vec::new(),
            is_active: false,
            created_by: None,
            created_at: None,
            revoked_by: None,
            revoked_at: None,
        }
    }
}

/// One append-only audit record for a privileged action.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub action: String,
    pub admin_uid: Uuid,
    pub target: Option<String>,
    pub client_ip: Option<String>,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_username(
        &self,
        username_lower: &str,
    ) -> Result<Option<UserCredential>, StoreError>;

    /// Returns `StoreError::Conflict` when the username is already taken.
    async fn create(&self, user: UserCredential) -> Result<(), StoreError>;

    async fn update_last_login(
        &self,
        uid: Uuid,
        client_ip: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn update_password_hash(&self, uid: Uuid, new_hash: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: Session) -> Result<(), StoreError>;

    async fn get(&self, token_hash: &str) -> Result<Option<Session>, StoreError>;

    /// Rolling extension: update `last_activity_at` and `expires_at` together.
    async fn touch(
        &self,
        token_hash: &str,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Idempotent; deleting a missing session is not an error.
    async fn delete(&self, token_hash: &str) -> Result<(), StoreError>;

    /// "Logout from all devices". Returns how many sessions were removed.
    async fn delete_all_for_uid(&self, uid: Uuid) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get(&self, uid: Uuid) -> Result<Option<RoleRecord>, StoreError>;

    /// Upsert with merge semantics: an existing record for the UID is replaced.
    async fn set(&self, record: RoleRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;
}
