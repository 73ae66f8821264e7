//! In-memory store backend.
//!
//! Used by the test suite and by demo mode (no DSN configured). Every trait
//! is implemented over `tokio::sync::RwLock` maps, so per-key operations
//! behave as if serialized while different keys proceed in parallel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuditEntry, AuditSink, RoleRecord, RoleStore, Session, SessionStore, StoreError,
    UserCredential, UserStore,
};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, UserCredential>>,
    sessions: RwLock<HashMap<String, Session>>,
    roles: RwLock<HashMap<Uuid, RoleRecord>>,
    audit: RwLock<Vec<AuditEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit trail, oldest first.
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().await.clone()
    }

    /// Direct session lookup, bypassing expiry handling. Test hook for
    /// asserting lazy cleanup actually removed the row.
    pub async fn raw_session(&self, token_hash: &str) -> Option<Session> {
        self.sessions.read().await.get(token_hash).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_username(
        &self,
        username_lower: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        Ok(self.users.read().await.get(username_lower).cloned())
    }

    async fn create(&self, user: UserCredential) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username_lower) {
            return Err(StoreError::Conflict);
        }
        users.insert(user.username_lower.clone(), user);
        Ok(())
    }

    async fn update_last_login(
        &self,
        uid: Uuid,
        client_ip: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.values_mut().find(|user| user.uid == uid) {
            user.last_login_at = Some(at);
            user.last_login_ip = Some(client_ip.to_string());
        }
        Ok(())
    }

    async fn update_password_hash(&self, uid: Uuid, new_hash: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.values_mut().find(|user| user.uid == uid) {
            user.password_hash = new_hash.to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(&self, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn touch(
        &self,
        token_hash: &str,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(token_hash) {
            session.last_activity_at = last_activity_at;
            session.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete(&self, token_hash: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(token_hash);
        Ok(())
    }

    async fn delete_all_for_uid(&self, uid: Uuid) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.uid != uid);
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn get(&self, uid: Uuid) -> Result<Option<RoleRecord>, StoreError> {
        Ok(self.roles.read().await.get(&uid).cloned())
    }

    async fn set(&self, record: RoleRecord) -> Result<(), StoreError> {
        self.roles.write().await.insert(record.uid, record);
        Ok(())
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit.write().await.push(entry);
        Ok(())
    }
}
