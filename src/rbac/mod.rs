//! UID-based role and permission checks.
//!
//! Authorization is keyed to the immutable UID assigned at registration.
//! Display names and usernames are cosmetic and never consulted here; the
//! engine's signatures only accept a `Uuid` to make the wrong check
//! unrepresentable.
//!
//! Flow Overview:
//! 1) Resolve the UID's `RoleRecord` (inactive default when absent).
//! 2) Evaluate admin / permission predicates case-insensitively.
//! 3) Append an audit entry for every grant or revocation.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::audit::AuditRecorder;
use crate::store::{RoleRecord, RoleStore, StoreError};

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, thiserror::Error)]
pub enum RbacError {
    #[error("Admin access required")]
    AdminRequired,
    #[error("Permission '{0}' required")]
    PermissionRequired(String),
    /// The role store failed or timed out. This is never treated as "no
    /// roles": an outage must not masquerade as a clean denial.
    #[error("role store unavailable")]
    Unavailable(#[from] StoreError),
}

pub struct RbacEngine {
    roles: Arc<dyn RoleStore>,
    audit: AuditRecorder,
}

impl RbacEngine {
    #[must_use]
    pub fn new(roles: Arc<dyn RoleStore>, audit: AuditRecorder) -> Self {
        Self { roles, audit }
    }

    /// Roles and permissions for a UID; a missing record grants nothing.
    pub async fn get_roles(&self, uid: Uuid) -> Result<RoleRecord, RbacError> {
        let record = self.roles.get(uid).await?;
        Ok(record.unwrap_or_else(|| RoleRecord::inactive(uid)))
    }

    /// Active AND holding the admin role. Role comparison is case-insensitive.
    pub async fn is_admin(&self, uid: Uuid) -> Result<bool, RbacError> {
        let record = self.get_roles(uid).await?;
        if !record.is_active {
            return Ok(false);
        }
        let admin = record
            .roles
            .iter()
            .any(|role| role.eq_ignore_ascii_case(ADMIN_ROLE));
        if admin {
            info!(target: "security", "Admin access granted for UID: {uid}");
        }
        Ok(admin)
    }

    /// Admins hold every permission; everyone else needs an explicit grant.
    pub async fn has_permission(&self, uid: Uuid, permission: &str) -> Result<bool, RbacError> {
        let record = self.get_roles(uid).await?;
        if !record.is_active {
            return Ok(false);
        }
        if record
            .roles
            .iter()
            .any(|role| role.eq_ignore_ascii_case(ADMIN_ROLE))
        {
            return Ok(true);
        }
        Ok(record
            .permissions
            .iter()
            .any(|granted| granted.eq_ignore_ascii_case(permission)))
    }

    /// Like `is_admin`, but a typed error for handler short-circuiting.
    pub async fn require_admin(&self, uid: Uuid) -> Result<(), RbacError> {
        if self.is_admin(uid).await? {
            Ok(())
        } else {
            Err(RbacError::AdminRequired)
        }
    }

    pub async fn require_permission(&self, uid: Uuid, permission: &str) -> Result<(), RbacError> {
        if self.has_permission(uid, permission).await? {
            Ok(())
        } else {
            Err(RbacError::PermissionRequired(permission.to_string()))
        }
    }

    /// Create or replace the role record for `uid`. Audited.
    pub async fn grant_role(
        &self,
        uid: Uuid,
        roles: Vec<String>,
        permissions: Vec<String>,
        granted_by: Uuid,
        client_ip: Option<&str>,
    ) -> Result<(), RbacError> {
        let record = RoleRecord {
            uid,
            roles: roles.clone(),
            permissions: permissions.clone(),
            is_active: true,
            created_by: Some(granted_by),
            created_at: Some(Utc::now()),
            revoked_by: None,
            revoked_at: None,
        };
        self.roles.set(record).await?;

        self.audit
            .record(
                "grant_role",
                granted_by,
                Some(&uid.to_string()),
                client_ip,
                json!({ "roles": roles, "permissions": permissions }),
            )
            .await;
        Ok(())
    }

    /// Deactivate the role record for `uid`, keeping it for the trail. Audited.
    pub async fn revoke_role(
        &self,
        uid: Uuid,
        revoked_by: Uuid,
        client_ip: Option<&str>,
    ) -> Result<(), RbacError> {
        let mut record = self.get_roles(uid).await?;
        record.is_active = false;
        record.revoked_by = Some(revoked_by);
        record.revoked_at = Some(Utc::now());
        self.roles.set(record).await?;

        self.audit
            .record(
                "revoke_role",
                revoked_by,
                Some(&uid.to_string()),
                client_ip,
                json!({}),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, RoleStore};
    use async_trait::async_trait;

    fn engine_over(store: Arc<MemoryStore>) -> RbacEngine {
        RbacEngine::new(store.clone(), AuditRecorder::new(store))
    }

    async fn seed(store: &MemoryStore, record: RoleRecord) {
        RoleStore::set(store, record).await.unwrap();
    }

    #[tokio::test]
    async fn missing_record_is_not_admin() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(store);
        assert!(!engine.is_admin(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn active_without_admin_role_is_not_admin() {
        // Admin status comes only from the role list; an attacker-controlled
        // display name of "admin" has no record here at all.
        let store = Arc::new(MemoryStore::new());
        let uid = Uuid::new_v4();
        seed(
            &store,
            RoleRecord {
                roles: vec![],
                permissions: vec!["announcements".to_string()],
                is_active: true,
                ..RoleRecord::inactive(uid)
            },
        )
        .await;
        let engine = engine_over(store);
        assert!(!engine.is_admin(uid).await.unwrap());
    }

    #[tokio::test]
    async fn inactive_admin_record_grants_nothing() {
        let store = Arc::new(MemoryStore::new());
        let uid = Uuid::new_v4();
        seed(
            &store,
            RoleRecord {
                roles: vec!["admin".to_string()],
                permissions: vec![],
                is_active: false,
                ..RoleRecord::inactive(uid)
            },
        )
        .await;
        let engine = engine_over(store);
        assert!(!engine.is_admin(uid).await.unwrap());
        assert!(!engine.has_permission(uid, "announcements").await.unwrap());
    }

    #[tokio::test]
    async fn admin_role_is_case_insensitive_and_implies_all_permissions() {
        let store = Arc::new(MemoryStore::new());
        let uid = Uuid::new_v4();
        seed(
            &store,
            RoleRecord {
                roles: vec!["Admin".to_string()],
                permissions: vec![],
                is_active: true,
                ..RoleRecord::inactive(uid)
            },
        )
        .await;
        let engine = engine_over(store);
        assert!(engine.is_admin(uid).await.unwrap());
        assert!(engine.has_permission(uid, "moderation").await.unwrap());
    }

    #[tokio::test]
    async fn specific_permission_without_admin() {
        let store = Arc::new(MemoryStore::new());
        let uid = Uuid::new_v4();
        seed(
            &store,
            RoleRecord {
                roles: vec![],
                permissions: vec!["announcements".to_string()],
                is_active: true,
                ..RoleRecord::inactive(uid)
            },
        )
        .await;
        let engine = engine_over(store);
        assert!(engine.has_permission(uid, "announcements").await.unwrap());
        assert!(!engine.has_permission(uid, "moderation").await.unwrap());
        assert!(!engine.is_admin(uid).await.unwrap());
    }

    #[tokio::test]
    async fn require_admin_returns_typed_error() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(store);
        let err = engine.require_admin(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RbacError::AdminRequired));
    }

    #[tokio::test]
    async fn grant_and_revoke_append_audit_entries() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine_over(store.clone());
        let admin = Uuid::new_v4();
        let target = Uuid::new_v4();

        engine
            .grant_role(
                target,
                vec!["moderator".to_string()],
                vec!["moderation".to_string()],
                admin,
                Some("203.0.113.9"),
            )
            .await
            .unwrap();
        assert!(engine.has_permission(target, "moderation").await.unwrap());

        engine.revoke_role(target, admin, None).await.unwrap();
        assert!(!engine.has_permission(target, "moderation").await.unwrap());

        let entries = store.audit_entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "grant_role");
        assert_eq!(entries[1].action, "revoke_role");
        assert_eq!(entries[0].target.as_deref(), Some(target.to_string().as_str()));
    }

    struct OutageStore;

    #[async_trait]
    impl RoleStore for OutageStore {
        async fn get(&self, _uid: Uuid) -> Result<Option<RoleRecord>, StoreError> {
            Err(StoreError::Timeout)
        }

        async fn set(&self, _record: RoleRecord) -> Result<(), StoreError> {
            Err(StoreError::Timeout)
        }
    }

    #[tokio::test]
    async fn store_outage_is_unavailable_not_denied() {
        let audit_store = Arc::new(MemoryStore::new());
        let engine = RbacEngine::new(Arc::new(OutageStore), AuditRecorder::new(audit_store));
        let err = engine.is_admin(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, RbacError::Unavailable(_)));
    }
}
