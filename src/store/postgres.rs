//! Postgres store backend.
//!
//! Flow Overview:
//! 1) Every query runs inside a `db.query` tracing span.
//! 2) Every call is bounded by a 5 second timeout; elapsed timers surface as
//!    `StoreError::Timeout` so callers answer 503, never "not found".
//! 3) Unique violations map to `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::time::Duration;
use tracing::{Instrument, error};
use uuid::Uuid;

use super::{
    AccountStatus, AuditEntry, AuditSink, RoleRecord, RoleStore, Session, SessionStore,
    StoreError, UserCredential, UserStore,
};

const STORE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Run a store future under the bounded timeout and map failures.
async fn bounded<T, F>(operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(STORE_TIMEOUT, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) if is_unique_violation(&err) => Err(StoreError::Conflict),
        Ok(Err(err)) => {
            error!("Store operation {operation} failed: {err}");
            Err(StoreError::Unavailable(operation.to_string()))
        }
        Err(_) => {
            error!("Store operation {operation} timed out");
            Err(StoreError::Timeout)
        }
    }
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserCredential {
    UserCredential {
        uid: row.get("uid"),
        username_lower: row.get("username_lower"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        last_login_at: row.get("last_login_at"),
        last_login_ip: row.get("last_login_ip"),
        account_status: AccountStatus::parse(row.get::<String, _>("account_status").as_str()),
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn get_by_username(
        &self,
        username_lower: &str,
    ) -> Result<Option<UserCredential>, StoreError> {
        let query = r"
            SELECT uid, username_lower, display_name, email, password_hash,
                   created_at, last_login_at, last_login_ip, account_status
            FROM users
            WHERE username_lower = $1
        ";
        let row = bounded(
            "users.get_by_username",
            sqlx::query(query)
                .bind(username_lower)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query)),
        )
        .await?;
        Ok(row.map(|row| user_from_row(&row)))
    }

    async fn create(&self, user: UserCredential) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO users
                (uid, username_lower, display_name, email, password_hash,
                 created_at, account_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        bounded(
            "users.create",
            sqlx::query(query)
                .bind(user.uid)
                .bind(&user.username_lower)
                .bind(&user.display_name)
                .bind(&user.email)
                .bind(&user.password_hash)
                .bind(user.created_at)
                .bind(user.account_status.as_str())
                .execute(&self.pool)
                .instrument(query_span("INSERT", query)),
        )
        .await?;
        Ok(())
    }

    async fn update_last_login(
        &self,
        uid: Uuid,
        client_ip: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE users
            SET last_login_at = $2, last_login_ip = $3
            WHERE uid = $1
        ";
        bounded(
            "users.update_last_login",
            sqlx::query(query)
                .bind(uid)
                .bind(at)
                .bind(client_ip)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query)),
        )
        .await?;
        Ok(())
    }

    async fn update_password_hash(&self, uid: Uuid, new_hash: &str) -> Result<(), StoreError> {
        let query = "UPDATE users SET password_hash = $2 WHERE uid = $1";
        bounded(
            "users.update_password_hash",
            sqlx::query(query)
                .bind(uid)
                .bind(new_hash)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn put(&self, session: Session) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO sessions
                (token_hash, uid, display_name, created_at, last_activity_at,
                 expires_at, client_ip, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ";
        bounded(
            "sessions.put",
            sqlx::query(query)
                .bind(&session.token_hash)
                .bind(session.uid)
                .bind(&session.display_name)
                .bind(session.created_at)
                .bind(session.last_activity_at)
                .bind(session.expires_at)
                .bind(&session.client_ip)
                .bind(&session.user_agent)
                .execute(&self.pool)
                .instrument(query_span("INSERT", query)),
        )
        .await?;
        Ok(())
    }

    async fn get(&self, token_hash: &str) -> Result<Option<Session>, StoreError> {
        let query = r"
            SELECT token_hash, uid, display_name, created_at, last_activity_at,
                   expires_at, client_ip, user_agent
            FROM sessions
            WHERE token_hash = $1
        ";
        let row = bounded(
            "sessions.get",
            sqlx::query(query)
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query)),
        )
        .await?;
        Ok(row.map(|row| Session {
            token_hash: row.get("token_hash"),
            uid: row.get("uid"),
            display_name: row.get("display_name"),
            created_at: row.get("created_at"),
            last_activity_at: row.get("last_activity_at"),
            expires_at: row.get("expires_at"),
            client_ip: row.get("client_ip"),
            user_agent: row.get("user_agent"),
        }))
    }

    async fn touch(
        &self,
        token_hash: &str,
        last_activity_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE sessions
            SET last_activity_at = $2, expires_at = $3
            WHERE token_hash = $1
        ";
        bounded(
            "sessions.touch",
            sqlx::query(query)
                .bind(token_hash)
                .bind(last_activity_at)
                .bind(expires_at)
                .execute(&self.pool)
                .instrument(query_span("UPDATE", query)),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, token_hash: &str) -> Result<(), StoreError> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        bounded(
            "sessions.delete",
            sqlx::query(query)
                .bind(token_hash)
                .execute(&self.pool)
                .instrument(query_span("DELETE", query)),
        )
        .await?;
        Ok(())
    }

    async fn delete_all_for_uid(&self, uid: Uuid) -> Result<u64, StoreError> {
        let query = "DELETE FROM sessions WHERE uid = $1";
        let result = bounded(
            "sessions.delete_all_for_uid",
            sqlx::query(query)
                .bind(uid)
                .execute(&self.pool)
                .instrument(query_span("DELETE", query)),
        )
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RoleStore for PostgresStore {
    async fn get(&self, uid: Uuid) -> Result<Option<RoleRecord>, StoreError> {
        let query = r"
            SELECT uid, roles, permissions, is_active,
                   created_by, created_at, revoked_by, revoked_at
            FROM user_roles
            WHERE uid = $1
        ";
        let row = bounded(
            "user_roles.get",
            sqlx::query(query)
                .bind(uid)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", query)),
        )
        .await?;
        Ok(row.map(|row| RoleRecord {
            uid: row.get("uid"),
            roles: row.get("roles"),
            permissions: row.get("permissions"),
            is_active: row.get("is_active"),
            created_by: row.get("created_by"),
            created_at: row.get("created_at"),
            revoked_by: row.get("revoked_by"),
            revoked_at: row.get("revoked_at"),
        }))
    }

    async fn set(&self, record: RoleRecord) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO user_roles
                (uid, roles, permissions, is_active,
                 created_by, created_at, revoked_by, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (uid) DO UPDATE SET
                roles = EXCLUDED.roles,
                permissions = EXCLUDED.permissions,
                is_active = EXCLUDED.is_active,
                created_by = EXCLUDED.created_by,
                created_at = EXCLUDED.created_at,
                revoked_by = EXCLUDED.revoked_by,
                revoked_at = EXCLUDED.revoked_at
        ";
        bounded(
            "user_roles.set",
            sqlx::query(query)
                .bind(record.uid)
                .bind(&record.roles)
                .bind(&record.permissions)
                .bind(record.is_active)
                .bind(record.created_by)
                .bind(record.created_at)
                .bind(record.revoked_by)
                .bind(record.revoked_at)
                .execute(&self.pool)
                .instrument(query_span("INSERT", query)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for PostgresStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let metadata = serde_json::to_string(&entry.metadata)
            .map_err(|err| StoreError::Unavailable(format!("audit metadata: {err}")))?;
        let query = r"
            INSERT INTO admin_audit_log
                (action, admin_uid, target, client_ip, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5::jsonb, $6)
        ";
        bounded(
            "admin_audit_log.append",
            sqlx::query(query)
                .bind(&entry.action)
                .bind(entry.admin_uid)
                .bind(&entry.target)
                .bind(&entry.client_ip)
                .bind(metadata)
                .bind(entry.timestamp)
                .execute(&self.pool)
                .instrument(query_span("INSERT", query)),
        )
        .await?;
        Ok(())
    }
}
