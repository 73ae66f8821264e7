//! Best-effort audit trail for privileged actions.
//!
//! Audit writes are intentionally not transactional with the action they
//! record: a failed append is logged server-side and the primary action
//! proceeds.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::store::{AuditEntry, AuditSink};

#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Append one audit entry with a server-assigned timestamp.
    pub async fn record(
        &self,
        action: &str,
        admin_uid: Uuid,
        target: Option<&str>,
        client_ip: Option<&str>,
        metadata: Value,
    ) {
        let entry = AuditEntry {
            action: action.to_string(),
            admin_uid,
            target: target.map(str::to_string),
            client_ip: client_ip.map(str::to_string),
            metadata,
            timestamp: Utc::now(),
        };
        match self.sink.append(entry).await {
            Ok(()) => {
                info!(target: "security", "Admin action logged: {action} by {admin_uid}");
            }
            Err(err) => {
                error!("Failed to append audit entry for {action}: {err}");
            }
        }
    }
}
