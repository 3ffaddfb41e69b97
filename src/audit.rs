//! Audit log
//!
//! Append-only record of privileged mutations. Every admin-gated write
//! lands here so the portal can answer "who changed what, when".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default number of entries returned by a query
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,

    // Registrar
    Enrolled,
    Unenrolled,
    Transferred,

    // Library
    Borrowed,
    Returned,

    // Hostels
    ResidentAssigned,
    ResidentRemoved,
    WarningIssued,

    // Requests and accounts
    RequestApproved,
    RequestRejected,
    AccountActivated,
    AccountDeleted,
    PasswordChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: String,
    /// Uuid or natural key (course code, student id), stringified
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(
        user_id: Option<Uuid>,
        action: AuditAction,
        resource_type: &str,
        resource_id: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id,
            action,
            resource_type: resource_type.to_string(),
            resource_id,
            details,
        }
    }
}

/// In-memory append-only audit log
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Append an entry
    pub async fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.write().await;
        entries.push(entry);
    }

    /// Query entries, most recent first
    pub async fn query(
        &self,
        resource_type: Option<&str>,
        resource_id: Option<&str>,
        limit: usize,
    ) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;

        entries
            .iter()
            .rev()
            .filter(|e| {
                resource_type.map_or(true, |t| e.resource_type == t)
                    && resource_id.map_or(true, |id| e.resource_id.as_deref() == Some(id))
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
