//! Request storage
//!
//! The store owns the pending -> resolved claim: `resolve` flips status
//! under the write lock, so two administrators cannot both win the same
//! request. When a side effect fails after the claim, `reopen` puts the
//! request back.

use crate::error::AppError;
use crate::requests::{PortalRequest, RequestFilter, RequestStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Thread-safe request store
pub struct RequestStore {
    requests: RwLock<HashMap<Uuid, PortalRequest>>,
    version: AtomicU64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// File a new request
    pub async fn create(&self, request: PortalRequest) -> Result<PortalRequest, AppError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id, request.clone());
        self.bump();
        Ok(request)
    }

    /// Get a request by id
    pub async fn get(&self, id: Uuid) -> Result<PortalRequest, AppError> {
        let requests = self.requests.read().await;
        requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    /// List requests matching the filter, newest first
    pub async fn list(&self, filter: &RequestFilter) -> Vec<PortalRequest> {
        let requests = self.requests.read().await;
        let mut list: Vec<PortalRequest> = requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list
    }

    /// Claim a pending request with a decision
    ///
    /// Only a pending request can be resolved, and only to approved or
    /// rejected. Returns the resolved request for the caller to act on.
    pub async fn resolve(
        &self,
        id: Uuid,
        decision: RequestStatus,
        note: Option<String>,
        resolved_by: Uuid,
    ) -> Result<PortalRequest, AppError> {
        let mut requests = self.requests.write().await;

        if decision == RequestStatus::Pending {
            return Err(AppError::BadRequest(
                "A request can only be resolved to approved or rejected".to_string(),
            ));
        }

        let request = requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;

        if request.status != RequestStatus::Pending {
            return Err(AppError::Conflict(
                "Request was already resolved".to_string(),
            ));
        }

        request.status = decision;
        request.admin_note = note;
        request.resolved_at = Some(Utc::now());
        request.resolved_by = Some(resolved_by);
        let request = request.clone();
        self.bump();

        info!(
            "Request {} ({}) resolved: {:?}",
            request.id,
            request.payload.kind(),
            request.status
        );
        Ok(request)
    }

    /// Put a claimed request back to pending after a failed side effect
    pub async fn reopen(&self, id: Uuid) -> Result<(), AppError> {
        let mut requests = self.requests.write().await;

        let request = requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;

        request.status = RequestStatus::Pending;
        request.admin_note = None;
        request.resolved_at = None;
        request.resolved_by = None;
        self.bump();

        Ok(())
    }

    /// Delete a request
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut requests = self.requests.write().await;

        requests
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;
        self.bump();

        Ok(())
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::{BorrowRequest, RequestPayload, Requester, SupportRequest};
    use pretty_assertions::assert_eq;

    fn sample_request() -> PortalRequest {
        PortalRequest::new(
            Requester {
                name: "Asha Verma".to_string(),
                email: "asha@students.campus.local".to_string(),
                student_id: Some("STU-1042".to_string()),
            },
            RequestPayload::Borrow(BorrowRequest {
                book_id: Uuid::new_v4(),
            }),
        )
    }

    #[tokio::test]
    async fn test_resolve_claims_the_request_once() {
        let store = RequestStore::new();
        let request = store.create(sample_request()).await.unwrap();
        let admin = Uuid::new_v4();

        let resolved = store
            .resolve(request.id, RequestStatus::Approved, None, admin)
            .await
            .unwrap();
        assert_eq!(resolved.status, RequestStatus::Approved);
        assert_eq!(resolved.resolved_by, Some(admin));
        assert!(resolved.resolved_at.is_some());

        // A second decision loses
        let err = store
            .resolve(request.id, RequestStatus::Rejected, None, admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_rejection_keeps_the_note() {
        let store = RequestStore::new();
        let request = store.create(sample_request()).await.unwrap();

        let resolved = store
            .resolve(
                request.id,
                RequestStatus::Rejected,
                Some("No copies this term".to_string()),
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        assert_eq!(resolved.admin_note.as_deref(), Some("No copies this term"));
    }

    #[tokio::test]
    async fn test_reopen_allows_a_second_resolution() {
        let store = RequestStore::new();
        let request = store.create(sample_request()).await.unwrap();
        let admin = Uuid::new_v4();

        store
            .resolve(request.id, RequestStatus::Approved, None, admin)
            .await
            .unwrap();
        store.reopen(request.id).await.unwrap();

        let reopened = store.get(request.id).await.unwrap();
        assert_eq!(reopened.status, RequestStatus::Pending);
        assert!(reopened.resolved_at.is_none());

        store
            .resolve(request.id, RequestStatus::Rejected, Some("n".to_string()), admin)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolving_to_pending_is_bad_request() {
        let store = RequestStore::new();
        let request = store.create(sample_request()).await.unwrap();

        let err = store
            .resolve(request.id, RequestStatus::Pending, None, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_filters_by_status_and_kind() {
        let store = RequestStore::new();
        let borrow = store.create(sample_request()).await.unwrap();
        store
            .create(PortalRequest::new(
                Requester {
                    name: "Vikram Singh".to_string(),
                    email: "vikram@students.campus.local".to_string(),
                    student_id: Some("STU-2001".to_string()),
                },
                RequestPayload::Support(SupportRequest {
                    subject: "Wifi".to_string(),
                    message: "Dorm wifi drops hourly".to_string(),
                }),
            ))
            .await
            .unwrap();
        store
            .resolve(borrow.id, RequestStatus::Approved, None, Uuid::new_v4())
            .await
            .unwrap();

        let pending = store
            .list(&RequestFilter {
                status: Some(RequestStatus::Pending),
                ..Default::default()
            })
            .await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload.kind(), "support");

        let borrows = store
            .list(&RequestFilter {
                kind: Some("borrow".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(borrows.len(), 1);
        assert_eq!(borrows[0].id, borrow.id);
    }
}
