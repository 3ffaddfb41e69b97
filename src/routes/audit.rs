//! Audit trail route handlers

use crate::audit::{AuditEntry, DEFAULT_AUDIT_LIMIT};
use crate::error::ApiResult;
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListResponse {
    pub entries: Vec<AuditEntry>,
    pub count: usize,
    /// Total recorded entries, before filters and the limit
    pub total: usize,
}

/// GET /api/audit
///
/// Newest first, capped at `limit` (default 100).
pub async fn list_audit_entries(
    State(state): State<SharedState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<SuccessResponse<AuditListResponse>>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    let entries = state
        .audit
        .query(
            query.resource_type.as_deref(),
            query.resource_id.as_deref(),
            limit,
        )
        .await;
    let total = state.audit.len().await;
    let count = entries.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} audit entries.", count),
        AuditListResponse {
            entries,
            count,
            total,
        },
    )))
}
