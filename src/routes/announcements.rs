//! Announcement route handlers
//!
//! List responses are shaped per reader: each announcement carries an
//! `unread` flag derived from the server-side read markers, and the
//! ordering (priority rank, then recency) is fixed here rather than
//! left to clients.

use crate::announcements::{
    Announcement, AnnouncementFilter, AnnouncementKind, AnnouncementUpdate, Priority,
};
use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    pub kind: Option<AnnouncementKind>,
    pub priority: Option<Priority>,
}

/// An announcement plus the requesting reader's unread flag
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementView {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub unread: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementListResponse {
    pub announcements: Vec<AnnouncementView>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/announcements
pub async fn create_announcement(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Announcement>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let announcement = state
        .announcements
        .create(Announcement {
            id: Uuid::new_v4(),
            title: payload.title,
            content: payload.content,
            kind: payload.kind.unwrap_or(AnnouncementKind::General),
            priority: payload.priority.unwrap_or(Priority::Medium),
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Created,
            "announcement",
            Some(announcement.id.to_string()),
            None,
        ))
        .await;

    info!("Posted announcement \"{}\"", announcement.title);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Announcement posted successfully.",
            announcement,
        )),
    ))
}

/// GET /api/announcements
pub async fn list_announcements(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<AnnouncementFilter>,
) -> ApiResult<Json<SuccessResponse<AnnouncementListResponse>>> {
    let announcements = state
        .announcements
        .list_for_reader(claims.sub, &filter)
        .await;
    let version = state.announcements.version();
    let count = announcements.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} announcement(s).", count),
        AnnouncementListResponse {
            announcements: announcements
                .into_iter()
                .map(|(announcement, unread)| AnnouncementView {
                    announcement,
                    unread,
                })
                .collect(),
            count,
            version,
        },
    )))
}

/// GET /api/announcements/{id}
pub async fn get_announcement(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Announcement>>> {
    let announcement = state.announcements.get(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Announcement retrieved successfully.",
        announcement,
    )))
}

/// PUT /api/announcements/{id}
pub async fn update_announcement(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<AnnouncementUpdate>,
) -> ApiResult<Json<SuccessResponse<Announcement>>> {
    let announcement = state.announcements.update(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "announcement",
            Some(announcement.id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Announcement updated successfully.",
        announcement,
    )))
}

/// DELETE /api/announcements/{id}
pub async fn delete_announcement(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.announcements.delete(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "announcement",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new(
        "Announcement deleted successfully.",
    )))
}

/// POST /api/announcements/{id}/read
///
/// Records the read marker for the requesting user. Idempotent.
pub async fn mark_announcement_read(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.announcements.mark_read(claims.sub, id).await?;

    Ok(Json(MessageResponse::new("Announcement marked as read.")))
}
