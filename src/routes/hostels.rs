//! Hostel and room route handlers
//!
//! Occupancy is recounted by the store whenever residents move, so
//! hostel responses carry the derived `occupancyRate` percent.

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::hostels::{Hostel, HostelFilter, HostelKind, HostelUpdate, Room, RoomUpdate};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// HOSTELS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateHostelRequest {
    #[validate(length(min = 1, message = "Hostel name is required"))]
    pub name: String,
    pub kind: HostelKind,
    #[validate(range(min = 1, message = "A hostel needs at least one room"))]
    pub total_rooms: u32,
    #[validate(length(min = 1, message = "Warden is required"))]
    pub warden: String,
}

/// A hostel plus its derived occupancy percent
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelView {
    #[serde(flatten)]
    pub hostel: Hostel,
    pub occupancy_rate: u32,
}

impl From<Hostel> for HostelView {
    fn from(hostel: Hostel) -> Self {
        let occupancy_rate = hostel.occupancy_rate();
        HostelView {
            hostel,
            occupancy_rate,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelListResponse {
    pub hostels: Vec<HostelView>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/hostels
pub async fn create_hostel(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateHostelRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<HostelView>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let hostel = state
        .hostels
        .create_hostel(Hostel {
            id: Uuid::new_v4(),
            name: payload.name,
            kind: payload.kind,
            total_rooms: payload.total_rooms,
            occupied_rooms: 0,
            warden: payload.warden,
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Created,
            "hostel",
            Some(hostel.id.to_string()),
            None,
        ))
        .await;

    info!("Created hostel {}", hostel.name);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Hostel created successfully.",
            HostelView::from(hostel),
        )),
    ))
}

/// GET /api/hostels
pub async fn list_hostels(
    State(state): State<SharedState>,
    Query(filter): Query<HostelFilter>,
) -> ApiResult<Json<SuccessResponse<HostelListResponse>>> {
    let hostels = state.hostels.list_hostels(&filter).await;
    let version = state.hostels.version();
    let count = hostels.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} hostel(s).", count),
        HostelListResponse {
            hostels: hostels.into_iter().map(HostelView::from).collect(),
            count,
            version,
        },
    )))
}

/// GET /api/hostels/{id}
pub async fn get_hostel(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<HostelView>>> {
    let hostel = state.hostels.get_hostel(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Hostel retrieved successfully.",
        HostelView::from(hostel),
    )))
}

/// PUT /api/hostels/{id}
pub async fn update_hostel(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<HostelUpdate>,
) -> ApiResult<Json<SuccessResponse<HostelView>>> {
    let hostel = state.hostels.update_hostel(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "hostel",
            Some(hostel.id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Hostel updated successfully.",
        HostelView::from(hostel),
    )))
}

/// DELETE /api/hostels/{id}
pub async fn delete_hostel(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.hostels.delete_hostel(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "hostel",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("Hostel deleted successfully.")))
}

// =============================================================================
// ROOMS
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, message = "Room number is required"))]
    pub room_number: String,
    pub floor: i32,
    #[validate(range(min = 1, max = 12, message = "Capacity must be between 1 and 12"))]
    pub capacity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListQuery {
    pub floor: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListResponse {
    pub rooms: Vec<Room>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/hostels/{id}/rooms
pub async fn create_room(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(hostel_id): Path<Uuid>,
    Json(payload): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Room>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let room = state
        .hostels
        .add_room(Room {
            id: Uuid::new_v4(),
            hostel_id,
            room_number: payload.room_number,
            floor: payload.floor,
            capacity: payload.capacity,
            residents: Vec::new(),
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Created,
            "room",
            Some(room.id.to_string()),
            Some(json!({"hostelId": hostel_id, "roomNumber": room.room_number})),
        ))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Room added successfully.", room)),
    ))
}

/// GET /api/hostels/{id}/rooms
pub async fn hostel_rooms(
    State(state): State<SharedState>,
    Path(hostel_id): Path<Uuid>,
    Query(query): Query<RoomListQuery>,
) -> ApiResult<Json<SuccessResponse<RoomListResponse>>> {
    // 404 for unknown hostels rather than an empty list
    state.hostels.get_hostel(hostel_id).await?;

    let rooms = state.hostels.list_rooms(Some(hostel_id), query.floor).await;
    let version = state.hostels.version();
    let count = rooms.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} room(s).", count),
        RoomListResponse {
            rooms,
            count,
            version,
        },
    )))
}

/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Room>>> {
    let room = state.hostels.get_room(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Room retrieved successfully.",
        room,
    )))
}

/// PUT /api/rooms/{id}
pub async fn update_room(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<RoomUpdate>,
) -> ApiResult<Json<SuccessResponse<Room>>> {
    let room = state.hostels.update_room(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "room",
            Some(room.id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Room updated successfully.",
        room,
    )))
}

/// DELETE /api/rooms/{id}
pub async fn delete_room(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.hostels.delete_room(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "room",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("Room deleted successfully.")))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignResidentRequest {
    #[validate(length(min = 1, message = "Student ID is required"))]
    pub student_id: String,
}

/// POST /api/rooms/{id}/residents
pub async fn assign_resident(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignResidentRequest>,
) -> ApiResult<Json<SuccessResponse<Room>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let room = state.hostels.assign_resident(id, &payload.student_id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::ResidentAssigned,
            "room",
            Some(room.id.to_string()),
            Some(json!({"studentId": payload.student_id})),
        ))
        .await;

    info!("Assigned {} to room {}", payload.student_id, room.room_number);

    Ok(Json(SuccessResponse::with_data(
        "Resident assigned successfully.",
        room,
    )))
}

/// DELETE /api/rooms/{id}/residents/{student_id}
pub async fn remove_resident(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((id, student_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<SuccessResponse<Room>>> {
    let room = state.hostels.remove_resident(id, &student_id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::ResidentRemoved,
            "room",
            Some(room.id.to_string()),
            Some(json!({"studentId": student_id})),
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Resident removed successfully.",
        room,
    )))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomWarningRequest {
    #[validate(length(min = 1, message = "Warning message is required"))]
    pub message: String,
}

/// POST /api/rooms/{id}/warnings
pub async fn add_room_warning(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoomWarningRequest>,
) -> ApiResult<Json<SuccessResponse<Room>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let room = state.hostels.add_warning(id, payload.message).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::WarningIssued,
            "room",
            Some(room.id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Warning recorded successfully.",
        room,
    )))
}
