//! Appointment route handlers
//!
//! Booking is open to any signed-in user; status moves and deletion are
//! administrative. The desk token and the pending status are assigned by
//! the store, whatever the client sends.

use crate::appointments::{Appointment, AppointmentFilter, AppointmentStatus, AppointmentUpdate};
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
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 1, message = "Service is required"))]
    pub service: String,
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,
    #[validate(length(min = 1, message = "Student name is required"))]
    pub student_name: String,
    #[validate(length(min = 1, message = "Student ID is required"))]
    pub student_id: String,
    #[validate(email(message = "A valid email is required"))]
    pub student_email: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListResponse {
    pub appointments: Vec<Appointment>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/appointments
pub async fn create_appointment(
    State(state): State<SharedState>,
    Json(payload): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Appointment>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let appointment = state
        .appointments
        .create(Appointment {
            id: Uuid::new_v4(),
            service: payload.service,
            department: payload.department,
            student_name: payload.student_name,
            student_id: payload.student_id,
            student_email: payload.student_email,
            date: payload.date,
            time: payload.time,
            token: String::new(),
            status: AppointmentStatus::Pending,
            notes: payload.notes,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(
        "Booked appointment {} for {} on {}",
        appointment.token, appointment.student_id, appointment.date
    );

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Appointment booked successfully.",
            appointment,
        )),
    ))
}

/// GET /api/appointments
pub async fn list_appointments(
    State(state): State<SharedState>,
    Query(filter): Query<AppointmentFilter>,
) -> ApiResult<Json<SuccessResponse<AppointmentListResponse>>> {
    let appointments = state.appointments.list(&filter).await;
    let version = state.appointments.version();
    let count = appointments.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} appointment(s).", count),
        AppointmentListResponse {
            appointments,
            count,
            version,
        },
    )))
}

/// GET /api/appointments/{id}
pub async fn get_appointment(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Appointment>>> {
    let appointment = state.appointments.get(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Appointment retrieved successfully.",
        appointment,
    )))
}

/// PUT /api/appointments/{id}
pub async fn update_appointment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<AppointmentUpdate>,
) -> ApiResult<Json<SuccessResponse<Appointment>>> {
    let appointment = state.appointments.update(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "appointment",
            Some(appointment.id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Appointment updated successfully.",
        appointment,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStatusRequest {
    pub status: AppointmentStatus,
    pub note: Option<String>,
}

/// PATCH /api/appointments/{id}/status
pub async fn update_appointment_status(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppointmentStatusRequest>,
) -> ApiResult<Json<SuccessResponse<Appointment>>> {
    let appointment = state
        .appointments
        .update_status(id, payload.status, payload.note)
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::StatusChanged,
            "appointment",
            Some(appointment.id.to_string()),
            Some(json!({"status": appointment.status})),
        ))
        .await;

    info!(
        "Appointment {} moved to {}",
        appointment.token, appointment.status
    );

    Ok(Json(SuccessResponse::with_data(
        "Appointment status updated.",
        appointment,
    )))
}

/// DELETE /api/appointments/{id}
pub async fn delete_appointment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.appointments.delete(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "appointment",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new(
        "Appointment deleted successfully.",
    )))
}
