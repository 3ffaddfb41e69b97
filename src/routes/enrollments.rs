//! Enrollment route handlers
//!
//! Seat accounting is owned by the registrar store; handlers only shape
//! requests and responses. Transfers move a seat between courses in one
//! atomic step.

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{MessageResponse, SuccessResponse};
use crate::registrar::Enrollment;
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[validate(length(min = 1, message = "Student ID is required"))]
    pub student_id: String,
    #[validate(length(min = 1, message = "Course code is required"))]
    pub course_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListQuery {
    pub course_code: Option<String>,
    pub student_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListResponse {
    pub enrollments: Vec<Enrollment>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/enrollments
pub async fn create_enrollment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnrollRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Enrollment>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let enrollment = state
        .registrar
        .enroll(&payload.student_id, &payload.course_code)
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Enrolled,
            "enrollment",
            Some(enrollment.id.to_string()),
            Some(json!({
                "studentId": enrollment.student_id,
                "courseCode": enrollment.course_code,
            })),
        ))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Student enrolled successfully.",
            enrollment,
        )),
    ))
}

/// GET /api/enrollments
pub async fn list_enrollments(
    State(state): State<SharedState>,
    Query(query): Query<EnrollmentListQuery>,
) -> ApiResult<Json<SuccessResponse<EnrollmentListResponse>>> {
    let enrollments = state
        .registrar
        .list_enrollments(query.course_code.as_deref(), query.student_id.as_deref())
        .await;
    let version = state.registrar.version();
    let count = enrollments.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} enrollment(s).", count),
        EnrollmentListResponse {
            enrollments,
            count,
            version,
        },
    )))
}

/// GET /api/courses/{code}/enrollments
pub async fn course_enrollments(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> ApiResult<Json<SuccessResponse<EnrollmentListResponse>>> {
    // 404 for unknown courses rather than an empty list
    let course = state.registrar.get_course(&code).await?;

    let enrollments = state
        .registrar
        .list_enrollments(Some(&course.code), None)
        .await;
    let version = state.registrar.version();
    let count = enrollments.len();

    Ok(Json(SuccessResponse::with_data(
        format!("{} enrolled in {}.", count, course.code),
        EnrollmentListResponse {
            enrollments,
            count,
            version,
        },
    )))
}

/// GET /api/enrollments/{id}
pub async fn get_enrollment(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Enrollment>>> {
    let enrollment = state.registrar.get_enrollment(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Enrollment retrieved successfully.",
        enrollment,
    )))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[validate(length(min = 1, message = "Target course code is required"))]
    pub to_course: String,
}

/// POST /api/enrollments/{id}/transfer
pub async fn transfer_enrollment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferRequest>,
) -> ApiResult<Json<SuccessResponse<Enrollment>>> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let enrollment = state.registrar.transfer(id, &payload.to_course).await?;
    let hop = enrollment
        .transfer_history
        .last()
        .map(|r| json!({"fromCourse": r.from_course, "toCourse": r.to_course}));

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Transferred,
            "enrollment",
            Some(enrollment.id.to_string()),
            hop,
        ))
        .await;

    info!(
        "Enrollment {} transferred to {}",
        enrollment.id, enrollment.course_code
    );

    Ok(Json(SuccessResponse::with_data(
        "Enrollment transferred successfully.",
        enrollment,
    )))
}

/// DELETE /api/enrollments/{id}
pub async fn delete_enrollment(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let enrollment = state.registrar.unenroll(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Unenrolled,
            "enrollment",
            Some(enrollment.id.to_string()),
            Some(json!({
                "studentId": enrollment.student_id,
                "courseCode": enrollment.course_code,
            })),
        ))
        .await;

    Ok(Json(MessageResponse::new(
        "Enrollment removed successfully.",
    )))
}
