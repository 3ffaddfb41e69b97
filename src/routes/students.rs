//! Student record route handlers

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use crate::students::{Student, StudentFilter, StudentStatus, StudentUpdate};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// Student IDs are an STU- prefix followed by at least three digits
static STUDENT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^STU-\d{3,}$").unwrap());

fn validate_student_key(student_id: &str) -> Result<(), ValidationError> {
    if STUDENT_ID_PATTERN.is_match(student_id) {
        Ok(())
    } else {
        Err(ValidationError::new("student_id_format"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(custom(
        function = "validate_student_key",
        message = "Student ID must look like STU-1024"
    ))]
    pub student_id: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,
    #[validate(range(min = 1, max = 6, message = "Year must be between 1 and 6"))]
    pub year: u8,
    pub status: Option<StudentStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentListResponse {
    pub students: Vec<Student>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/students
pub async fn create_student(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateStudentRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<Student>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let student = state
        .students
        .create(Student {
            id: Uuid::new_v4(),
            student_id: payload.student_id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            department: payload.department,
            year: payload.year,
            status: payload.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Created,
            "student",
            Some(student.student_id.clone()),
            None,
        ))
        .await;

    info!("Created student record {}", student.student_id);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Student created successfully.",
            student,
        )),
    ))
}

/// GET /api/students
pub async fn list_students(
    State(state): State<SharedState>,
    Query(filter): Query<StudentFilter>,
) -> ApiResult<Json<SuccessResponse<StudentListResponse>>> {
    let students = state.students.list(&filter).await;
    let version = state.students.version();
    let count = students.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} student(s).", count),
        StudentListResponse {
            students,
            count,
            version,
        },
    )))
}

/// GET /api/students/{id}
pub async fn get_student(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Student>>> {
    let student = state.students.get(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Student retrieved successfully.",
        student,
    )))
}

/// PUT /api/students/{id}
pub async fn update_student(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<StudentUpdate>,
) -> ApiResult<Json<SuccessResponse<Student>>> {
    let student = state.students.update(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "student",
            Some(student.student_id.clone()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Student updated successfully.",
        student,
    )))
}

/// DELETE /api/students/{id}
pub async fn delete_student(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let student = state.students.get(id).await?;
    state.students.delete(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "student",
            Some(student.student_id),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("Student deleted successfully.")))
}
