//! Course catalog route handlers
//!
//! Courses are addressed by their code ("CS101"). Seat counts are
//! derived server side, so responses wrap the model with the computed
//! `availableSeats` field.

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{validation_error, ApiResult};
use crate::models::{MessageResponse, SuccessResponse};
use crate::registrar::{Course, CourseFilter, CourseUpdate};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseRequest {
    #[validate(length(min = 2, max = 16, message = "Course code must be 2 to 16 characters"))]
    pub code: String,
    #[validate(length(min = 1, message = "Course name is required"))]
    pub name: String,
    #[validate(range(min = 1, max = 10, message = "Credits must be between 1 and 10"))]
    pub credits: u8,
    #[validate(length(min = 1, message = "Instructor is required"))]
    pub instructor: String,
    #[validate(length(min = 1, message = "Semester is required"))]
    pub semester: String,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: u32,
    pub category: Option<String>,
    pub course_type: Option<String>,
}

/// A course plus its derived seat availability
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    #[serde(flatten)]
    pub course: Course,
    pub available_seats: u32,
}

impl From<Course> for CourseView {
    fn from(course: Course) -> Self {
        let available_seats = course.available_seats();
        CourseView {
            course,
            available_seats,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListResponse {
    pub courses: Vec<CourseView>,
    pub count: usize,
    pub version: u64,
}

/// POST /api/courses
pub async fn create_course(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CourseView>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let now = Utc::now();
    let course = state
        .registrar
        .create_course(Course {
            code: payload.code,
            name: payload.name,
            credits: payload.credits,
            instructor: payload.instructor,
            semester: payload.semester,
            enrolled: 0,
            capacity: payload.capacity,
            category: payload.category.unwrap_or_else(|| "General".to_string()),
            course_type: payload.course_type.unwrap_or_else(|| "Core".to_string()),
            created_at: now,
            updated_at: now,
        })
        .await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Created,
            "course",
            Some(course.code.clone()),
            None,
        ))
        .await;

    info!("Created course {}", course.code);

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Course created successfully.",
            CourseView::from(course),
        )),
    ))
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<SharedState>,
    Query(filter): Query<CourseFilter>,
) -> ApiResult<Json<SuccessResponse<CourseListResponse>>> {
    let courses = state.registrar.list_courses(&filter).await;
    let version = state.registrar.version();
    let count = courses.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} course(s).", count),
        CourseListResponse {
            courses: courses.into_iter().map(CourseView::from).collect(),
            count,
            version,
        },
    )))
}

/// GET /api/courses/{code}
pub async fn get_course(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> ApiResult<Json<SuccessResponse<CourseView>>> {
    let course = state.registrar.get_course(&code).await?;

    Ok(Json(SuccessResponse::with_data(
        "Course retrieved successfully.",
        CourseView::from(course),
    )))
}

/// PUT /api/courses/{code}
pub async fn update_course(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
    Json(updates): Json<CourseUpdate>,
) -> ApiResult<Json<SuccessResponse<CourseView>>> {
    let course = state.registrar.update_course(&code, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "course",
            Some(course.code.clone()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "Course updated successfully.",
        CourseView::from(course),
    )))
}

/// DELETE /api/courses/{code}
pub async fn delete_course(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.registrar.delete_course(&code).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "course",
            Some(code.to_uppercase()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("Course deleted successfully.")))
}
