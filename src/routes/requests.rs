//! Request route handlers
//!
//! Students file requests; administrators resolve them. Approval applies
//! the matching side effect (lend a book, enroll a student, activate an
//! account). If the side effect fails the request is reopened so it can
//! be resolved again once the conflict clears.

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::Claims;
use crate::error::{conflict_error, validation_error, ApiResult, AppError};
use crate::models::{MessageResponse, SuccessResponse};
use crate::requests::{PortalRequest, RequestFilter, RequestPayload, RequestStatus, Requester};
use crate::state::SharedState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    #[validate(length(min = 1, message = "Requester name is required"))]
    pub requester_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub requester_email: String,
    pub student_id: Option<String>,
    #[serde(flatten)]
    pub payload: RequestPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestListResponse {
    pub requests: Vec<PortalRequest>,
    pub count: usize,
    pub version: u64,
}

fn require_student(body: &CreateRequestBody) -> Result<(), AppError> {
    if body.student_id.as_deref().map_or(true, |s| s.is_empty()) {
        return Err(validation_error(
            "This request type needs a student ID".to_string(),
        ));
    }
    Ok(())
}

/// Checks a request can plausibly be approved before it is filed.
/// A borrow request for a book with no available copies is refused
/// outright instead of parking in the admin queue.
async fn vet_new_request(state: &SharedState, body: &CreateRequestBody) -> Result<(), AppError> {
    match &body.payload {
        RequestPayload::Borrow(borrow) => {
            require_student(body)?;
            let book = state.library.get_book(borrow.book_id).await?;
            if book.available_copies == 0 {
                return Err(conflict_error(format!(
                    "No copies of \"{}\" available",
                    book.title
                )));
            }
        }
        RequestPayload::Return(ret) => {
            state.library.get_borrowing(ret.borrowing_id).await?;
        }
        RequestPayload::Enroll(enroll) => {
            require_student(body)?;
            state.registrar.get_course(&enroll.course_code).await?;
        }
        RequestPayload::Unenroll(unenroll) => {
            require_student(body)?;
            state.registrar.get_course(&unenroll.course_code).await?;
        }
        RequestPayload::Support(_) => {}
        RequestPayload::NewUser(_) => {
            return Err(validation_error(
                "Account requests are filed automatically at registration",
            ));
        }
    }
    Ok(())
}

/// POST /api/requests
pub async fn create_request(
    State(state): State<SharedState>,
    Json(body): Json<CreateRequestBody>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<PortalRequest>>)> {
    body.validate().map_err(|e| validation_error(e.to_string()))?;
    vet_new_request(&state, &body).await?;

    let request = state
        .requests
        .create(PortalRequest::new(
            Requester {
                name: body.requester_name,
                email: body.requester_email,
                student_id: body.student_id,
            },
            body.payload,
        ))
        .await?;

    info!(
        "Filed {} request {} from {}",
        request.payload.kind(),
        request.id,
        request.requester.email
    );

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Request submitted successfully.",
            request,
        )),
    ))
}

/// GET /api/requests
pub async fn list_requests(
    State(state): State<SharedState>,
    Query(filter): Query<RequestFilter>,
) -> ApiResult<Json<SuccessResponse<RequestListResponse>>> {
    let requests = state.requests.list(&filter).await;
    let version = state.requests.version();
    let count = requests.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} request(s).", count),
        RequestListResponse {
            requests,
            count,
            version,
        },
    )))
}

/// GET /api/requests/{id}
pub async fn get_request(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<PortalRequest>>> {
    let request = state.requests.get(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Request retrieved successfully.",
        request,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatusBody {
    pub status: RequestStatus,
    pub note: Option<String>,
}

/// A resolved request plus what the approval produced, if anything
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResponse {
    pub request: PortalRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<serde_json::Value>,
}

fn requester_student(request: &PortalRequest) -> Result<String, AppError> {
    request
        .requester
        .student_id
        .clone()
        .ok_or_else(|| AppError::BadRequest("Request has no student ID to act on".to_string()))
}

/// Runs the side effect for an approved request. Errors here mean the
/// approval must be rolled back to pending.
async fn apply_approval(
    state: &SharedState,
    request: &PortalRequest,
    resolver: Uuid,
) -> Result<Option<serde_json::Value>, AppError> {
    match &request.payload {
        RequestPayload::Borrow(borrow) => {
            let student_id = requester_student(request)?;
            let borrowing = state.library.borrow(&student_id, borrow.book_id, None).await?;
            Ok(Some(json!({
                "borrowingId": borrowing.id,
                "dueDate": borrowing.due_date,
            })))
        }
        RequestPayload::Return(ret) => {
            let borrowing = state.library.return_borrowing(ret.borrowing_id).await?;
            Ok(Some(json!({"borrowingId": borrowing.id})))
        }
        RequestPayload::Enroll(enroll) => {
            let student_id = requester_student(request)?;
            let enrollment = state.registrar.enroll(&student_id, &enroll.course_code).await?;
            Ok(Some(json!({"enrollmentId": enrollment.id})))
        }
        RequestPayload::Unenroll(unenroll) => {
            let student_id = requester_student(request)?;
            let enrollment = state
                .registrar
                .unenroll_student(&student_id, &unenroll.course_code)
                .await?;
            Ok(Some(json!({"enrollmentId": enrollment.id})))
        }
        RequestPayload::Support(_) => Ok(None),
        RequestPayload::NewUser(new_user) => {
            let user = state.users.activate(new_user.user_id).await?;
            state
                .audit
                .record(AuditEntry::new(
                    Some(resolver),
                    AuditAction::AccountActivated,
                    "user",
                    Some(user.id.to_string()),
                    None,
                ))
                .await;
            Ok(Some(json!({"activatedUserId": user.id})))
        }
    }
}

/// Rejection cleanup. A rejected account request deletes the pending
/// account; the account already being gone is not an error.
async fn apply_rejection(state: &SharedState, request: &PortalRequest) {
    if let RequestPayload::NewUser(new_user) = &request.payload {
        if let Err(err) = state.users.delete(new_user.user_id).await {
            warn!(
                "Pending account {} was already removed: {}",
                new_user.user_id, err
            );
        }
    }
}

/// PATCH /api/requests/{id}/status
pub async fn update_request_status(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(body): Json<RequestStatusBody>,
) -> ApiResult<Json<SuccessResponse<ResolutionResponse>>> {
    if body.status == RequestStatus::Rejected
        && body.note.as_deref().map_or(true, |n| n.trim().is_empty())
    {
        return Err(AppError::BadRequest(
            "A note explaining the rejection is required".to_string(),
        ));
    }

    let request = state
        .requests
        .resolve(id, body.status, body.note, claims.sub)
        .await?;

    let outcome = match request.status {
        RequestStatus::Approved => match apply_approval(&state, &request, claims.sub).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(reopen_err) = state.requests.reopen(id).await {
                    warn!("Could not reopen request {}: {}", id, reopen_err);
                }
                return Err(err);
            }
        },
        RequestStatus::Rejected => {
            apply_rejection(&state, &request).await;
            None
        }
        // resolve() refuses a pending decision
        RequestStatus::Pending => None,
    };

    let action = if request.status == RequestStatus::Approved {
        AuditAction::RequestApproved
    } else {
        AuditAction::RequestRejected
    };
    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            action,
            "request",
            Some(request.id.to_string()),
            Some(json!({"kind": request.payload.kind(), "outcome": outcome})),
        ))
        .await;

    let message = if request.status == RequestStatus::Approved {
        "Request approved."
    } else {
        "Request rejected."
    };

    Ok(Json(SuccessResponse::with_data(
        message,
        ResolutionResponse { request, outcome },
    )))
}

/// DELETE /api/requests/{id}
pub async fn delete_request(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.requests.delete(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Deleted,
            "request",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("Request deleted successfully.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, Role, TokenType};
    use crate::config::Settings;
    use crate::library::{Book, BORROW_PERIOD_DAYS};
    use crate::registrar::Course;
    use crate::requests::BorrowRequest;
    use crate::state::AppState;
    use crate::users::{AccountStatus, User};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn admin_claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "admin@campus.local".to_string(),
            name: "Portal Administrator".to_string(),
            role: Role::Admin,
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
            token_type: TokenType::Access,
        }
    }

    fn test_state() -> SharedState {
        Arc::new(AppState::new(Settings::default()))
    }

    async fn seed_book(state: &SharedState, title: &str, copies: u32) -> Book {
        let now = Utc::now();
        state
            .library
            .add_book(Book {
                id: Uuid::new_v4(),
                title: title.to_string(),
                author: "Anon".to_string(),
                isbn: "978-0000000000".to_string(),
                category: "General".to_string(),
                total_copies: copies,
                available_copies: copies,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    async fn seed_course(state: &SharedState, code: &str, capacity: u32) -> Course {
        let now = Utc::now();
        state
            .registrar
            .create_course(Course {
                code: code.to_string(),
                name: "Sample".to_string(),
                credits: 4,
                instructor: "Dr. Rao".to_string(),
                semester: "Fall 2025".to_string(),
                enrolled: 0,
                capacity,
                category: "Core".to_string(),
                course_type: "Lecture".to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    fn borrow_body(book_id: Uuid) -> CreateRequestBody {
        CreateRequestBody {
            requester_name: "Asha Verma".to_string(),
            requester_email: "asha@students.campus.local".to_string(),
            student_id: Some("STU-1024".to_string()),
            payload: RequestPayload::Borrow(BorrowRequest { book_id }),
        }
    }

    #[tokio::test]
    async fn test_borrow_request_refused_when_no_copies() {
        let state = test_state();
        let book = seed_book(&state, "Dune", 1).await;
        state.library.borrow("STU-2000", book.id, None).await.unwrap();

        let err = create_request(State(state.clone()), Json(borrow_body(book.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Nothing was filed
        let requests = state.requests.list(&RequestFilter::default()).await;
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_approving_borrow_request_lends_the_book() {
        let state = test_state();
        let book = seed_book(&state, "Dune", 2).await;

        let (_, Json(created)) = create_request(State(state.clone()), Json(borrow_body(book.id)))
            .await
            .unwrap();
        let request_id = created.data.unwrap().id;

        let Json(resolved) = update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(request_id),
            Json(RequestStatusBody {
                status: RequestStatus::Approved,
                note: None,
            }),
        )
        .await
        .unwrap();

        let data = resolved.data.unwrap();
        assert_eq!(data.request.status, RequestStatus::Approved);
        let outcome = data.outcome.unwrap();
        let borrowing_id: Uuid =
            serde_json::from_value(outcome["borrowingId"].clone()).unwrap();

        let borrowing = state.library.get_borrowing(borrowing_id).await.unwrap();
        assert_eq!(borrowing.student_id, "STU-1024");
        assert_eq!(
            borrowing.due_date,
            borrowing.borrow_date + Duration::days(BORROW_PERIOD_DAYS)
        );
        assert_eq!(state.library.available_copies(book.id).await, Some(1));
    }

    #[tokio::test]
    async fn test_double_return_approval_conflicts_and_reopens() {
        let state = test_state();
        let book = seed_book(&state, "Dune", 1).await;
        let borrowing = state
            .library
            .borrow("STU-1024", book.id, None)
            .await
            .unwrap();

        fn return_body(borrowing_id: Uuid) -> CreateRequestBody {
            CreateRequestBody {
                requester_name: "Asha Verma".to_string(),
                requester_email: "asha@students.campus.local".to_string(),
                student_id: Some("STU-1024".to_string()),
                payload: RequestPayload::Return(crate::requests::ReturnRequest {
                    borrowing_id,
                }),
            }
        }
        let (_, Json(first)) = create_request(State(state.clone()), Json(return_body(borrowing.id)))
            .await
            .unwrap();
        let (_, Json(second)) = create_request(State(state.clone()), Json(return_body(borrowing.id)))
            .await
            .unwrap();
        let first_id = first.data.unwrap().id;
        let second_id = second.data.unwrap().id;

        update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(first_id),
            Json(RequestStatusBody {
                status: RequestStatus::Approved,
                note: None,
            }),
        )
        .await
        .unwrap();

        let err = update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(second_id),
            Json(RequestStatusBody {
                status: RequestStatus::Approved,
                note: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The failed approval rolled back to pending
        let second = state.requests.get(second_id).await.unwrap();
        assert_eq!(second.status, RequestStatus::Pending);
        assert!(second.resolved_at.is_none());
    }

    #[tokio::test]
    async fn test_approving_enroll_request_into_full_course_reopens() {
        let state = test_state();
        seed_course(&state, "CS101", 1).await;
        state.registrar.enroll("STU-9000", "CS101").await.unwrap();

        let body = CreateRequestBody {
            requester_name: "Asha Verma".to_string(),
            requester_email: "asha@students.campus.local".to_string(),
            student_id: Some("STU-1024".to_string()),
            payload: RequestPayload::Enroll(crate::requests::EnrollRequest {
                course_code: "CS101".to_string(),
            }),
        };
        let (_, Json(created)) = create_request(State(state.clone()), Json(body))
            .await
            .unwrap();
        let request_id = created.data.unwrap().id;

        let err = update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(request_id),
            Json(RequestStatusBody {
                status: RequestStatus::Approved,
                note: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let request = state.requests.get(request_id).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
    }

    async fn seed_pending_account(state: &SharedState) -> (User, PortalRequest) {
        let now = Utc::now();
        let user = state
            .users
            .create(User {
                id: Uuid::new_v4(),
                email: "asha@students.campus.local".to_string(),
                password_hash: hash_password("Orchid55Gate").unwrap(),
                password_history: Vec::new(),
                name: "Asha Verma".to_string(),
                role: Role::Student,
                account_status: AccountStatus::Pending,
                department: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let request = state
            .requests
            .create(PortalRequest::new(
                Requester {
                    name: user.name.clone(),
                    email: user.email.clone(),
                    student_id: None,
                },
                RequestPayload::NewUser(crate::requests::NewUserRequest {
                    user_id: user.id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                    role: user.role,
                    department: None,
                }),
            ))
            .await
            .unwrap();

        (user, request)
    }

    #[tokio::test]
    async fn test_approving_account_request_activates_user() {
        let state = test_state();
        let (user, request) = seed_pending_account(&state).await;

        let Json(resolved) = update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(request.id),
            Json(RequestStatusBody {
                status: RequestStatus::Approved,
                note: None,
            }),
        )
        .await
        .unwrap();

        let data = resolved.data.unwrap();
        let outcome = data.outcome.unwrap();
        assert_eq!(outcome["activatedUserId"], json!(user.id));

        let user = state.users.find_by_id(user.id).await.unwrap();
        assert_eq!(user.account_status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_rejecting_account_request_needs_note_and_deletes_account() {
        let state = test_state();
        let (user, request) = seed_pending_account(&state).await;

        // No note, no rejection
        let err = update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(request.id),
            Json(RequestStatusBody {
                status: RequestStatus::Rejected,
                note: Some("   ".to_string()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let Json(resolved) = update_request_status(
            State(state.clone()),
            Extension(admin_claims()),
            Path(request.id),
            Json(RequestStatusBody {
                status: RequestStatus::Rejected,
                note: Some("Duplicate of an existing account".to_string()),
            }),
        )
        .await
        .unwrap();

        let data = resolved.data.unwrap();
        assert_eq!(data.request.status, RequestStatus::Rejected);
        assert_eq!(
            data.request.admin_note.as_deref(),
            Some("Duplicate of an existing account")
        );
        assert!(state.users.find_by_id(user.id).await.is_none());
    }

    #[tokio::test]
    async fn test_manual_account_request_refused() {
        let state = test_state();
        let body = CreateRequestBody {
            requester_name: "Sly Fox".to_string(),
            requester_email: "fox@campus.local".to_string(),
            student_id: None,
            payload: RequestPayload::NewUser(crate::requests::NewUserRequest {
                user_id: Uuid::new_v4(),
                name: "Sly Fox".to_string(),
                email: "fox@campus.local".to_string(),
                role: Role::Admin,
                department: None,
            }),
        };

        let err = create_request(State(state), Json(body)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
