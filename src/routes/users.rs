//! User management route handlers

use crate::audit::{AuditAction, AuditEntry};
use crate::auth::{
    ensure_admin, hash_password, is_breached_password, is_previously_used,
    validate_password_strength, verify_password, Claims, Role,
};
use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{MessageResponse, SuccessResponse};
use crate::state::SharedState;
use crate::users::{AccountStatus, UserResponse, UserUpdate};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub count: usize,
    pub version: u64,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<SharedState>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<SuccessResponse<UserListResponse>>> {
    let users = state.users.list(query.role, query.status).await;
    let version = state.users.version();
    let count = users.len();

    Ok(Json(SuccessResponse::with_data(
        format!("Found {} user(s).", count),
        UserListResponse {
            users,
            count,
            version,
        },
    )))
}

/// GET /api/users/pending
pub async fn pending_users(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<UserListResponse>>> {
    let users = state.users.list(None, Some(AccountStatus::Pending)).await;
    let version = state.users.version();
    let count = users.len();

    Ok(Json(SuccessResponse::with_data(
        format!("{} account(s) awaiting approval.", count),
        UserListResponse {
            users,
            count,
            version,
        },
    )))
}

/// GET /api/users/{id}
///
/// Users can fetch their own record; anything else requires admin.
pub async fn get_user(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    if claims.sub != id {
        ensure_admin(&claims)?;
    }

    let user = state
        .users
        .find_by_id(id)
        .await
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(SuccessResponse::with_data(
        "User retrieved successfully.",
        UserResponse::from(user),
    )))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(updates): Json<UserUpdate>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    let user = state.users.update(id, updates).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::Updated,
            "user",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(SuccessResponse::with_data(
        "User updated successfully.",
        UserResponse::from(user),
    )))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    if claims.sub == id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    state.users.delete(id).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::AccountDeleted,
            "user",
            Some(id.to_string()),
            None,
        ))
        .await;

    Ok(Json(MessageResponse::new("User deleted successfully.")))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

/// POST /api/users/{id}/password
///
/// All checks run server side: current-password proof, structural rules,
/// breach screening, then reuse against the recorded history.
pub async fn change_password(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if claims.sub != id {
        return Err(AppError::Forbidden(
            "You can only change your own password".to_string(),
        ));
    }
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let user = state
        .users
        .find_by_id(id)
        .await
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    validate_password_strength(&payload.new_password)?;
    if is_breached_password(&payload.new_password) {
        return Err(validation_error(
            "Password appears in known breach data, choose another",
        ));
    }
    if is_previously_used(
        &payload.new_password,
        &user.password_hash,
        &user.password_history,
    )? {
        return Err(validation_error(
            "Password was used recently, choose one you have not used before",
        ));
    }

    let new_hash = hash_password(&payload.new_password)?;
    state.users.change_password(id, new_hash).await?;

    state
        .audit
        .record(AuditEntry::new(
            Some(claims.sub),
            AuditAction::PasswordChanged,
            "user",
            Some(id.to_string()),
            None,
        ))
        .await;

    info!("Password changed for user {}", user.email);

    Ok(Json(MessageResponse::new("Password changed successfully.")))
}
