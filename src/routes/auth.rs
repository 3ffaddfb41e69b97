//! Authentication route handlers
//!
//! Login, self-registration and token refresh. Registration creates a
//! pending account and files a new_user request; the account cannot sign
//! in until an administrator approves that request.

use crate::auth::{
    create_tokens, hash_password, is_breached_password, refresh_tokens,
    validate_password_strength, verify_password, Claims, Role, TokenPair,
};
use crate::error::{validation_error, ApiResult, AppError};
use crate::models::SuccessResponse;
use crate::requests::{NewUserRequest, PortalRequest, RequestPayload, Requester};
use crate::state::SharedState;
use crate::users::{AccountStatus, User, UserResponse};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    /// Requested role; defaults to student, admin cannot be requested
    pub role: Option<Role>,
    pub department: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserResponse,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: UserResponse,
    /// The new_user request an administrator must approve
    pub request_id: Uuid,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let user = state
        .users
        .find_by_email(&payload.email)
        .await
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if user.account_status == AccountStatus::Pending {
        return Err(AppError::Forbidden(
            "Account is awaiting administrator approval".to_string(),
        ));
    }

    let tokens = create_tokens(user.id, &user.email, &user.name, user.role)?;
    info!("User {} signed in", user.email);

    Ok(Json(AuthResponse {
        success: true,
        user: UserResponse::from(user),
        tokens,
    }))
}

/// POST /api/auth/register
///
/// Creates a pending account and files the matching new_user request.
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<RegisterResponse>>)> {
    payload.validate().map_err(|e| validation_error(e.to_string()))?;

    let role = payload.role.unwrap_or(Role::Student);
    if role == Role::Admin {
        return Err(validation_error("Admin accounts cannot be self-registered"));
    }

    validate_password_strength(&payload.password)?;
    if is_breached_password(&payload.password) {
        return Err(validation_error(
            "Password appears in known breach data, choose another",
        ));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: payload.email.clone(),
        password_hash: hash_password(&payload.password)?,
        password_history: Vec::new(),
        name: payload.name.clone(),
        role,
        account_status: AccountStatus::Pending,
        department: payload.department.clone(),
        created_at: now,
        updated_at: now,
    };
    let user = state.users.create(user).await?;

    let request = state
        .requests
        .create(PortalRequest::new(
            Requester {
                name: payload.name,
                email: payload.email,
                student_id: None,
            },
            RequestPayload::NewUser(NewUserRequest {
                user_id: user.id,
                name: user.name.clone(),
                email: user.email.clone(),
                role,
                department: payload.department,
            }),
        ))
        .await?;

    info!(
        "Registered pending account {} (request {})",
        user.email, request.id
    );

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(
            "Registration received. An administrator will review your account.",
            RegisterResponse {
                user: UserResponse::from(user),
                request_id: request.id,
            },
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /api/auth/refresh
pub async fn refresh(
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = refresh_tokens(&payload.refresh_token)?;

    Ok(Json(TokenResponse {
        success: true,
        tokens,
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<UserResponse>>> {
    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    Ok(Json(SuccessResponse::with_data(
        "Authenticated.",
        UserResponse::from(user),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::state::AppState;
    use std::sync::Arc;

    fn test_state() -> SharedState {
        Arc::new(AppState::new(Settings::default()))
    }

    #[tokio::test]
    async fn test_register_creates_pending_account_and_request() {
        let state = test_state();
        let (status, Json(resp)) = register(
            State(state.clone()),
            Json(RegisterRequest {
                name: "Asha Verma".to_string(),
                email: "asha@students.campus.local".to_string(),
                password: "Orchid55Gate".to_string(),
                role: None,
                department: Some("Physics".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        let data = resp.data.unwrap();
        assert_eq!(data.user.account_status, AccountStatus::Pending);

        let request = state.requests.get(data.request_id).await.unwrap();
        assert_eq!(request.payload.kind(), "new_user");
    }

    #[tokio::test]
    async fn test_pending_account_cannot_login() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(RegisterRequest {
                name: "Asha Verma".to_string(),
                email: "asha@students.campus.local".to_string(),
                password: "Orchid55Gate".to_string(),
                role: None,
                department: None,
            }),
        )
        .await
        .unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "asha@students.campus.local".to_string(),
                password: "Orchid55Gate".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_register_refuses_breached_password() {
        let state = test_state();
        let err = register(
            State(state),
            Json(RegisterRequest {
                name: "Asha Verma".to_string(),
                email: "asha@students.campus.local".to_string(),
                password: "Password123".to_string(),
                role: None,
                department: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_register_refuses_admin_role() {
        let state = test_state();
        let err = register(
            State(state),
            Json(RegisterRequest {
                name: "Sly Fox".to_string(),
                email: "fox@campus.local".to_string(),
                password: "Orchid55Gate".to_string(),
                role: Some(Role::Admin),
                department: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
