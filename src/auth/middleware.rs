//! Authentication middleware
//!
//! Extracts and validates JWT tokens from requests, and gates the
//! admin-only route groups.

use crate::auth::{decode_token, Claims};
use crate::error::AppError;
use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

/// Extract claims from the bearer token and stash them in request
/// extensions for handlers to use
pub async fn auth_middleware(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(auth) = bearer
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let claims = decode_token(auth.token())?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Route-level admin gate, layered after `auth_middleware`
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    ensure_admin(claims)?;

    Ok(next.run(request).await)
}

/// Handler-level admin check for routes that are only partially restricted
pub fn ensure_admin(claims: &Claims) -> Result<(), AppError> {
    if !claims.role.can_manage() {
        return Err(AppError::Forbidden(format!(
            "Requires admin role, you have {}",
            claims.role
        )));
    }
    Ok(())
}
