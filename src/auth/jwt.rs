//! JWT token management
//!
//! Handles creation, validation, and refresh of JWT tokens. Claims carry the
//! portal session identity (`id`, `name`, `email`, `role`) so handlers never
//! reach for any other session state.

use crate::auth::Role;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT secret key (should be from environment in production)
static JWT_SECRET: Lazy<String> = Lazy::new(|| {
    std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "campus-portal-dev-secret-change-in-production".to_string())
});

/// Access token lifetime (15 minutes)
const ACCESS_TTL_MINUTES: i64 = 15;

/// Refresh token lifetime (7 days)
const REFRESH_TTL_DAYS: i64 = 7;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Display name
    pub name: String,
    /// User role
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token pair response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn issue(claims: &Claims) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

/// Create access and refresh tokens for a user
pub fn create_tokens(
    user_id: Uuid,
    email: &str,
    name: &str,
    role: Role,
) -> Result<TokenPair, AppError> {
    let now = Utc::now();
    let base = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.to_string(),
        role,
        exp: 0,
        iat: now.timestamp(),
        token_type: TokenType::Access,
    };

    let access_token = issue(&Claims {
        exp: (now + Duration::minutes(ACCESS_TTL_MINUTES)).timestamp(),
        ..base.clone()
    })?;
    let refresh_token = issue(&Claims {
        exp: (now + Duration::days(REFRESH_TTL_DAYS)).timestamp(),
        token_type: TokenType::Refresh,
        ..base
    })?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: ACCESS_TTL_MINUTES * 60,
    })
}

/// Decode and validate a JWT token
pub fn decode_token(token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidToken => {
            AppError::Unauthorized("Invalid token".to_string())
        }
        _ => AppError::Unauthorized(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Refresh tokens using a valid refresh token
pub fn refresh_tokens(refresh_token: &str) -> Result<TokenPair, AppError> {
    let claims = decode_token(refresh_token)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized(
            "Invalid token type for refresh".to_string(),
        ));
    }

    create_tokens(claims.sub, &claims.email, &claims.name, claims.role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_decode_roundtrip() {
        let id = Uuid::new_v4();
        let tokens = create_tokens(id, "warden@campus.local", "Warden", Role::Admin).unwrap();

        let claims = decode_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "warden@campus.local");
        assert_eq!(claims.name, "Warden");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_rejects_access_token() {
        let tokens =
            create_tokens(Uuid::new_v4(), "s@campus.local", "S", Role::Student).unwrap();
        let result = refresh_tokens(&tokens.access_token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_refresh_accepts_refresh_token() {
        let tokens =
            create_tokens(Uuid::new_v4(), "s@campus.local", "S", Role::Student).unwrap();
        assert!(refresh_tokens(&tokens.refresh_token).is_ok());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens =
            create_tokens(Uuid::new_v4(), "s@campus.local", "S", Role::Student).unwrap();
        let mut tampered = tokens.access_token.clone();
        tampered.push('x');
        assert!(decode_token(&tampered).is_err());
    }
}
