//! Password hashing and verification
//!
//! Uses bcrypt for secure password hashing. Also hosts the password-change
//! gate: structural strength rules, a known-breach digest check, and a
//! previous-password check against the account's hash history. A change is
//! blocked unless all three pass.

use crate::error::AppError;
use bcrypt::{hash, verify, DEFAULT_COST};
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Passwords seen in public breach corpora, held as SHA-256 digests so the
/// set can be swapped for a full dump file without touching the check.
static BREACHED_DIGESTS: Lazy<HashSet<[u8; 32]>> = Lazy::new(|| {
    const KNOWN_BREACHED: &[&str] = &[
        "password", "Password1", "Password123", "password1", "password123",
        "12345678", "123456789", "1234567890", "qwerty123", "Qwerty123",
        "abc12345", "Abc12345", "iloveyou1", "Iloveyou1", "welcome123",
        "Welcome123", "letmein123", "Letmein123", "admin123", "Admin123",
        "sunshine1", "Sunshine1", "football1", "Football1", "princess1",
        "Princess1", "Passw0rd", "P@ssw0rd", "dragon123", "Dragon123",
        "monkey123", "Monkey123", "baseball1", "Baseball1", "superman1",
        "Superman1",
    ];

    KNOWN_BREACHED.iter().map(|p| sha256_digest(p)).collect()
});

fn sha256_digest(password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
}

/// Structural password rules: at least 8 characters with an uppercase
/// letter, a lowercase letter and a digit. The failing rule is named in
/// the error so the portal can show it directly.
pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(
            "Password must contain an uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::Validation(
            "Password must contain a lowercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Password must contain a digit".to_string(),
        ));
    }
    Ok(())
}

/// Whether the password appears in the known-breach digest set
pub fn is_breached_password(password: &str) -> bool {
    BREACHED_DIGESTS.contains(&sha256_digest(password))
}

/// Whether the candidate matches the account's current or any previous hash
pub fn is_previously_used(
    candidate: &str,
    current_hash: &str,
    history: &[String],
) -> Result<bool, AppError> {
    if verify_password(candidate, current_hash)? {
        return Ok(true);
    }
    for old_hash in history {
        if verify_password(candidate, old_hash)? {
            return Ok(true);
        }
    }
    Ok(false)
}
