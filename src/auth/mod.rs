//! Authentication and authorization module
//!
//! Provides JWT-based authentication and role-based access control.

mod jwt;
mod middleware;
mod password;

pub use jwt::{create_tokens, decode_token, refresh_tokens, Claims, TokenPair, TokenType};
pub use middleware::{auth_middleware, ensure_admin, require_admin};
pub use password::{
    hash_password, is_breached_password, is_previously_used, validate_password_strength,
    verify_password,
};

use serde::{Deserialize, Serialize};

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can view portal data and file requests
    Student,
    /// Can view portal data and file requests; listed as staff
    Teacher,
    /// Can create, update, delete and review
    Admin,
}

impl Role {
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
