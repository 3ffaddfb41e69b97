//! User management module
//!
//! Handles user accounts for the portal. Accounts created through
//! self-registration start in `Pending` status and only become usable
//! after an administrator approves the matching account request.

use crate::auth::Role;
use crate::config::AuthConfig;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// How many superseded password hashes are kept for the reuse check
pub const PASSWORD_HISTORY_LIMIT: usize = 5;

/// Account lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Registered but awaiting administrator approval
    Pending,
    /// Approved and allowed to sign in
    Active,
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Superseded hashes, newest first
    #[serde(skip_serializing, default)]
    pub password_history: Vec<String>,
    pub name: String,
    pub role: Role,
    pub account_status: AccountStatus,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User response (without sensitive data)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub account_status: AccountStatus,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            account_status: user.account_status,
            department: user.department,
            created_at: user.created_at,
        }
    }
}

/// User update payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
}

#[derive(Default)]
struct UserMaps {
    users: HashMap<Uuid, User>,
    /// Lowercased email -> user id
    email_index: HashMap<String, Uuid>,
}

/// In-memory user store
///
/// Both maps live behind one lock so the email-uniqueness check and the
/// insert happen under the same write guard.
pub struct UserStore {
    inner: RwLock<UserMaps>,
    version: AtomicU64,
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(UserMaps::default()),
            version: AtomicU64::new(0),
        }
    }

    /// Monotonic counter bumped on every successful mutation
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Create a new user
    pub async fn create(&self, user: User) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;

        let key = email_key(&user.email);
        if inner.email_index.contains_key(&key) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        inner.email_index.insert(key, user.id);
        inner.users.insert(user.id, user.clone());
        self.bump();

        Ok(user)
    }

    /// Find user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.read().await;
        inner
            .email_index
            .get(&email_key(email))
            .and_then(|id| inner.users.get(id).cloned())
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Option<User> {
        let inner = self.inner.read().await;
        inner.users.get(&id).cloned()
    }

    /// List users, newest first, optionally filtered by role and status
    pub async fn list(
        &self,
        role: Option<Role>,
        status: Option<AccountStatus>,
    ) -> Vec<UserResponse> {
        let inner = self.inner.read().await;
        let mut users: Vec<UserResponse> = inner
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .filter(|u| status.map_or(true, |s| u.account_status == s))
            .cloned()
            .map(UserResponse::from)
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        users
    }

    /// Update profile fields
    pub async fn update(&self, id: Uuid, updates: UserUpdate) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;

        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(name) = updates.name {
            user.name = name;
        }
        if let Some(role) = updates.role {
            user.role = role;
        }
        if let Some(department) = updates.department {
            user.department = Some(department);
        }

        user.updated_at = Utc::now();
        let user = user.clone();
        self.bump();

        Ok(user)
    }

    /// Replace the password hash, retiring the old one into the history
    pub async fn change_password(&self, id: Uuid, new_hash: String) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let old_hash = std::mem::replace(&mut user.password_hash, new_hash);
        user.password_history.insert(0, old_hash);
        user.password_history.truncate(PASSWORD_HISTORY_LIMIT);
        user.updated_at = Utc::now();
        self.bump();

        Ok(())
    }

    /// Flip a pending account to active
    pub async fn activate(&self, id: Uuid) -> Result<User, AppError> {
        let mut inner = self.inner.write().await;

        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        user.account_status = AccountStatus::Active;
        user.updated_at = Utc::now();
        let user = user.clone();
        self.bump();

        Ok(user)
    }

    /// Delete user
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;

        let user = inner
            .users
            .remove(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        inner.email_index.remove(&email_key(&user.email));
        self.bump();

        Ok(())
    }

    /// Seed the administrator account from configuration
    pub async fn init_default_admin(&self, auth: &AuthConfig) -> Result<(), AppError> {
        use crate::auth::hash_password;

        let admin = User {
            id: Uuid::new_v4(),
            email: auth.admin_email.clone(),
            password_hash: hash_password(&auth.admin_password)?,
            password_history: Vec::new(),
            name: auth.admin_name.clone(),
            role: Role::Admin,
            account_status: AccountStatus::Active,
            department: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // Ignore error if already exists
        let _ = self.create(admin).await;

        Ok(())
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
