//! Domain service for account management.
//!
//! Every mutation is checked against [`crate::domain::policy`] after the
//! target has been read from the store and before anything is written.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::policy::{Denial, Principal};
use crate::domain::weather::{Page, PageRequest};
use crate::domain::{Role, UserId};

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Denied(#[from] Denial),

    #[error("You do not have permission to access this user.")]
    AccessDenied,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public view of an account. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            approved: user.approved,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserValidation {
    pub user_id: String,
    pub is_valid: bool,
    pub message: String,
}

/// Already validated fields of a PATCH request.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub approved: Option<bool>,
}

/// Domain service trait for account management.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Lists accounts page by page, oldest first.
    async fn list(&self, request: PageRequest) -> Result<Page<UserProfile>, UserError>;

    /// Gets one account. Plain users may only read themselves.
    ///
    /// # Errors
    ///
    /// [`UserError::AccessDenied`] for a plain user reading someone else,
    /// [`UserError::NotFound`] for an unknown id.
    async fn get(&self, actor: Principal, id: UserId) -> Result<UserProfile, UserError>;

    async fn find_by_name(&self, name: &str) -> Result<UserSummary, UserError>;

    /// Reports whether `raw_id` names an existing account. Never fails on a
    /// malformed id.
    async fn validate(&self, raw_id: &str) -> Result<UserValidation, UserError>;

    async fn list_by_role(&self, role: Role) -> Result<Vec<UserProfile>, UserError>;

    /// Applies a partial update after the authorization check.
    ///
    /// # Errors
    ///
    /// [`UserError::Denied`] with the policy reason, [`UserError::NotFound`]
    /// or [`UserError::EmailInUse`].
    async fn update(
        &self,
        actor: Principal,
        id: UserId,
        changes: UpdateUser,
    ) -> Result<UserProfile, UserError>;

    /// Deletes an account after the authorization check.
    async fn delete(&self, actor: Principal, id: UserId) -> Result<(), UserError>;

    /// Operator path used by the CLI. Bypasses the mutation policy and is the
    /// only way to grant `admin-master`.
    async fn set_role(&self, email: &str, role: Role) -> Result<UserProfile, UserError>;
}
