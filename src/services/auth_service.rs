//! Domain service for authentication.
//!
//! Handles registration, login and resolving bearer tokens back to accounts.

use serde::Serialize;
use thiserror::Error;

use crate::auth::TokenError;
use crate::domain::UserId;
use crate::domain::policy::Principal;
use crate::services::user_service::UserProfile;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already in use")]
    EmailInUse,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Already validated registration payload.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Issued access token together with the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: UserProfile,
}

/// The account behind a verified bearer token, with its current role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
    pub principal: Principal,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Self-registration. The very first account becomes `admin`, every later
    /// one `user`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailInUse`] for a duplicate email.
    async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError>;

    /// Creates an account with role `admin`. Callers must already have checked
    /// that the requester is an administrator.
    async fn register_admin(&self, registration: Registration) -> Result<UserProfile, AuthError>;

    /// Verifies credentials and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Whether no account exists yet.
    async fn is_first_user(&self) -> Result<bool, AuthError>;

    /// Gets the current account.
    async fn me(&self, id: UserId) -> Result<UserProfile, AuthError>;

    /// Verifies a bearer token and re-reads the account it names, so that
    /// role changes and deletions take effect immediately.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] if the account no longer exists and
    /// [`AuthError::Token`] if the token is invalid or expired.
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
