//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::auth::TokenService;
use crate::config::SecurityConfig;
use crate::db::{NewUser, Store, User, is_unique_violation};
use crate::domain::policy::Principal;
use crate::domain::{Role, UserId};
use crate::services::auth_service::{
    AuthError, AuthService, AuthSession, AuthenticatedUser, Registration,
};
use crate::services::user_service::UserProfile;

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenService,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, tokens: TokenService, security: SecurityConfig) -> Self {
        Self {
            store,
            tokens,
            security,
        }
    }

    async fn create(&self, registration: Registration, role: Role) -> Result<User, AuthError> {
        let new_user = NewUser {
            name: registration.name,
            email: registration.email,
            password: registration.password,
            role,
        };

        match self.store.create_user(new_user, &self.security).await {
            Ok(user) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(AuthError::EmailInUse),
            Err(e) => Err(e.into()),
        }
    }

    fn session(&self, user: User) -> Result<AuthSession, AuthError> {
        let access_token = self.tokens.issue(user.id, &user.email, user.role)?;
        Ok(AuthSession {
            access_token,
            user: user.into(),
        })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        // The count and the insert are separate statements; two simultaneous
        // first registrations may both become admin.
        let role = if self.store.count_users().await? == 0 {
            Role::Admin
        } else {
            Role::User
        };

        let user = self.create(registration, role).await?;
        info!(user = %user.id, %role, "User registered");

        self.session(user)
    }

    async fn register_admin(&self, registration: Registration) -> Result<UserProfile, AuthError> {
        let user = self.create(registration, Role::Admin).await?;
        info!(user = %user.id, "Administrator registered");
        Ok(user.into())
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let Some(user) = self.store.verify_user_credentials(email, password).await? else {
            warn!("Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        self.session(user)
    }

    async fn is_first_user(&self) -> Result<bool, AuthError> {
        Ok(self.store.count_users().await? == 0)
    }

    async fn me(&self, id: UserId) -> Result<UserProfile, AuthError> {
        self.store
            .get_user(id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }

    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.tokens.verify(token)?;

        let user = self
            .store
            .get_user(claims.sub)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
            principal: Principal::new(user.id, user.role),
        })
    }
}
