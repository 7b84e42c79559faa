//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::{Store, UserChanges, is_unique_violation};
use crate::domain::policy::{self, Mutation, Principal};
use crate::domain::weather::{Page, PageRequest};
use crate::domain::{Role, UserId};
use crate::services::user_service::{
    UpdateUser, UserError, UserProfile, UserService, UserSummary, UserValidation,
};

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    async fn load_target(&self, id: UserId) -> Result<Principal, UserError> {
        let target = self.store.get_user(id).await?.ok_or(UserError::NotFound)?;
        Ok(Principal::new(target.id, target.role))
    }

    async fn apply(&self, id: UserId, changes: UserChanges) -> Result<UserProfile, UserError> {
        match self.store.update_user(id, changes, &self.security).await {
            Ok(Some(user)) => Ok(user.into()),
            Ok(None) => Err(UserError::NotFound),
            Err(e) if is_unique_violation(&e) => Err(UserError::EmailInUse),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list(&self, request: PageRequest) -> Result<Page<UserProfile>, UserError> {
        let (users, total) = self.store.list_users_paginated(request).await?;
        Ok(Page::new(users, total, request).map(UserProfile::from))
    }

    async fn get(&self, actor: Principal, id: UserId) -> Result<UserProfile, UserError> {
        if actor.id != id && !actor.role.is_administrator() {
            return Err(UserError::AccessDenied);
        }

        self.store
            .get_user(id)
            .await?
            .map(UserProfile::from)
            .ok_or(UserError::NotFound)
    }

    async fn find_by_name(&self, name: &str) -> Result<UserSummary, UserError> {
        let user = self
            .store
            .get_user_by_name(name)
            .await?
            .ok_or(UserError::NotFound)?;

        Ok(UserSummary {
            id: user.id,
            name: user.name,
        })
    }

    async fn validate(&self, raw_id: &str) -> Result<UserValidation, UserError> {
        let Ok(id) = raw_id.parse::<UserId>() else {
            return Ok(UserValidation {
                user_id: raw_id.to_string(),
                is_valid: false,
                message: "Invalid user ID format".to_string(),
            });
        };

        let exists = self.store.get_user(id).await?.is_some();
        Ok(UserValidation {
            user_id: id.to_string(),
            is_valid: exists,
            message: if exists {
                "User exists".to_string()
            } else {
                "User not found".to_string()
            },
        })
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<UserProfile>, UserError> {
        let users = self.store.list_users_by_role(role).await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    async fn update(
        &self,
        actor: Principal,
        id: UserId,
        changes: UpdateUser,
    ) -> Result<UserProfile, UserError> {
        let target = self.load_target(id).await?;
        policy::authorize(actor, target, Mutation::Update { role: changes.role })?;

        let profile = self
            .apply(
                id,
                UserChanges {
                    name: changes.name,
                    email: changes.email,
                    password: changes.password,
                    role: changes.role,
                    approved: changes.approved,
                },
            )
            .await?;

        info!(actor = %actor.id, target = %id, "User updated");
        Ok(profile)
    }

    async fn delete(&self, actor: Principal, id: UserId) -> Result<(), UserError> {
        let target = self.load_target(id).await?;
        policy::authorize(actor, target, Mutation::Delete)?;

        if !self.store.delete_user(id).await? {
            return Err(UserError::NotFound);
        }

        info!(actor = %actor.id, target = %id, role = %target.role, "User deleted");
        Ok(())
    }

    async fn set_role(&self, email: &str, role: Role) -> Result<UserProfile, UserError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(UserError::NotFound)?;

        let profile = self
            .apply(
                user.id,
                UserChanges {
                    role: Some(role),
                    ..UserChanges::default()
                },
            )
            .await?;

        info!(user = %profile.id, %role, "Role assigned by operator");
        Ok(profile)
    }
}
