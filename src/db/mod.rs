use crate::config::SecurityConfig;
use crate::domain::weather::{PageRequest, WeatherFilter};
use crate::domain::{Role, UserId};
use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub mod migrator;
pub mod repositories;

pub use crate::entities::weather_logs::Model as WeatherLog;
pub use repositories::user::{NewUser, User, UserChanges};
pub use repositories::weather::NewWeatherLog;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
        let in_memory = path_str.starts_with(":memory:") || path_str.contains("mode=memory");

        if !in_memory {
            let file_path = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(file_path).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(file_path).exists() {
                std::fs::File::create(file_path)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        // Every pooled connection to `:memory:` is its own database.
        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn weather_repo(&self) -> repositories::weather::WeatherRepository {
        repositories::weather::WeatherRepository::new(self.conn.clone())
    }

    // ========== Accounts ==========

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.user_repo().get_by_name(name).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn create_user(&self, new_user: NewUser, security: &SecurityConfig) -> Result<User> {
        self.user_repo().create(new_user, security).await
    }

    pub async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
        security: &SecurityConfig,
    ) -> Result<Option<User>> {
        self.user_repo().update(id, changes, security).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.user_repo().list_by_role(role).await
    }

    pub async fn list_users_paginated(&self, request: PageRequest) -> Result<(Vec<User>, u64)> {
        self.user_repo().list_paginated(request).await
    }

    pub async fn verify_user_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_credentials(email, password).await
    }

    // ========== Weather logs ==========

    pub async fn add_weather_log(&self, log: NewWeatherLog) -> Result<WeatherLog> {
        self.weather_repo().create(log).await
    }

    pub async fn get_weather_log(&self, id: Uuid) -> Result<Option<WeatherLog>> {
        self.weather_repo().get_by_id(id).await
    }

    pub async fn get_weather_log_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<WeatherLog>> {
        self.weather_repo().get_by_external_id(external_id).await
    }

    pub async fn find_weather_logs(
        &self,
        filter: &WeatherFilter,
        request: PageRequest,
    ) -> Result<(Vec<WeatherLog>, u64)> {
        self.weather_repo().find_filtered(filter, request).await
    }

    pub async fn find_all_weather_logs(&self, filter: &WeatherFilter) -> Result<Vec<WeatherLog>> {
        self.weather_repo().find_all_filtered(filter).await
    }
}

/// Whether `err` was caused by a unique index rejecting a write.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<DbErr>())
        .any(|db_err| matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))))
}
