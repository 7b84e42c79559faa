//! Account management endpoints.
//!
//! Authorization for PATCH and DELETE is decided by the account mutation
//! policy inside [`crate::services::UserService`]; the handlers only validate
//! input and translate errors.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthUser;
use super::validation::{validate_email, validate_name, validate_page_request, validate_password};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::weather::Page;
use crate::domain::{Role, UserId};
use crate::services::user_service::{UserSummary, UserValidation};
use crate::services::{UpdateUser, UserError, UserProfile};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub approved: Option<bool>,
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::not_found("User"),
            UserError::Denied(denial) => Self::forbidden(denial.to_string()),
            UserError::AccessDenied => Self::forbidden(err.to_string()),
            UserError::EmailInUse => Self::Conflict(err.to_string()),
            UserError::Validation(msg) => Self::validation(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::internal(msg),
        }
    }
}

fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation(format!("Invalid user ID: {raw}")))
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse().map_err(|e: crate::domain::UnknownRole| ApiError::validation(e.to_string()))
}

impl UpdateUserRequest {
    fn into_changes(self) -> Result<UpdateUser, ApiError> {
        Ok(UpdateUser {
            name: self
                .name
                .as_deref()
                .map(validate_name)
                .transpose()?
                .map(str::to_string),
            email: self
                .email
                .as_deref()
                .map(validate_email)
                .transpose()?
                .map(str::to_string),
            password: self
                .password
                .as_deref()
                .map(validate_password)
                .transpose()?
                .map(str::to_string),
            role: self.role.as_deref().map(parse_role).transpose()?,
            approved: self.approved,
        })
    }
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ApiResponse<Page<UserProfile>>>, ApiError> {
    let request = validate_page_request(query.page, query.limit)?;
    let page = state.user_service().list(request).await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let id = parse_user_id(&id)?;
    let user = state.user_service().get(actor.principal(), id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let id = parse_user_id(&id)?;
    let changes = payload.into_changes()?;

    let user = state
        .user_service()
        .update(actor.principal(), id, changes)
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = parse_user_id(&id)?;
    state.user_service().delete(actor.principal(), id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    ))))
}

/// GET /users/name/{name}
pub async fn find_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<UserSummary>>, ApiError> {
    let name = validate_name(&name)?;
    let user = state.user_service().find_by_name(name).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// GET /users/validate/{id}
pub async fn validate_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserValidation>>, ApiError> {
    let result = state.user_service().validate(&id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /users/role/{role}
pub async fn list_by_role(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>, ApiError> {
    let role = parse_role(&role)?;
    let users = state.user_service().list_by_role(role).await?;
    Ok(Json(ApiResponse::success(users)))
}
