use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::validation::{validate_email, validate_name, validate_password};
use super::{ApiError, ApiResponse, AppState};
use crate::domain::policy::Principal;
use crate::domain::{Role, UserId};
use crate::services::{AuthError, AuthSession, AuthenticatedUser, Registration, UserProfile};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterAdminResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstUserResponse {
    pub is_first_user: bool,
}

/// The caller of a protected route, as inserted by [`auth_middleware`].
/// The role is the one currently stored, not the one in the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }
}

impl From<AuthenticatedUser> for AuthUser {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.principal.role,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid credentials"),
            AuthError::Unauthorized | AuthError::Token(_) => Self::unauthorized("Unauthorized"),
            AuthError::EmailInUse => Self::Conflict(err.to_string()),
            AuthError::UserNotFound => Self::not_found("User"),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

fn registration(payload: RegisterRequest) -> Result<Registration, ApiError> {
    Ok(Registration {
        name: validate_name(&payload.name)?.to_string(),
        email: validate_email(&payload.email)?.to_string(),
        password: validate_password(&payload.password)?.to_string(),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires `Authorization: Bearer <jwt>` and re-reads the account it names.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let user = state
        .auth_service()
        .authenticate(token)
        .await
        .map_err(|e| match e {
            AuthError::Database(_) | AuthError::Internal(_) => ApiError::from(e),
            _ => ApiError::unauthorized("Invalid or expired token"),
        })?;

    tracing::Span::current().record("user_id", tracing::field::display(&user.id));
    request.extensions_mut().insert(AuthUser::from(user));

    Ok(next.run(request).await)
}

/// Allows only `admin` and `admin-master`. Must run inside [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = request
        .extensions()
        .get::<AuthUser>()
        .is_some_and(|user| user.role.is_administrator());

    if !is_admin {
        return Err(ApiError::forbidden("Administrator access required"));
    }

    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Self-registration; the first account ever created becomes admin
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthSession>>), ApiError> {
    let session = state
        .auth_service()
        .register(registration(payload)?)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// POST /auth/register-admin
/// Create an administrator account (administrators only)
pub async fn register_admin(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterAdminResponse>>), ApiError> {
    let user = state
        .auth_service()
        .register_admin(registration(payload)?)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisterAdminResponse {
            message: "Admin user created successfully".to_string(),
            user,
        })),
    ))
}

/// POST /auth/login
/// Authenticate with email and password, returns an access token on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state
        .auth_service()
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(session)))
}

/// GET /auth/check-first-user
pub async fn check_first_user(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<FirstUserResponse>>, ApiError> {
    let is_first_user = state.auth_service().is_first_user().await?;
    Ok(Json(ApiResponse::success(FirstUserResponse { is_first_user })))
}

/// GET /auth/me
/// Get current user information (requires authentication)
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.auth_service().me(user.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer_token(&headers("bearer  xyz ")), Some("xyz"));
        assert_eq!(extract_bearer_token(&headers("Basic abc")), None);
        assert_eq!(extract_bearer_token(&headers("Bearer ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn auth_errors_map_to_status() {
        assert!(matches!(
            ApiError::from(AuthError::EmailInUse),
            ApiError::Conflict(msg) if msg == "Email already in use"
        ));
        assert!(matches!(
            ApiError::from(AuthError::InvalidCredentials),
            ApiError::Unauthorized(_)
        ));
    }
}
