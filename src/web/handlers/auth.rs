//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::auth::{self, RegistrationRequest};
use crate::db::{RefreshTokenRepository, Role, UserRepository};
use crate::department::DepartmentRepository;
use crate::notification::{NotificationRepository, NotificationScope};
use crate::web::dto::{
    ApiResponse, DepartmentRef, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    RefreshRequest, SignupRequest, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// POST /api/v1/auth/signup - Create an account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created; tokens in `data`", body = LoginResponse),
        (status = 400, description = "Invalid input or duplicate username", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoginResponse>>), ApiError> {
    let role: Role = req
        .role
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid role '{}'", req.role)))?;

    let mut request = RegistrationRequest::new(req.username, req.password, role);
    if let Some(department_id) = req.department_id {
        request = request.with_department(department_id);
    }
    let user = auth::register(state.pool(), request)
        .await
        .map_err(crate::MailroomError::from)?;

    let response = state.issue_tokens(&user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(response))))
}

/// POST /api/v1/auth/login - Log in with username and password.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens in `data`", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 429, description = "Too many attempts", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_username(req.username.trim())
        .await?
        .ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    auth::verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if let Err(e) = users.update_last_login(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to record last login");
    }
    tracing::info!(user_id = user.id, username = %user.username, "User logged in");

    let response = state.issue_tokens(&user).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/v1/auth/refresh - Rotate a refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New tokens in `data`", body = LoginResponse),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let tokens = RefreshTokenRepository::new(state.pool());
    let token = tokens
        .get_valid_token(&req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = UserRepository::new(state.pool())
        .get_by_id(token.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    // Losing this race means another request already rotated the token.
    if !tokens.revoke(&req.refresh_token).await? {
        return Err(ApiError::unauthorized("Invalid or expired refresh token"));
    }

    let response = state.issue_tokens(&user).await?;
    Ok(Json(ApiResponse::new(response)))
}

/// POST /api/v1/auth/logout - Revoke a refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    request_body = RefreshRequest,
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    RefreshTokenRepository::new(state.pool())
        .revoke(&req.refresh_token)
        .await?;

    Ok(Json(ApiResponse::new(MessageResponse::new("Logged out"))))
}

/// GET /api/v1/auth/me - Current user.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user in `data`", body = MeResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = UserRepository::new(state.pool())
        .get_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    let department = match user.department_id {
        Some(id) => DepartmentRepository::new(state.pool())
            .get_by_id(id)
            .await?
            .map(|d| DepartmentRef { id: d.id, name: d.name }),
        None => None,
    };

    let viewer = crate::letter::Viewer::new(user.id, user.role, user.department_id);
    let unread_notifications = NotificationRepository::new(state.pool())
        .count_unread(NotificationScope::from(&viewer))
        .await?;

    let response = MeResponse {
        id: user.id,
        username: user.username,
        role: user.role,
        department_id: user.department_id,
        department,
        unread_notifications,
        created_at: user.created_at,
        last_login: user.last_login,
    };

    Ok(Json(ApiResponse::new(response)))
}
