//! Notification handlers.
//!
//! `super_admin` and `rd_department` callers work on every notification.
//! `other_department` callers are limited to their own notifications about
//! their department.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::PageParams;
use crate::notification::{NotificationRepository, NotificationScope};
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, MarkAllReadResponse, MessageResponse, NotificationListQuery,
    NotificationResponse, PaginatedResponse, UnreadCountResponse,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, JwtClaims};

async fn scope(state: &AppState, claims: &JwtClaims) -> Result<NotificationScope, ApiError> {
    let viewer = state.viewer(claims).await?;
    Ok(NotificationScope::from(&viewer))
}

/// GET /api/v1/notifications - List the notifications visible to the caller.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationListQuery),
    responses((
        status = 200,
        description = "Paginated notifications",
        body = [NotificationResponse]
    ))
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(query): ApiQuery<NotificationListQuery>,
) -> Result<Json<PaginatedResponse<NotificationResponse>>, ApiError> {
    let scope = scope(&state, &claims).await?;
    let result = NotificationRepository::new(state.pool())
        .list(
            scope,
            query.unread.unwrap_or(false),
            PageParams::new(query.page, query.limit),
        )
        .await?;
    Ok(Json(PaginatedResponse::from_result(result)))
}

/// GET /api/v1/notifications/unread-count - Count unread notifications.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Count in `data`", body = UnreadCountResponse))
)]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<UnreadCountResponse>>, ApiError> {
    let scope = scope(&state, &claims).await?;
    let count = NotificationRepository::new(state.pool())
        .count_unread(scope)
        .await?;
    Ok(Json(ApiResponse::new(UnreadCountResponse { count })))
}

/// PATCH /api/v1/notifications/:id/read - Mark one notification read.
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read", body = MessageResponse),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let scope = scope(&state, &claims).await?;
    if !NotificationRepository::new(state.pool())
        .mark_read(id, scope)
        .await?
    {
        return Err(ApiError::not_found("notification not found"));
    }
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Notification marked as read",
    ))))
}

/// PATCH /api/v1/notifications/read-all - Mark every notification read.
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Number updated in `data`", body = MarkAllReadResponse))
)]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MarkAllReadResponse>>, ApiError> {
    let scope = scope(&state, &claims).await?;
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(scope)
        .await?;
    Ok(Json(ApiResponse::new(MarkAllReadResponse { updated })))
}

/// DELETE /api/v1/notifications/:id - Delete one notification.
#[utoipa::path(
    delete,
    path = "/api/v1/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not visible", body = ErrorBody)
    )
)]
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let scope = scope(&state, &claims).await?;
    if !NotificationRepository::new(state.pool())
        .delete(id, scope)
        .await?
    {
        return Err(ApiError::not_found("notification not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
