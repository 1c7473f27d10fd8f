//! Tracking view handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::PageParams;
use crate::letter::StatusFilter;
use crate::tracking::{TrackingQuery, TrackingService, TrackingType};
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, PaginatedResponse, TrackingListQuery, TrackingRecordResponse,
    TrackingStatsResponse,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::{parse_priority, AppState};
use crate::web::middleware::AuthUser;

/// GET /api/v1/tracking - Letters of both kinds, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/tracking",
    tag = "tracking",
    security(("bearer_auth" = [])),
    params(TrackingListQuery),
    responses(
        (status = 200, description = "Paginated tracking records", body = [TrackingRecordResponse]),
        (status = 400, description = "Unknown type, status, or priority", body = ErrorBody)
    )
)]
pub async fn list_tracking(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(params): ApiQuery<TrackingListQuery>,
) -> Result<Json<PaginatedResponse<TrackingRecordResponse>>, ApiError> {
    let kind: TrackingType = params.kind.as_deref().unwrap_or_default().parse()?;
    let status = match params.status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(StatusFilter::parse(s)?),
        _ => None,
    };
    let query = TrackingQuery {
        kind,
        status,
        priority: parse_priority(params.priority.as_deref())?,
    };

    let viewer = state.viewer(&claims).await?;
    let result = TrackingService::new(state.pool(), viewer)
        .list(&query, PageParams::new(params.page, params.limit))
        .await?;
    Ok(Json(PaginatedResponse::from_result(result)))
}

/// GET /api/v1/tracking/stats - Letter counts per status.
#[utoipa::path(
    get,
    path = "/api/v1/tracking/stats",
    tag = "tracking",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Counts in `data`", body = TrackingStatsResponse))
)]
pub async fn tracking_stats(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<TrackingStatsResponse>>, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let stats = TrackingService::new(state.pool(), viewer).stats().await?;
    Ok(Json(ApiResponse::new(stats.into())))
}

/// GET /api/v1/tracking/qr/:code - Find a letter of either kind by QR code.
#[utoipa::path(
    get,
    path = "/api/v1/tracking/qr/{code}",
    tag = "tracking",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "QR code")),
    responses(
        (status = 200, description = "Record in `data`", body = TrackingRecordResponse),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn track_by_qr(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<ApiResponse<TrackingRecordResponse>>, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = TrackingService::new(state.pool(), viewer)
        .find_by_qr(&code)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}
