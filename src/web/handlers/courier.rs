//! Courier handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::courier::{CourierRepository, CourierUpdate, NewCourier};
use crate::db::PageParams;
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, CourierResponse, CreateCourierRequest, DirectoryListQuery,
    PaginatedResponse, UpdateCourierRequest, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::{parse_active_status, require_super_admin, AppState};
use crate::web::middleware::AuthUser;

fn trim(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string())
}

/// GET /api/v1/couriers - List couriers.
#[utoipa::path(
    get,
    path = "/api/v1/couriers",
    tag = "couriers",
    security(("bearer_auth" = [])),
    params(DirectoryListQuery),
    responses((status = 200, description = "Paginated couriers", body = [CourierResponse]))
)]
pub async fn list_couriers(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ApiQuery(query): ApiQuery<DirectoryListQuery>,
) -> Result<Json<PaginatedResponse<CourierResponse>>, ApiError> {
    let status = parse_active_status(query.status.as_deref())?;
    let result = CourierRepository::new(state.pool())
        .list(status, PageParams::new(query.page, query.limit))
        .await?;
    Ok(Json(PaginatedResponse::from_result(result)))
}

/// GET /api/v1/couriers/:id - Get a courier.
#[utoipa::path(
    get,
    path = "/api/v1/couriers/{id}",
    tag = "couriers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Courier id")),
    responses(
        (status = 200, description = "Courier in `data`", body = CourierResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_courier(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<CourierResponse>>, ApiError> {
    let courier = CourierRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("courier not found"))?;
    Ok(Json(ApiResponse::new(courier.into())))
}

/// POST /api/v1/couriers - Register a courier service.
#[utoipa::path(
    post,
    path = "/api/v1/couriers",
    tag = "couriers",
    security(("bearer_auth" = [])),
    request_body = CreateCourierRequest,
    responses(
        (status = 201, description = "Courier in `data`", body = CourierResponse),
        (status = 400, description = "Invalid input or duplicate code", body = ErrorBody),
        (status = 403, description = "Super admin access required", body = ErrorBody)
    )
)]
pub async fn create_courier(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCourierRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourierResponse>>), ApiError> {
    require_super_admin(&state.viewer(&claims).await?)?;

    let new_courier = NewCourier {
        service_name: req.service_name.trim().to_string(),
        code: req.code.trim().to_string(),
        contact_person: req.contact_person.trim().to_string(),
        email: req.email.trim().to_string(),
        phone: req.phone.trim().to_string(),
        address: req.address.trim().to_string(),
        status: parse_active_status(req.status.as_deref())?.unwrap_or_default(),
    };

    let courier = CourierRepository::new(state.pool())
        .create(&new_courier)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(courier.into()))))
}

/// PUT /api/v1/couriers/:id - Update a courier.
#[utoipa::path(
    put,
    path = "/api/v1/couriers/{id}",
    tag = "couriers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Courier id")),
    request_body = UpdateCourierRequest,
    responses(
        (status = 200, description = "Courier in `data`", body = CourierResponse),
        (status = 400, description = "Invalid input or duplicate code", body = ErrorBody),
        (status = 403, description = "Super admin access required", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_courier(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateCourierRequest>,
) -> Result<Json<ApiResponse<CourierResponse>>, ApiError> {
    require_super_admin(&state.viewer(&claims).await?)?;

    let update = CourierUpdate {
        service_name: trim(req.service_name),
        code: trim(req.code),
        contact_person: trim(req.contact_person),
        email: trim(req.email),
        phone: trim(req.phone),
        address: trim(req.address),
        status: parse_active_status(req.status.as_deref())?,
    };

    let courier = CourierRepository::new(state.pool())
        .update(id, &update)
        .await?;
    Ok(Json(ApiResponse::new(courier.into())))
}

/// DELETE /api/v1/couriers/:id - Delete a courier.
#[utoipa::path(
    delete,
    path = "/api/v1/couriers/{id}",
    tag = "couriers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Courier id")),
    responses(
        (status = 204, description = "Deleted"),
        (
            status = 400,
            description = "Outgoing letters still reference the courier",
            body = ErrorBody
        ),
        (status = 403, description = "Super admin access required", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_courier(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    require_super_admin(&state.viewer(&claims).await?)?;

    CourierRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
