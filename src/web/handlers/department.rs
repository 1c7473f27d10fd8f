//! Department handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::PageParams;
use crate::department::{DepartmentRepository, DepartmentService, DepartmentUpdate, NewDepartment};
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, CreateDepartmentRequest, DepartmentResponse,
    DirectoryListQuery, PaginatedResponse, UpdateDepartmentRequest, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::{parse_active_status, require_super_admin, AppState};
use crate::web::middleware::AuthUser;

/// GET /api/v1/departments - List departments.
#[utoipa::path(
    get,
    path = "/api/v1/departments",
    tag = "departments",
    security(("bearer_auth" = [])),
    params(DirectoryListQuery),
    responses(
        (status = 200, description = "Paginated departments", body = [DepartmentResponse]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ApiQuery(query): ApiQuery<DirectoryListQuery>,
) -> Result<Json<PaginatedResponse<DepartmentResponse>>, ApiError> {
    let status = parse_active_status(query.status.as_deref())?;
    let page = PageParams::new(query.page, query.limit);

    let result = DepartmentRepository::new(state.pool())
        .list(status, page)
        .await?;
    Ok(Json(PaginatedResponse::from_result(result)))
}

/// GET /api/v1/departments/:id - Get a department.
#[utoipa::path(
    get,
    path = "/api/v1/departments/{id}",
    tag = "departments",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department in `data`", body = DepartmentResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    AuthUser(_claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<DepartmentResponse>>, ApiError> {
    let department = DepartmentRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("department not found"))?;
    Ok(Json(ApiResponse::new(department.into())))
}

/// POST /api/v1/departments - Create a department with its account.
#[utoipa::path(
    post,
    path = "/api/v1/departments",
    tag = "departments",
    security(("bearer_auth" = [])),
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department in `data`", body = DepartmentResponse),
        (status = 400, description = "Invalid input, duplicate code or username", body = ErrorBody),
        (status = 403, description = "Super admin access required", body = ErrorBody)
    )
)]
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateDepartmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DepartmentResponse>>), ApiError> {
    require_super_admin(&state.viewer(&claims).await?)?;

    let mut new_department = NewDepartment::new(req.name.trim(), req.code.trim())
        .with_head(req.head.trim())
        .with_contact(req.contact.trim());
    if let Some(status) = parse_active_status(req.status.as_deref())? {
        new_department = new_department.with_status(status);
    }

    let department = DepartmentService::new(state.pool())
        .create_with_account(&new_department, &req.username, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(department.into()))))
}

/// PUT /api/v1/departments/:id - Update a department.
#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    tag = "departments",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Department id")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department in `data`", body = DepartmentResponse),
        (status = 400, description = "Invalid input or duplicate code", body = ErrorBody),
        (status = 403, description = "Super admin access required", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<UpdateDepartmentRequest>,
) -> Result<Json<ApiResponse<DepartmentResponse>>, ApiError> {
    require_super_admin(&state.viewer(&claims).await?)?;

    let update = DepartmentUpdate {
        name: req.name.map(|s| s.trim().to_string()),
        code: req.code.map(|s| s.trim().to_string()),
        head: req.head.map(|s| s.trim().to_string()),
        contact: req.contact.map(|s| s.trim().to_string()),
        status: parse_active_status(req.status.as_deref())?,
    };

    let department = DepartmentService::new(state.pool())
        .update(id, &update)
        .await?;
    Ok(Json(ApiResponse::new(department.into())))
}

/// DELETE /api/v1/departments/:id - Delete a department and its account.
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    tag = "departments",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Department id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Letters still reference the department", body = ErrorBody),
        (status = 403, description = "Super admin access required", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    require_super_admin(&state.viewer(&claims).await?)?;

    DepartmentService::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
