//! Outgoing letter handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::PageParams;
use crate::letter::{LetterService, NewOutgoingLetter, OutgoingFilter, OutgoingLetterUpdate};
use crate::web::dto::validation::trimmed;
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, CreateOutgoingRequest, LetterForm, LetterListQuery,
    OutgoingLetterResponse, PaginatedResponse, StatusChangeResponse, StatusUpdateRequest,
    UpdateOutgoingRequest, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::{
    discard_image, parse_date_field, parse_optional, parse_outgoing_status, parse_priority,
    store_image, AppState,
};
use crate::web::middleware::AuthUser;

/// GET /api/v1/outgoing - List outgoing letters in the caller's scope.
#[utoipa::path(
    get,
    path = "/api/v1/outgoing",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(LetterListQuery),
    responses(
        (status = 200, description = "Paginated outgoing letters", body = [OutgoingLetterResponse]),
        (status = 400, description = "Unknown status or priority", body = ErrorBody)
    )
)]
pub async fn list_outgoing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(query): ApiQuery<LetterListQuery>,
) -> Result<Json<PaginatedResponse<OutgoingLetterResponse>>, ApiError> {
    let filter = OutgoingFilter {
        status: parse_optional(query.status.as_deref(), parse_outgoing_status)?,
        priority: parse_priority(query.priority.as_deref())?,
        search: query.search,
    };

    let viewer = state.viewer(&claims).await?;
    let result = LetterService::new(state.pool(), viewer)
        .list_outgoing(&filter, PageParams::new(query.page, query.limit))
        .await?;
    Ok(Json(PaginatedResponse::from_result(result)))
}

/// POST /api/v1/outgoing - Record an outgoing letter.
///
/// Accepts JSON, or multipart form-data with an `image` file.
#[utoipa::path(
    post,
    path = "/api/v1/outgoing",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    request_body = CreateOutgoingRequest,
    responses(
        (status = 201, description = "Letter in `data`", body = OutgoingLetterResponse),
        (status = 400, description = "Invalid input or duplicate QR code", body = ErrorBody),
        (status = 403, description = "Sending from another department", body = ErrorBody),
        (status = 404, description = "Department or courier not found", body = ErrorBody)
    )
)]
pub async fn create_outgoing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    form: LetterForm<CreateOutgoingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OutgoingLetterResponse>>), ApiError> {
    let req = form.data;
    let department_id = req
        .from
        .ok_or_else(|| ApiError::bad_request("Department is required"))?;
    let mut letter = NewOutgoingLetter {
        qr_code: req.qr_code,
        department_id,
        recipient: req.to.trim().to_string(),
        priority: parse_priority(req.priority.as_deref())?.unwrap_or_default(),
        subject: trimmed(req.subject),
        description: trimmed(req.description),
        status: parse_optional(req.status.as_deref(), parse_outgoing_status)?.unwrap_or_default(),
        image: None,
        courier_id: req.courier_id,
        dispatched_date: parse_date_field("dispatchedDate", req.dispatched_date.as_deref())?,
    };

    let viewer = state.viewer(&claims).await?;
    viewer.ensure_can_send_from(department_id)?;
    letter.image = store_image(&state, form.image)?;

    match LetterService::new(state.pool(), viewer)
        .create_outgoing(&letter)
        .await
    {
        Ok(created) => Ok((StatusCode::CREATED, Json(ApiResponse::new(created.into())))),
        Err(e) => {
            discard_image(&state, letter.image.as_deref());
            Err(e.into())
        }
    }
}

/// GET /api/v1/outgoing/:id - Get an outgoing letter.
#[utoipa::path(
    get,
    path = "/api/v1/outgoing/{id}",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    responses(
        (status = 200, description = "Letter in `data`", body = OutgoingLetterResponse),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_outgoing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<OutgoingLetterResponse>>, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .get_outgoing(id)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}

/// GET /api/v1/outgoing/qr/:code - Get an outgoing letter by QR code.
#[utoipa::path(
    get,
    path = "/api/v1/outgoing/qr/{code}",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "QR code")),
    responses(
        (status = 200, description = "Letter in `data`", body = OutgoingLetterResponse),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_outgoing_by_qr(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<ApiResponse<OutgoingLetterResponse>>, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .get_outgoing_by_qr(&code)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}

/// PUT /api/v1/outgoing/:id - Update an outgoing letter.
#[utoipa::path(
    put,
    path = "/api/v1/outgoing/{id}",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    request_body = UpdateOutgoingRequest,
    responses(
        (status = 200, description = "Letter in `data`", body = OutgoingLetterResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_outgoing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    form: LetterForm<UpdateOutgoingRequest>,
) -> Result<Json<ApiResponse<OutgoingLetterResponse>>, ApiError> {
    let req = form.data;
    let mut update = OutgoingLetterUpdate {
        department_id: req.from,
        recipient: trimmed(req.to),
        priority: parse_priority(req.priority.as_deref())?,
        subject: trimmed(req.subject),
        description: trimmed(req.description),
        status: parse_optional(req.status.as_deref(), parse_outgoing_status)?,
        image: None,
        courier_id: req.courier_id,
        dispatched_date: parse_date_field("dispatchedDate", req.dispatched_date.as_deref())?,
        delivered_date: parse_date_field("deliveredDate", req.delivered_date.as_deref())?,
    };

    let viewer = state.viewer(&claims).await?;
    let service = LetterService::new(state.pool(), viewer);

    let replaced = match form.image {
        Some(image) => {
            let previous = service.get_outgoing(id).await?.image;
            update.image = store_image(&state, Some(image))?;
            previous
        }
        None => None,
    };

    match service.update_outgoing(id, &update).await {
        Ok(letter) => {
            discard_image(&state, replaced.as_deref());
            Ok(Json(ApiResponse::new(letter.into())))
        }
        Err(e) => {
            discard_image(&state, update.image.as_deref());
            Err(e.into())
        }
    }
}

/// DELETE /api/v1/outgoing/:id - Delete an outgoing letter.
#[utoipa::path(
    delete,
    path = "/api/v1/outgoing/{id}",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_outgoing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .delete_outgoing(id)
        .await?;
    discard_image(&state, letter.image.as_deref());
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/outgoing/:id/status - Set the status of an outgoing letter.
///
/// DISPATCHED stamps the dispatch date and DELIVERED the delivery date.
#[utoipa::path(
    patch,
    path = "/api/v1/outgoing/{id}/status",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Letter in `data`", body = OutgoingLetterResponse),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_outgoing_status(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<OutgoingLetterResponse>>, ApiError> {
    let status = parse_outgoing_status(req.status.trim())?;
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .update_outgoing_status(id, status)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}

/// PATCH /api/v1/outgoing/qr/:code/status - Set the status by QR code.
#[utoipa::path(
    patch,
    path = "/api/v1/outgoing/qr/{code}/status",
    tag = "outgoing",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "QR code")),
    request_body = StatusUpdateRequest,
    responses(
        (
            status = 200,
            description = "Letter in `data` with `statusChanged` and `message`",
            body = OutgoingLetterResponse
        ),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_outgoing_status_by_qr(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(code): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<StatusUpdateRequest>,
) -> Result<Json<StatusChangeResponse<OutgoingLetterResponse>>, ApiError> {
    let status = parse_outgoing_status(req.status.trim())?;
    let viewer = state.viewer(&claims).await?;
    let change = LetterService::new(state.pool(), viewer)
        .update_outgoing_status_by_qr(&code, status)
        .await?;
    Ok(Json(StatusChangeResponse {
        data: change.letter.into(),
        status_changed: change.changed,
        message: change.message,
    }))
}
