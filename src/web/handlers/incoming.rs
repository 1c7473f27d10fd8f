//! Incoming letter handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::PageParams;
use crate::letter::{IncomingFilter, IncomingLetterUpdate, LetterService, NewIncomingLetter};
use crate::web::dto::validation::trimmed;
use crate::web::dto::{
    ApiPath, ApiQuery, ApiResponse, CreateIncomingRequest, IncomingLetterResponse, LetterForm,
    LetterListQuery, PaginatedResponse, StatusChangeResponse, StatusUpdateRequest,
    UpdateIncomingRequest, ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::{
    discard_image, parse_date_field, parse_incoming_status, parse_optional, parse_priority,
    store_image, AppState,
};
use crate::web::middleware::AuthUser;

/// GET /api/v1/incoming - List incoming letters in the caller's scope.
#[utoipa::path(
    get,
    path = "/api/v1/incoming",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(LetterListQuery),
    responses(
        (status = 200, description = "Paginated incoming letters", body = [IncomingLetterResponse]),
        (status = 400, description = "Unknown status or priority", body = ErrorBody)
    )
)]
pub async fn list_incoming(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiQuery(query): ApiQuery<LetterListQuery>,
) -> Result<Json<PaginatedResponse<IncomingLetterResponse>>, ApiError> {
    let filter = IncomingFilter {
        status: parse_optional(query.status.as_deref(), parse_incoming_status)?,
        priority: parse_priority(query.priority.as_deref())?,
        search: query.search,
    };
    let page = PageParams::new(query.page, query.limit);

    let viewer = state.viewer(&claims).await?;
    let result = LetterService::new(state.pool(), viewer)
        .list_incoming(&filter, page)
        .await?;
    Ok(Json(PaginatedResponse::from_result(result)))
}

/// POST /api/v1/incoming - Record an incoming letter.
///
/// Accepts JSON, or multipart form-data with an `image` file.
#[utoipa::path(
    post,
    path = "/api/v1/incoming",
    tag = "incoming",
    security(("bearer_auth" = [])),
    request_body = CreateIncomingRequest,
    responses(
        (status = 201, description = "Letter in `data`", body = IncomingLetterResponse),
        (status = 400, description = "Invalid input or duplicate QR code", body = ErrorBody),
        (status = 403, description = "Not allowed to record incoming letters", body = ErrorBody),
        (status = 404, description = "Department not found", body = ErrorBody)
    )
)]
pub async fn create_incoming(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    form: LetterForm<CreateIncomingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IncomingLetterResponse>>), ApiError> {
    let req = form.data;
    let department_id = req
        .to
        .ok_or_else(|| ApiError::bad_request("Department is required"))?;
    let mut letter = NewIncomingLetter {
        qr_code: req.qr_code,
        sender: req.from.trim().to_string(),
        department_id,
        priority: parse_priority(req.priority.as_deref())?.unwrap_or_default(),
        subject: trimmed(req.subject),
        description: trimmed(req.description),
        filing: trimmed(req.filing),
        status: parse_optional(req.status.as_deref(), parse_incoming_status)?.unwrap_or_default(),
        image: None,
        received_date: parse_date_field("receivedDate", req.received_date.as_deref())?,
    };

    let viewer = state.viewer(&claims).await?;
    let service = LetterService::new(state.pool(), viewer);
    if form.image.is_some() {
        // Fail on permissions before touching the disk.
        viewer.ensure_can_manage_incoming()?;
    }
    letter.image = store_image(&state, form.image)?;

    match service.create_incoming(&letter).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(ApiResponse::new(created.into())))),
        Err(e) => {
            discard_image(&state, letter.image.as_deref());
            Err(e.into())
        }
    }
}

/// GET /api/v1/incoming/:id - Get an incoming letter.
#[utoipa::path(
    get,
    path = "/api/v1/incoming/{id}",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    responses(
        (status = 200, description = "Letter in `data`", body = IncomingLetterResponse),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_incoming(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<IncomingLetterResponse>>, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .get_incoming(id)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}

/// GET /api/v1/incoming/qr/:code - Get an incoming letter by QR code.
#[utoipa::path(
    get,
    path = "/api/v1/incoming/qr/{code}",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "QR code")),
    responses(
        (status = 200, description = "Letter in `data`", body = IncomingLetterResponse),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_incoming_by_qr(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(code): ApiPath<String>,
) -> Result<Json<ApiResponse<IncomingLetterResponse>>, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .get_incoming_by_qr(&code)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}

/// PUT /api/v1/incoming/:id - Update an incoming letter.
///
/// A new `image` replaces the stored one.
#[utoipa::path(
    put,
    path = "/api/v1/incoming/{id}",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    request_body = UpdateIncomingRequest,
    responses(
        (status = 200, description = "Letter in `data`", body = IncomingLetterResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_incoming(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    form: LetterForm<UpdateIncomingRequest>,
) -> Result<Json<ApiResponse<IncomingLetterResponse>>, ApiError> {
    let req = form.data;
    let mut update = IncomingLetterUpdate {
        sender: trimmed(req.from),
        department_id: req.to,
        priority: parse_priority(req.priority.as_deref())?,
        subject: trimmed(req.subject),
        description: trimmed(req.description),
        filing: trimmed(req.filing),
        status: parse_optional(req.status.as_deref(), parse_incoming_status)?,
        image: None,
        received_date: parse_date_field("receivedDate", req.received_date.as_deref())?,
    };

    let viewer = state.viewer(&claims).await?;
    let service = LetterService::new(state.pool(), viewer);

    let replaced = match form.image {
        Some(image) => {
            viewer.ensure_can_manage_incoming()?;
            let previous = service.get_incoming(id).await?.image;
            update.image = store_image(&state, Some(image))?;
            previous
        }
        None => None,
    };

    match service.update_incoming(id, &update).await {
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

/// DELETE /api/v1/incoming/:id - Delete an incoming letter.
#[utoipa::path(
    delete,
    path = "/api/v1/incoming/{id}",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_incoming(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .delete_incoming(id)
        .await?;
    discard_image(&state, letter.image.as_deref());
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/incoming/:id/status - Set the status of an incoming letter.
#[utoipa::path(
    patch,
    path = "/api/v1/incoming/{id}/status",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Letter id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Letter in `data`", body = IncomingLetterResponse),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_incoming_status(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(req): ValidatedJson<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<IncomingLetterResponse>>, ApiError> {
    let status = parse_incoming_status(req.status.trim())?;
    let viewer = state.viewer(&claims).await?;
    let letter = LetterService::new(state.pool(), viewer)
        .update_incoming_status(id, status)
        .await?;
    Ok(Json(ApiResponse::new(letter.into())))
}

/// PATCH /api/v1/incoming/qr/:code/status - Set the status by QR code.
///
/// Setting the current status again changes nothing and reports
/// `statusChanged: false`.
#[utoipa::path(
    patch,
    path = "/api/v1/incoming/qr/{code}/status",
    tag = "incoming",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "QR code")),
    request_body = StatusUpdateRequest,
    responses(
        (
            status = 200,
            description = "Letter in `data` with `statusChanged` and `message`",
            body = IncomingLetterResponse
        ),
        (status = 400, description = "Unknown status", body = ErrorBody),
        (status = 403, description = "Outside the caller's scope", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_incoming_status_by_qr(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ApiPath(code): ApiPath<String>,
    ValidatedJson(req): ValidatedJson<StatusUpdateRequest>,
) -> Result<Json<StatusChangeResponse<IncomingLetterResponse>>, ApiError> {
    let status = parse_incoming_status(req.status.trim())?;
    let viewer = state.viewer(&claims).await?;
    let change = LetterService::new(state.pool(), viewer)
        .update_incoming_status_by_qr(&code, status)
        .await?;
    Ok(Json(StatusChangeResponse {
        data: change.letter.into(),
        status_changed: change.changed,
        message: change.message,
    }))
}
