//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::error::ApiError;
use super::handlers::{
    auth, courier, department, incoming, notification, outgoing, tracking, AppState,
};
use super::middleware::{
    create_cors_layer, jwt_auth, login_rate_limit, with_security_headers, JwtState,
    RateLimitState,
};
use super::openapi::ApiDoc;
use crate::media::ImageStorage;

/// Room left in the request body limit for form fields next to the image.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Create the main router: API routes under `/api/v1` and `/api`, plus
/// health check, Swagger UI, and uploaded images.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    login_limiter: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let api = api_routes(login_limiter);
    let body_limit = body_limit(&app_state.images);
    let images = app_state.images.clone();

    let router = Router::new()
        .nest("/api/v1", api.clone())
        .nest("/api", api)
        .merge(create_health_router())
        .merge(create_swagger_router())
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    let state = jwt_state.clone();
                    jwt_auth(state, req, next)
                })),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state);

    let router = match create_static_router(&images) {
        Some(static_router) => router.merge(static_router),
        None => router,
    };

    with_security_headers(router).layer(CompressionLayer::new())
}

fn api_routes(login_limiter: Arc<RateLimitState>) -> Router<Arc<AppState>> {
    // Only the credential endpoints are rate limited.
    let credential_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route_layer(middleware::from_fn(move |req, next| {
            let state = login_limiter.clone();
            login_rate_limit(state, req, next)
        }));

    let auth_routes = Router::new()
        .merge(credential_routes)
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let department_routes = Router::new()
        .route(
            "/",
            get(department::list_departments).post(department::create_department),
        )
        .route(
            "/:id",
            get(department::get_department)
                .put(department::update_department)
                .delete(department::delete_department),
        );

    let courier_routes = Router::new()
        .route("/", get(courier::list_couriers).post(courier::create_courier))
        .route(
            "/:id",
            get(courier::get_courier)
                .put(courier::update_courier)
                .delete(courier::delete_courier),
        );

    let incoming_routes = Router::new()
        .route(
            "/",
            get(incoming::list_incoming).post(incoming::create_incoming),
        )
        .route(
            "/:id",
            get(incoming::get_incoming)
                .put(incoming::update_incoming)
                .delete(incoming::delete_incoming),
        )
        .route("/:id/status", patch(incoming::update_incoming_status))
        .route("/qr/:code", get(incoming::get_incoming_by_qr))
        .route(
            "/qr/:code/status",
            patch(incoming::update_incoming_status_by_qr),
        );

    let outgoing_routes = Router::new()
        .route(
            "/",
            get(outgoing::list_outgoing).post(outgoing::create_outgoing),
        )
        .route(
            "/:id",
            get(outgoing::get_outgoing)
                .put(outgoing::update_outgoing)
                .delete(outgoing::delete_outgoing),
        )
        .route("/:id/status", patch(outgoing::update_outgoing_status))
        .route("/qr/:code", get(outgoing::get_outgoing_by_qr))
        .route(
            "/qr/:code/status",
            patch(outgoing::update_outgoing_status_by_qr),
        );

    let notification_routes = Router::new()
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/read-all", patch(notification::mark_all_read))
        .route("/:id/read", patch(notification::mark_read))
        .route(
            "/:id",
            axum::routing::delete(notification::delete_notification),
        );

    let tracking_routes = Router::new()
        .route("/", get(tracking::list_tracking))
        .route("/stats", get(tracking::tracking_stats))
        .route("/qr/:code", get(tracking::track_by_qr));

    Router::new()
        .nest("/auth", auth_routes)
        .nest("/departments", department_routes)
        .nest("/couriers", courier_routes)
        .nest("/incoming", incoming_routes)
        .nest("/outgoing", outgoing_routes)
        .nest("/notifications", notification_routes)
        .nest("/tracking", tracking_routes)
}

fn body_limit(images: &ImageStorage) -> usize {
    usize::try_from(images.max_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK)
}

/// Create a health check router.
pub fn create_health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

/// Swagger UI at `/swagger-ui`, document at `/api-docs/openapi.json`.
pub fn create_swagger_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Serve stored letter images, unless they live on another host.
pub fn create_static_router(images: &ImageStorage) -> Option<Router> {
    let mount = images.mount_path()?;
    tracing::debug!(mount, path = %images.base_path().display(), "Serving uploaded images");
    Some(Router::new().nest_service(mount, ServeDir::new(images.base_path())))
}

/// Health check handler.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is up", body = String))
)]
pub async fn health_check() -> &'static str {
    "OK"
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
