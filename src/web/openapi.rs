//! OpenAPI document served by Swagger UI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::db::{ActiveStatus, Role};
use crate::letter::{IncomingStatus, LetterKind, OutgoingStatus, Priority};
use crate::web::dto::*;
use crate::web::error::{ErrorBody, ErrorCode, ErrorDetail};
use crate::web::handlers::{auth, courier, department, incoming, notification, outgoing, tracking};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mailroom API",
        description = "Department mail tracking: incoming and outgoing letters, couriers, \
                       and notifications"
    ),
    paths(
        crate::web::router::health_check,
        auth::signup,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::me,
        department::list_departments,
        department::get_department,
        department::create_department,
        department::update_department,
        department::delete_department,
        courier::list_couriers,
        courier::get_courier,
        courier::create_courier,
        courier::update_courier,
        courier::delete_courier,
        incoming::list_incoming,
        incoming::create_incoming,
        incoming::get_incoming,
        incoming::get_incoming_by_qr,
        incoming::update_incoming,
        incoming::delete_incoming,
        incoming::update_incoming_status,
        incoming::update_incoming_status_by_qr,
        outgoing::list_outgoing,
        outgoing::create_outgoing,
        outgoing::get_outgoing,
        outgoing::get_outgoing_by_qr,
        outgoing::update_outgoing,
        outgoing::delete_outgoing,
        outgoing::update_outgoing_status,
        outgoing::update_outgoing_status_by_qr,
        notification::list_notifications,
        notification::unread_count,
        notification::mark_read,
        notification::mark_all_read,
        notification::delete_notification,
        tracking::list_tracking,
        tracking::tracking_stats,
        tracking::track_by_qr,
    ),
    components(schemas(
        Role,
        ActiveStatus,
        Priority,
        IncomingStatus,
        OutgoingStatus,
        LetterKind,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
        SignupRequest,
        LoginRequest,
        RefreshRequest,
        CreateDepartmentRequest,
        UpdateDepartmentRequest,
        CreateCourierRequest,
        UpdateCourierRequest,
        CreateIncomingRequest,
        UpdateIncomingRequest,
        CreateOutgoingRequest,
        UpdateOutgoingRequest,
        StatusUpdateRequest,
        MessageResponse,
        UserInfo,
        LoginResponse,
        MeResponse,
        DepartmentRef,
        DepartmentResponse,
        CourierResponse,
        CourierRef,
        IncomingLetterResponse,
        OutgoingLetterResponse,
        NotificationResponse,
        UnreadCountResponse,
        MarkAllReadResponse,
        TrackingRecordResponse,
        StatusCountResponse,
        KindStatsResponse,
        TrackingStatsResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Accounts and tokens"),
        (name = "departments", description = "Department directory"),
        (name = "couriers", description = "Courier services"),
        (name = "incoming", description = "Letters received from outside"),
        (name = "outgoing", description = "Letters sent out by departments"),
        (name = "notifications", description = "Per-user letter notifications"),
        (name = "tracking", description = "Combined view of both letter kinds"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/auth/login"));
        assert!(paths.contains_key("/api/v1/incoming/qr/{code}/status"));
        assert!(paths.contains_key("/api/v1/tracking/stats"));
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
