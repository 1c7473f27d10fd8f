//! Response DTOs for the HTTP API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::courier::Courier;
use crate::db::{ActiveStatus, PaginatedResult, Role, User};
use crate::department::Department;
use crate::letter::{
    IncomingLetter, IncomingStatus, LetterKind, OutgoingLetter, OutgoingStatus, Priority,
};
use crate::notification::Notification;
use crate::tracking::{KindStats, StatusCount, TrackedLetter, TrackingStats};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Single-resource wrapper: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated list wrapper.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub total: i64,
    pub has_more: bool,
    pub current_page: i64,
    pub total_pages: i64,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Convert a repository page, mapping each item into its response type.
    pub fn from_result<U>(result: PaginatedResult<U>) -> Self
    where
        U: Into<T>,
    {
        let has_more = result.has_more();
        let total_pages = result.total_pages();
        Self {
            total: result.total,
            current_page: result.page.page,
            has_more,
            total_pages,
            records: result.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a status update by QR code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse<T: Serialize> {
    pub data: T,
    /// False when the letter already had the requested status.
    pub status_changed: bool,
    pub message: String,
}

/// A bare confirmation message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub department_id: Option<i64>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            department_id: user.department_id,
        }
    }
}

/// Tokens issued by login, signup, and refresh.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Always `Bearer`.
    pub token_type: &'static str,
    pub user: UserInfo,
}

/// Current user (`GET /auth/me`).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub department: Option<DepartmentRef>,
    pub unread_notifications: i64,
    pub created_at: String,
    pub last_login: Option<String>,
}

// ============================================================================
// Departments and couriers
// ============================================================================

/// Id and name of a department, embedded in other resources.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepartmentRef {
    pub id: i64,
    pub name: String,
}

impl DepartmentRef {
    fn new(id: i64, name: Option<&str>) -> Self {
        Self {
            id,
            name: name.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentResponse {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub head: String,
    pub contact: String,
    pub status: ActiveStatus,
    /// Linked account.
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub created_at: String,
}

impl From<Department> for DepartmentResponse {
    fn from(d: Department) -> Self {
        Self {
            id: d.id,
            name: d.name,
            code: d.code,
            head: d.head,
            contact: d.contact,
            status: d.status,
            user_id: d.user_id,
            username: d.username,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourierResponse {
    pub id: i64,
    pub service_name: String,
    pub code: String,
    pub contact_person: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub status: ActiveStatus,
    pub created_at: String,
}

impl From<Courier> for CourierResponse {
    fn from(c: Courier) -> Self {
        Self {
            id: c.id,
            service_name: c.service_name,
            code: c.code,
            contact_person: c.contact_person,
            email: c.email,
            phone: c.phone,
            address: c.address,
            status: c.status,
            created_at: c.created_at,
        }
    }
}

// ============================================================================
// Letters
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomingLetterResponse {
    pub id: i64,
    pub qr_code: String,
    /// Outside sender.
    pub from: String,
    /// Receiving department id.
    pub to: i64,
    pub department: DepartmentRef,
    pub priority: Priority,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub filing: Option<String>,
    pub status: IncomingStatus,
    /// Display string of `status`.
    pub status_label: &'static str,
    /// Public URL of the scanned image.
    pub image: Option<String>,
    pub received_date: String,
    pub created_by: Option<i64>,
    pub created_at: String,
}

impl From<IncomingLetter> for IncomingLetterResponse {
    fn from(l: IncomingLetter) -> Self {
        Self {
            department: DepartmentRef::new(l.department_id, l.department_name.as_deref()),
            id: l.id,
            qr_code: l.qr_code,
            from: l.sender,
            to: l.department_id,
            priority: l.priority,
            subject: l.subject,
            description: l.description,
            filing: l.filing,
            status_label: l.status.display_label(),
            status: l.status,
            image: l.image,
            received_date: l.received_date,
            created_by: l.created_by,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourierRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingLetterResponse {
    pub id: i64,
    pub qr_code: String,
    /// Sending department id.
    pub from: i64,
    /// Outside recipient.
    pub to: String,
    pub department: DepartmentRef,
    pub priority: Priority,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub status: OutgoingStatus,
    pub status_label: &'static str,
    pub image: Option<String>,
    pub courier_id: Option<i64>,
    pub courier: Option<CourierRef>,
    pub dispatched_date: Option<String>,
    pub delivered_date: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: String,
}

impl From<OutgoingLetter> for OutgoingLetterResponse {
    fn from(l: OutgoingLetter) -> Self {
        let courier = l.courier_id.map(|id| CourierRef {
            id,
            name: l.courier_name.clone().unwrap_or_default(),
        });
        Self {
            department: DepartmentRef::new(l.department_id, l.department_name.as_deref()),
            id: l.id,
            qr_code: l.qr_code,
            from: l.department_id,
            to: l.recipient,
            priority: l.priority,
            subject: l.subject,
            description: l.description,
            status_label: l.status.display_label(),
            status: l.status,
            image: l.image,
            courier_id: l.courier_id,
            courier,
            dispatched_date: l.dispatched_date,
            delivered_date: l.delivered_date,
            created_by: l.created_by,
            created_at: l.created_at,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: i64,
    pub message: String,
    /// Kind of the referenced letter.
    #[serde(rename = "type")]
    pub kind: Option<LetterKind>,
    pub letter_id: Option<i64>,
    pub incoming_id: Option<i64>,
    pub outgoing_id: Option<i64>,
    pub qr_code: Option<String>,
    pub department_id: Option<i64>,
    /// Recipient.
    pub user_id: Option<i64>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        let letter = n.letter();
        Self {
            id: n.id,
            message: n.message,
            kind: letter.map(|(kind, _)| kind),
            letter_id: letter.map(|(_, id)| id),
            incoming_id: n.incoming_id,
            outgoing_id: n.outgoing_id,
            qr_code: n.qr_code,
            department_id: n.department_id,
            user_id: n.user_id,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Number of notifications flipped to read.
    pub updated: u64,
}

// ============================================================================
// Tracking
// ============================================================================

/// One letter of either kind in the tracking view.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecordResponse {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: LetterKind,
    pub qr_code: String,
    pub from: String,
    pub to: String,
    pub department: DepartmentRef,
    pub priority: Priority,
    pub subject: Option<String>,
    /// Shared display status.
    pub status: &'static str,
    /// Status enum name of the letter's own kind.
    pub raw_status: &'static str,
    pub image: Option<String>,
    /// Received date for incoming, dispatch date for outgoing.
    pub date: Option<String>,
    pub created_at: String,
}

impl From<TrackedLetter> for TrackingRecordResponse {
    fn from(letter: TrackedLetter) -> Self {
        let (department_id, department_name) = letter.department();
        Self {
            id: letter.id(),
            kind: letter.kind(),
            qr_code: letter.qr_code().to_string(),
            from: letter.from().to_string(),
            to: letter.to().to_string(),
            department: DepartmentRef::new(department_id, department_name),
            priority: letter.priority(),
            subject: letter.subject().map(str::to_string),
            status: letter.display_status(),
            raw_status: letter.raw_status(),
            image: letter.image().map(str::to_string),
            date: letter.date().map(str::to_string),
            created_at: letter.created_at().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountResponse {
    pub status: &'static str,
    pub raw_status: &'static str,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KindStatsResponse {
    pub total: i64,
    pub by_status: Vec<StatusCountResponse>,
}

impl From<KindStats> for KindStatsResponse {
    fn from(stats: KindStats) -> Self {
        Self {
            total: stats.total,
            by_status: stats
                .by_status
                .into_iter()
                .map(|StatusCount { status, raw_status, count }| StatusCountResponse {
                    status,
                    raw_status,
                    count,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingStatsResponse {
    pub total: i64,
    pub incoming: KindStatsResponse,
    pub outgoing: KindStatsResponse,
}

impl From<TrackingStats> for TrackingStatsResponse {
    fn from(stats: TrackingStats) -> Self {
        Self {
            total: stats.total(),
            incoming: stats.incoming.into(),
            outgoing: stats.outgoing.into(),
        }
    }
}
