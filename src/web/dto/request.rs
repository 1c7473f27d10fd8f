//! Request DTOs.
//!
//! Letter payloads may arrive as multipart form fields, where every value is
//! text, so numeric ids accept both numbers and numeric strings.

use serde::{de, Deserialize, Deserializer};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

/// Accept `12`, `"12"`, `""` (absent) or null.
pub fn opt_i64_lenient<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse().map(Some).map_err(|_| {
                    de::Error::custom(format!("expected a numeric id, got '{s}'"))
                })
            }
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    /// `super_admin`, `rd_department` or `other_department`.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub role: String,
    /// Department to link, `other_department` only.
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(custom(function = "not_empty_trimmed"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Body of `/auth/refresh` and `/auth/logout`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

// ============================================================================
// Departments and couriers
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub name: String,
    #[validate(
        length(min = 1, max = 20, message = "Code must be 1-20 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub code: String,
    #[serde(default)]
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub head: String,
    #[serde(default)]
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub contact: String,
    /// `active` (default) or `inactive`.
    pub status: Option<String>,
    /// Login of the department's account.
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDepartmentRequest {
    #[validate(length(min = 1, max = 100), custom(function = "not_empty_trimmed"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20), custom(function = "not_empty_trimmed"))]
    pub code: Option<String>,
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub head: Option<String>,
    #[validate(length(max = 100), custom(function = "no_control_chars"))]
    pub contact: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourierRequest {
    #[validate(
        length(min = 1, max = 100, message = "Service name must be 1-100 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub service_name: String,
    #[validate(
        length(min = 1, max = 20, message = "Code must be 1-20 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub code: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub contact_person: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub address: String,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourierRequest {
    #[validate(length(min = 1, max = 100), custom(function = "not_empty_trimmed"))]
    pub service_name: Option<String>,
    #[validate(length(min = 1, max = 20), custom(function = "not_empty_trimmed"))]
    pub code: Option<String>,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub status: Option<String>,
}

// ============================================================================
// Letters
// ============================================================================

/// Incoming letter create body (JSON or multipart with an `image` file).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncomingRequest {
    /// Generated when absent.
    #[validate(length(max = 64), custom(function = "no_control_chars"))]
    pub qr_code: Option<String>,
    /// Outside sender.
    #[validate(
        length(min = 1, max = 200, message = "Sender must be 1-200 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub from: String,
    /// Receiving department id.
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    #[validate(required(message = "Department is required"))]
    pub to: Option<i64>,
    pub priority: Option<String>,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub filing: Option<String>,
    pub status: Option<String>,
    pub received_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIncomingRequest {
    #[validate(length(min = 1, max = 200), custom(function = "not_empty_trimmed"))]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    pub to: Option<i64>,
    pub priority: Option<String>,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 200))]
    pub filing: Option<String>,
    pub status: Option<String>,
    pub received_date: Option<String>,
}

/// Outgoing letter create body (JSON or multipart with an `image` file).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutgoingRequest {
    #[validate(length(max = 64), custom(function = "no_control_chars"))]
    pub qr_code: Option<String>,
    /// Sending department id.
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    #[validate(required(message = "Department is required"))]
    pub from: Option<i64>,
    /// Outside recipient.
    #[validate(
        length(min = 1, max = 200, message = "Recipient must be 1-200 characters"),
        custom(function = "not_empty_trimmed")
    )]
    pub to: String,
    pub priority: Option<String>,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    pub courier_id: Option<i64>,
    pub dispatched_date: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutgoingRequest {
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    pub from: Option<i64>,
    #[validate(length(min = 1, max = 200), custom(function = "not_empty_trimmed"))]
    pub to: Option<String>,
    pub priority: Option<String>,
    #[validate(length(max = 200))]
    pub subject: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_lenient")]
    pub courier_id: Option<i64>,
    pub dispatched_date: Option<String>,
    pub delivered_date: Option<String>,
}

/// Body of the status update endpoints.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StatusUpdateRequest {
    /// Status enum name or display string.
    #[validate(custom(function = "not_empty_trimmed"))]
    pub status: String,
}

// ============================================================================
// Query strings
// ============================================================================

/// Department and courier list filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DirectoryListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// `active` or `inactive`.
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LetterListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Status enum name or display string.
    pub status: Option<String>,
    pub priority: Option<String>,
    /// Substring of QR code, subject, or counterparty.
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Only unread notifications.
    pub unread: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrackingListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// `incoming`, `outgoing` or `all`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Display string or status enum name of either kind.
    pub status: Option<String>,
    pub priority: Option<String>,
}
