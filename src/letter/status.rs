//! Letter priorities and status vocabularies.
//!
//! Incoming and outgoing letters have separate status enumerations. The
//! tracking view shows both through a shared display vocabulary; every
//! conversion between the two goes through [`STATUS_TABLE`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MailroomError, Result};

/// Letter priority.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = MailroomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(MailroomError::Validation(format!(
                "unknown priority '{s}' (expected high, medium or low)"
            ))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an incoming letter.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomingStatus {
    #[default]
    Received,
    Transferred,
    Collected,
    Archived,
}

/// Status of an outgoing letter.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    utoipa::ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingStatus {
    #[default]
    PendingDispatch,
    Dispatched,
    Delivered,
    Returned,
}

/// One row per lifecycle stage: incoming status, outgoing status, and the
/// display label each kind uses for it.
pub struct StatusRow {
    pub incoming: IncomingStatus,
    pub outgoing: OutgoingStatus,
    pub incoming_label: &'static str,
    pub outgoing_label: &'static str,
}

/// The single status mapping table.
pub static STATUS_TABLE: [StatusRow; 4] = [
    StatusRow {
        incoming: IncomingStatus::Received,
        outgoing: OutgoingStatus::PendingDispatch,
        incoming_label: "Pending",
        outgoing_label: "Pending",
    },
    StatusRow {
        incoming: IncomingStatus::Transferred,
        outgoing: OutgoingStatus::Dispatched,
        incoming_label: "In Progress",
        outgoing_label: "Handled to Courier",
    },
    StatusRow {
        incoming: IncomingStatus::Collected,
        outgoing: OutgoingStatus::Delivered,
        incoming_label: "Collected",
        outgoing_label: "Delivered",
    },
    StatusRow {
        incoming: IncomingStatus::Archived,
        outgoing: OutgoingStatus::Returned,
        incoming_label: "Archived",
        outgoing_label: "Returned",
    },
];

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Enum name with separators folded, so `pending_dispatch`, `PENDING-DISPATCH`
/// and `Pending Dispatch` compare equal.
fn normalize_enum_name(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

impl IncomingStatus {
    pub const ALL: [IncomingStatus; 4] = [
        IncomingStatus::Received,
        IncomingStatus::Transferred,
        IncomingStatus::Collected,
        IncomingStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomingStatus::Received => "RECEIVED",
            IncomingStatus::Transferred => "TRANSFERRED",
            IncomingStatus::Collected => "COLLECTED",
            IncomingStatus::Archived => "ARCHIVED",
        }
    }

    fn row(&self) -> &'static StatusRow {
        // Every variant has exactly one row.
        STATUS_TABLE
            .iter()
            .find(|row| row.incoming == *self)
            .unwrap_or(&STATUS_TABLE[0])
    }

    /// Display label used by the tracking view.
    pub fn display_label(&self) -> &'static str {
        self.row().incoming_label
    }

    /// Resolve an incoming display label (case-insensitive).
    pub fn from_display_label(label: &str) -> Option<Self> {
        let label = normalize(label);
        STATUS_TABLE
            .iter()
            .find(|row| row.incoming_label.to_lowercase() == label)
            .map(|row| row.incoming)
    }

    /// Resolve either an enum name or a display label.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        s.parse().ok().or_else(|| Self::from_display_label(s))
    }
}

impl FromStr for IncomingStatus {
    type Err = MailroomError;

    fn from_str(s: &str) -> Result<Self> {
        let name = normalize_enum_name(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == name)
            .ok_or_else(|| {
                MailroomError::Validation(format!("unknown incoming letter status '{s}'"))
            })
    }
}

impl fmt::Display for IncomingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OutgoingStatus {
    pub const ALL: [OutgoingStatus; 4] = [
        OutgoingStatus::PendingDispatch,
        OutgoingStatus::Dispatched,
        OutgoingStatus::Delivered,
        OutgoingStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutgoingStatus::PendingDispatch => "PENDING_DISPATCH",
            OutgoingStatus::Dispatched => "DISPATCHED",
            OutgoingStatus::Delivered => "DELIVERED",
            OutgoingStatus::Returned => "RETURNED",
        }
    }

    fn row(&self) -> &'static StatusRow {
        STATUS_TABLE
            .iter()
            .find(|row| row.outgoing == *self)
            .unwrap_or(&STATUS_TABLE[0])
    }

    pub fn display_label(&self) -> &'static str {
        self.row().outgoing_label
    }

    /// Resolve an outgoing display label (case-insensitive).
    pub fn from_display_label(label: &str) -> Option<Self> {
        let label = normalize(label);
        STATUS_TABLE
            .iter()
            .find(|row| row.outgoing_label.to_lowercase() == label)
            .map(|row| row.outgoing)
    }

    pub fn parse_lenient(s: &str) -> Option<Self> {
        s.parse().ok().or_else(|| Self::from_display_label(s))
    }
}

impl FromStr for OutgoingStatus {
    type Err = MailroomError;

    fn from_str(s: &str) -> Result<Self> {
        let name = normalize_enum_name(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == name)
            .ok_or_else(|| {
                MailroomError::Validation(format!("unknown outgoing letter status '{s}'"))
            })
    }
}

impl fmt::Display for OutgoingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status filter resolved against both vocabularies.
///
/// A side is `None` when the input names nothing of that kind; such a side
/// matches no letters. `Pending` resolves on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusFilter {
    pub incoming: Option<IncomingStatus>,
    pub outgoing: Option<OutgoingStatus>,
}

impl StatusFilter {
    /// Resolve a filter string; fails when neither kind recognizes it.
    pub fn parse(s: &str) -> Result<Self> {
        let filter = Self {
            incoming: IncomingStatus::parse_lenient(s),
            outgoing: OutgoingStatus::parse_lenient(s),
        };
        if filter.incoming.is_none() && filter.outgoing.is_none() {
            return Err(MailroomError::Validation(format!("unknown status '{s}'")));
        }
        Ok(filter)
    }
}
