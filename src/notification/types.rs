//! Notification types.

use crate::letter::{LetterKind, Viewer};

/// A notification addressed to one user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    pub incoming_id: Option<i64>,
    pub outgoing_id: Option<i64>,
    /// QR code of the referenced letter, if it still exists.
    pub qr_code: Option<String>,
    pub department_id: Option<i64>,
    pub user_id: Option<i64>,
    pub is_read: bool,
    pub created_at: String,
}

impl Notification {
    /// Kind and id of the letter the notification is about.
    pub fn letter(&self) -> Option<(LetterKind, i64)> {
        match (self.incoming_id, self.outgoing_id) {
            (Some(id), _) => Some((LetterKind::Incoming, id)),
            (None, Some(id)) => Some((LetterKind::Outgoing, id)),
            (None, None) => None,
        }
    }
}

/// A notification row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub message: String,
    pub incoming_id: Option<i64>,
    pub outgoing_id: Option<i64>,
    pub department_id: Option<i64>,
    pub user_id: i64,
}

/// Which notifications a reader may touch.
///
/// `super_admin` and `rd_department` readers see every notification.
/// `other_department` readers see their own notifications about their
/// department, or about no department at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationScope {
    All,
    Department {
        user_id: i64,
        department_id: Option<i64>,
    },
}

impl From<&Viewer> for NotificationScope {
    fn from(viewer: &Viewer) -> Self {
        if viewer.role.sees_all_departments() {
            NotificationScope::All
        } else {
            NotificationScope::Department {
                user_id: viewer.user_id,
                department_id: viewer.department_id,
            }
        }
    }
}

/// What happened to a letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LetterEvent {
    Created,
    StatusChanged {
        from: &'static str,
        to: &'static str,
    },
}

/// A letter event, ready to be fanned out.
#[derive(Debug, Clone)]
pub struct LetterNotice {
    pub kind: LetterKind,
    pub letter_id: i64,
    pub qr_code: String,
    /// Counterparty department of the letter.
    pub department_id: i64,
    pub department_name: Option<String>,
    /// Outside party: sender for incoming, recipient for outgoing.
    pub counterparty: String,
    pub event: LetterEvent,
}

impl LetterNotice {
    pub fn message(&self) -> String {
        let department = self.department_name.as_deref().unwrap_or("unknown department");
        match (&self.event, self.kind) {
            (LetterEvent::Created, LetterKind::Incoming) => format!(
                "New incoming letter {} from {} for {}",
                self.qr_code, self.counterparty, department
            ),
            (LetterEvent::Created, LetterKind::Outgoing) => format!(
                "New outgoing letter {} from {} to {}",
                self.qr_code, department, self.counterparty
            ),
            (LetterEvent::StatusChanged { from, to }, LetterKind::Incoming) => format!(
                "Incoming letter {} status changed from {} to {}",
                self.qr_code, from, to
            ),
            (LetterEvent::StatusChanged { from, to }, LetterKind::Outgoing) => format!(
                "Outgoing letter {} status changed from {} to {}",
                self.qr_code, from, to
            ),
        }
    }

    /// One notification row for `user_id`.
    pub fn to_row(&self, message: &str, user_id: i64) -> NewNotification {
        let (incoming_id, outgoing_id) = match self.kind {
            LetterKind::Incoming => (Some(self.letter_id), None),
            LetterKind::Outgoing => (None, Some(self.letter_id)),
        };
        NewNotification {
            message: message.to_string(),
            incoming_id,
            outgoing_id,
            department_id: Some(self.department_id),
            user_id,
        }
    }
}
