//! Notifications about letters.
//!
//! This module provides:
//! - Fan-out of letter events to the users who should hear about them
//! - Per-reader listing with role-derived visibility
//! - Read/unread tracking and deletion by the recipient

mod fanout;
mod repository;
mod types;

pub use fanout::{fan_out, notify, select_recipients};
pub use repository::NotificationRepository;
pub use types::{LetterEvent, LetterNotice, NewNotification, Notification, NotificationScope};
