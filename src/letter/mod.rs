//! Incoming and outgoing letters.
//!
//! An incoming letter arrives from an outside sender and is addressed to a
//! department; an outgoing letter leaves a department for an outside
//! recipient, optionally through a courier. The department on each letter is
//! its counterparty department, which drives visibility and notifications.

pub mod access;
mod incoming;
mod outgoing;
mod service;
pub mod status;

use std::fmt;

use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

pub use access::{LetterScope, Viewer};
pub use incoming::{
    IncomingFilter, IncomingLetter, IncomingLetterUpdate, IncomingRepository, NewIncomingLetter,
};
pub use outgoing::{
    NewOutgoingLetter, OutgoingFilter, OutgoingLetter, OutgoingLetterUpdate, OutgoingRepository,
};
pub use service::{LetterService, StatusChange};
pub use status::{IncomingStatus, OutgoingStatus, Priority, StatusFilter};

/// Letter kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LetterKind {
    Incoming,
    Outgoing,
}

impl LetterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterKind::Incoming => "incoming",
            LetterKind::Outgoing => "outgoing",
        }
    }

    fn qr_prefix(&self) -> &'static str {
        match self {
            LetterKind::Incoming => "IN",
            LetterKind::Outgoing => "OUT",
        }
    }
}

impl fmt::Display for LetterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a QR code value such as `IN-3F9A0C12B7D4`.
pub fn generate_qr_code(kind: LetterKind) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}", kind.qr_prefix(), &hex[..12])
}

/// Escape a search term for `LIKE ... ESCAPE '\'`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Append the scope restriction on `l.department_id`.
fn push_scope(query: &mut QueryBuilder<'_, Sqlite>, scope: LetterScope) {
    match scope {
        LetterScope::All => {}
        LetterScope::Department(id) => {
            query.push(" AND l.department_id = ");
            query.push_bind(id);
        }
        LetterScope::Nothing => {
            query.push(" AND 0");
        }
    }
}

/// Append a case-insensitive substring match over the given columns.
fn push_search(query: &mut QueryBuilder<'_, Sqlite>, search: Option<&str>, columns: &[&str]) {
    let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    let pattern = like_pattern(term);
    query.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        query.push(*column);
        query.push(" LIKE ");
        query.push_bind(pattern.clone());
        query.push(" ESCAPE '\\'");
    }
    query.push(")");
}
