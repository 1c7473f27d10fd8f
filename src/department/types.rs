//! Department types.

use crate::db::ActiveStatus;

/// A department, with the username of its linked account when there is one.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Department {
    pub id: i64,
    pub name: String,
    /// Unique short code (case-insensitive).
    pub code: String,
    pub head: String,
    pub contact: String,
    pub status: ActiveStatus,
    /// Linked `other_department` user.
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub created_at: String,
}

/// Data for creating a department.
#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub code: String,
    pub head: String,
    pub contact: String,
    pub status: ActiveStatus,
}

impl NewDepartment {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            head: String::new(),
            contact: String::new(),
            status: ActiveStatus::Active,
        }
    }

    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }

    pub fn with_status(mut self, status: ActiveStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a department.
#[derive(Debug, Clone, Default)]
pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub head: Option<String>,
    pub contact: Option<String>,
    pub status: Option<ActiveStatus>,
}

impl DepartmentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn status(mut self, status: ActiveStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check if no fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.head.is_none()
            && self.contact.is_none()
            && self.status.is_none()
    }
}
