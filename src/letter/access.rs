//! Who may see and change which letters.

use crate::db::{DbPool, Role, UserRepository};
use crate::{MailroomError, Result};

/// The set of letters a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterScope {
    /// Every letter.
    All,
    /// Letters whose counterparty department is this one.
    Department(i64),
    /// No letters (an `other_department` account without a department).
    Nothing,
}

impl LetterScope {
    /// Whether a letter with the given counterparty department is visible.
    pub fn covers(&self, department_id: i64) -> bool {
        match self {
            LetterScope::All => true,
            LetterScope::Department(id) => *id == department_id,
            LetterScope::Nothing => false,
        }
    }
}

/// The authenticated caller, as seen by letter, notification, and tracking
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: i64,
    pub role: Role,
    pub department_id: Option<i64>,
}

impl Viewer {
    pub fn new(user_id: i64, role: Role, department_id: Option<i64>) -> Self {
        Self {
            user_id,
            role,
            department_id,
        }
    }

    /// Load the caller's current role and department.
    ///
    /// A token for a deleted account is an authentication failure.
    pub async fn load(pool: &DbPool, user_id: i64) -> Result<Self> {
        let user = UserRepository::new(pool)
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| MailroomError::Auth("account no longer exists".to_string()))?;
        Ok(Self::new(user.id, user.role, user.department_id))
    }

    pub fn scope(&self) -> LetterScope {
        if self.role.sees_all_departments() {
            return LetterScope::All;
        }
        match self.department_id {
            Some(id) => LetterScope::Department(id),
            None => LetterScope::Nothing,
        }
    }

    /// Create, edit, and delete incoming letters.
    pub fn can_manage_incoming(&self) -> bool {
        self.role.sees_all_departments()
    }

    /// Fail with a permission error unless the letter is in scope.
    pub fn ensure_covers(&self, department_id: i64) -> Result<()> {
        if self.scope().covers(department_id) {
            Ok(())
        } else {
            Err(MailroomError::Permission(
                "letter belongs to another department".to_string(),
            ))
        }
    }

    /// Fail unless the caller may send from `department_id`.
    pub fn ensure_can_send_from(&self, department_id: i64) -> Result<()> {
        if self.scope().covers(department_id) {
            Ok(())
        } else {
            Err(MailroomError::Permission(
                "you can only send letters from your own department".to_string(),
            ))
        }
    }

    pub fn ensure_can_manage_incoming(&self) -> Result<()> {
        if self.can_manage_incoming() {
            Ok(())
        } else {
            Err(MailroomError::Permission(
                "only super_admin and rd_department can manage incoming letters".to_string(),
            ))
        }
    }
}
