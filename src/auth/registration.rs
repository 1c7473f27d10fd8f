//! Account registration for mailroom.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_password_not_username, validate_username, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{DbPool, NewUser, Role, User, UserRepository};
use crate::department::DepartmentRepository;
use crate::MailroomError;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("username already exists")]
    UsernameExists,

    #[error("{0}")]
    Password(#[from] PasswordError),

    #[error("only other_department accounts can be linked to a department")]
    DepartmentNotAllowed,

    #[error("department")]
    DepartmentNotFound,

    #[error("department already has a linked user")]
    DepartmentTaken,

    #[error("database error: {0}")]
    Database(String),
}

impl From<MailroomError> for RegistrationError {
    fn from(e: MailroomError) -> Self {
        RegistrationError::Database(e.to_string())
    }
}

impl From<RegistrationError> for MailroomError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Validation(_)
            | RegistrationError::Password(PasswordError::TooShort)
            | RegistrationError::Password(PasswordError::TooLong)
            | RegistrationError::DepartmentNotAllowed => MailroomError::Validation(e.to_string()),
            RegistrationError::UsernameExists | RegistrationError::DepartmentTaken => {
                MailroomError::Conflict(e.to_string())
            }
            RegistrationError::DepartmentNotFound => MailroomError::NotFound(e.to_string()),
            RegistrationError::Password(_) | RegistrationError::Database(_) => {
                MailroomError::Database(e.to_string())
            }
        }
    }
}

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    pub role: Role,
    /// Department to link, for `other_department` accounts.
    pub department_id: Option<i64>,
}

impl RegistrationRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
            department_id: None,
        }
    }

    pub fn with_department(mut self, department_id: i64) -> Self {
        self.department_id = Some(department_id);
        self
    }
}

/// Register a new account.
///
/// Validates the input, checks the username and the optional department
/// link, hashes the password, and inserts the user. A department link is
/// written in the same transaction as the user row.
pub async fn register(
    pool: &DbPool,
    request: RegistrationRequest,
) -> std::result::Result<User, RegistrationError> {
    let username = request.username.trim();
    validate_username(username)?;
    validate_password_not_username(&request.password, username)?;

    let users = UserRepository::new(pool);
    if users.username_exists(username).await? {
        return Err(RegistrationError::UsernameExists);
    }

    if let Some(department_id) = request.department_id {
        if request.role != Role::OtherDepartment {
            return Err(RegistrationError::DepartmentNotAllowed);
        }
        let department = DepartmentRepository::new(pool)
            .get_by_id(department_id)
            .await?
            .ok_or(RegistrationError::DepartmentNotFound)?;
        if department.user_id.is_some() {
            return Err(RegistrationError::DepartmentTaken);
        }
    }

    let password_hash = hash_password(&request.password)?;
    let new_user = NewUser::new(username, password_hash, request.role);

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?;
    let user_id = UserRepository::insert(&mut *tx, &new_user).await?;
    if let Some(department_id) = request.department_id {
        // Guarded on user_id IS NULL, so a concurrent link loses here.
        if !DepartmentRepository::link_user(&mut *tx, department_id, user_id).await? {
            return Err(RegistrationError::DepartmentTaken);
        }
    }
    tx.commit()
        .await
        .map_err(|e| RegistrationError::Database(e.to_string()))?;

    info!(
        "Registered user {} ({}) with role {}",
        username, user_id, request.role
    );

    users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| RegistrationError::Database("user vanished after insert".to_string()))
}

/// Create the configured super admin if no super admin exists yet.
///
/// Returns the created user, or None when one already exists.
pub async fn ensure_super_admin(
    pool: &DbPool,
    username: &str,
    password: &str,
) -> std::result::Result<Option<User>, RegistrationError> {
    if UserRepository::new(pool).count_by_role(Role::SuperAdmin).await? > 0 {
        return Ok(None);
    }
    let user = register(
        pool,
        RegistrationRequest::new(username, password, Role::SuperAdmin),
    )
    .await?;
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::department::NewDepartment;
    use crate::Database;

    async fn create_department(db: &Database, code: &str) -> i64 {
        DepartmentRepository::insert(db.pool(), &NewDepartment::new("Finance", code), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_success() {
        let db = Database::open_in_memory().await.unwrap();
        let user = register(
            db.pool(),
            RegistrationRequest::new("registry", "password123", Role::RdDepartment),
        )
        .await
        .unwrap();

        assert_eq!(user.username, "registry");
        assert_eq!(user.role, Role::RdDepartment);
        assert!(user.password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let db = Database::open_in_memory().await.unwrap();
        register(
            db.pool(),
            RegistrationRequest::new("registry", "password123", Role::RdDepartment),
        )
        .await
        .unwrap();

        let result = register(
            db.pool(),
            RegistrationRequest::new("Registry", "password123", Role::RdDepartment),
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::UsernameExists)));
    }

    #[tokio::test]
    async fn test_register_invalid_input() {
        let db = Database::open_in_memory().await.unwrap();
        let result = register(
            db.pool(),
            RegistrationRequest::new("x", "password123", Role::RdDepartment),
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::Validation(_))));

        let result = register(
            db.pool(),
            RegistrationRequest::new("someone", "short", Role::RdDepartment),
        )
        .await;
        assert!(matches!(
            result,
            Err(RegistrationError::Password(PasswordError::TooShort))
        ));
    }

    #[tokio::test]
    async fn test_register_links_department() {
        let db = Database::open_in_memory().await.unwrap();
        let department_id = create_department(&db, "FIN").await;

        let user = register(
            db.pool(),
            RegistrationRequest::new("finance", "password123", Role::OtherDepartment)
                .with_department(department_id),
        )
        .await
        .unwrap();
        assert_eq!(user.department_id, Some(department_id));

        let second = register(
            db.pool(),
            RegistrationRequest::new("finance2", "password123", Role::OtherDepartment)
                .with_department(department_id),
        )
        .await;
        assert!(matches!(second, Err(RegistrationError::DepartmentTaken)));
    }

    #[tokio::test]
    async fn test_register_department_rules() {
        let db = Database::open_in_memory().await.unwrap();
        let department_id = create_department(&db, "HR").await;

        let result = register(
            db.pool(),
            RegistrationRequest::new("registry", "password123", Role::RdDepartment)
                .with_department(department_id),
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::DepartmentNotAllowed)));

        let result = register(
            db.pool(),
            RegistrationRequest::new("ghost", "password123", Role::OtherDepartment)
                .with_department(999),
        )
        .await;
        assert!(matches!(result, Err(RegistrationError::DepartmentNotFound)));
    }

    #[tokio::test]
    async fn test_ensure_super_admin_once() {
        let db = Database::open_in_memory().await.unwrap();
        let created = ensure_super_admin(db.pool(), "admin", "admin-password")
            .await
            .unwrap();
        assert!(created.is_some());

        let again = ensure_super_admin(db.pool(), "admin2", "admin-password")
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_error_mapping() {
        let err: MailroomError = RegistrationError::UsernameExists.into();
        assert!(matches!(err, MailroomError::Conflict(_)));
        let err: MailroomError = RegistrationError::DepartmentNotFound.into();
        assert!(matches!(err, MailroomError::NotFound(_)));
        let err: MailroomError = RegistrationError::Password(PasswordError::TooShort).into();
        assert!(matches!(err, MailroomError::Validation(_)));
    }
}
