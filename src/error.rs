//! Error types for mailroom.

use thiserror::Error;

/// Common error type for mailroom.
#[derive(Error, Debug)]
pub enum MailroomError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A unique value is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Image storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for MailroomError {
    fn from(e: sqlx::Error) -> Self {
        MailroomError::Database(e.to_string())
    }
}

/// Result type alias for mailroom operations.
pub type Result<T> = std::result::Result<T, MailroomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = MailroomError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_permission_error_display() {
        let err = MailroomError::Permission("super admin access required".to_string());
        assert_eq!(
            err.to_string(),
            "permission denied: super admin access required"
        );
    }

    #[test]
    fn test_not_found_error_display() {
        let err = MailroomError::NotFound("incoming letter".to_string());
        assert_eq!(err.to_string(), "incoming letter not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = MailroomError::Conflict("department code already exists".to_string());
        assert_eq!(err.to_string(), "conflict: department code already exists");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MailroomError = io_err.into();
        assert!(matches!(err, MailroomError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: MailroomError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, MailroomError::Database(_)));
    }
}
