//! Account input rules.

use thiserror::Error;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    #[error("username can only contain letters, digits, '_', '.' and '-'")]
    UsernameInvalidChars,

    #[error("password cannot be the same as username")]
    PasswordSameAsUsername,
}

/// Validate a username.
///
/// ```
/// use mailroom::auth::validation::validate_username;
///
/// assert!(validate_username("records.office").is_ok());
/// assert!(validate_username("ab").is_err());
/// assert!(validate_username("has space").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Reject a password equal to the username (ignoring ASCII case).
pub fn validate_password_not_username(
    password: &str,
    username: &str,
) -> Result<(), ValidationError> {
    if password.eq_ignore_ascii_case(username) {
        return Err(ValidationError::PasswordSameAsUsername);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_length() {
        assert_eq!(validate_username("ab"), Err(ValidationError::UsernameTooShort));
        assert!(validate_username("abc").is_ok());
        assert_eq!(
            validate_username(&"a".repeat(MAX_USERNAME_LENGTH + 1)),
            Err(ValidationError::UsernameTooLong)
        );
    }

    #[test]
    fn test_username_chars() {
        assert!(validate_username("rd-office_1.main").is_ok());
        assert_eq!(
            validate_username("bad name"),
            Err(ValidationError::UsernameInvalidChars)
        );
        assert_eq!(
            validate_username("naïve"),
            Err(ValidationError::UsernameInvalidChars)
        );
    }

    #[test]
    fn test_password_not_username() {
        assert!(validate_password_not_username("registry1", "registry").is_ok());
        assert_eq!(
            validate_password_not_username("Registry", "registry"),
            Err(ValidationError::PasswordSameAsUsername)
        );
    }
}
