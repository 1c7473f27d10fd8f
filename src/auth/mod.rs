//! Authentication module for mailroom.
//!
//! Password hashing, account input rules, and registration. Token issuance
//! and verification live in the web layer.

mod password;
mod registration;
pub mod validation;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use registration::{ensure_super_admin, register, RegistrationError, RegistrationRequest};
pub use validation::ValidationError;
