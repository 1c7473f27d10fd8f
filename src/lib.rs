//! Mailroom - department mail tracking backend
//!
//! Records letters received from outside and letters sent out by
//! departments, tracks them by QR code through their status lifecycle, and
//! notifies the departments involved.

pub mod auth;
pub mod config;
pub mod courier;
pub mod datetime;
pub mod db;
pub mod department;
pub mod error;
pub mod letter;
pub mod logging;
pub mod media;
pub mod notification;
pub mod tracking;
pub mod web;

pub use auth::{
    ensure_super_admin, hash_password, register, validate_password, verify_password,
    PasswordError, RegistrationError, RegistrationRequest,
};
pub use config::Config;
pub use db::{Database, DbPool, NewUser, Role, User, UserRepository};
pub use error::{MailroomError, Result};
pub use web::WebServer;
