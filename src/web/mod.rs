//! HTTP API for the mailroom.
//!
//! JSON REST endpoints for accounts, the department and courier
//! directories, letters, notifications, and tracking, plus Swagger UI and
//! the uploaded letter images.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
