//! Shared helpers for the HTTP API integration tests.
//!
//! Each test gets its own in-memory database, upload directory, and a
//! bootstrapped super admin.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use mailroom::config::AuthConfig;
use mailroom::media::ImageStorage;
use mailroom::web::handlers::AppState;
use mailroom::web::middleware::{JwtState, RateLimitState};
use mailroom::web::router::create_router;
use mailroom::{ensure_super_admin, Database};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const USER_PASSWORD: &str = "password123";

pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub uploads: TempDir,
    pub admin_token: String,
}

/// `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        ensure_super_admin(db.pool(), ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .expect("Failed to create super admin");

        let uploads = TempDir::new().expect("Failed to create upload directory");
        let images = ImageStorage::new(uploads.path(), "/uploads", 1024 * 1024)
            .expect("Failed to create image storage");

        let auth = AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only".to_string(),
            ..AuthConfig::default()
        };
        let app_state = Arc::new(AppState::new(db.clone(), images, &auth));
        let jwt_state = Arc::new(JwtState::new(&auth.jwt_secret, &auth.jwt_issuer));
        // Every test request shares one client address.
        let limiter = Arc::new(RateLimitState::new(10_000));

        let router = create_router(app_state, jwt_state, limiter, &[]);
        let server = TestServer::new(router).expect("Failed to create test server");

        let mut app = Self {
            server,
            db,
            uploads,
            admin_token: String::new(),
        };
        app.admin_token = app.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        app
    }

    /// Log in and return the access token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .await;
        response.assert_status_ok();
        access_token(&response.json::<Value>())
    }

    /// Sign up an account and return its access token.
    pub async fn signup(&self, username: &str, role: &str, department_id: Option<i64>) -> String {
        let response = self
            .server
            .post("/api/v1/auth/signup")
            .json(&json!({
                "username": username,
                "password": USER_PASSWORD,
                "role": role,
                "departmentId": department_id,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        access_token(&response.json::<Value>())
    }

    /// Create a department with its account (`username` / USER_PASSWORD).
    pub async fn create_department(&self, name: &str, code: &str, username: &str) -> i64 {
        let response = self
            .server
            .post("/api/v1/departments")
            .add_header(AUTHORIZATION, bearer(&self.admin_token))
            .json(&json!({
                "name": name,
                "code": code,
                "head": "Head of Office",
                "contact": "ext. 100",
                "username": username,
                "password": USER_PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_courier(&self, name: &str, code: &str) -> i64 {
        let response = self
            .server
            .post("/api/v1/couriers")
            .add_header(AUTHORIZATION, bearer(&self.admin_token))
            .json(&json!({
                "serviceName": name,
                "code": code,
                "contactPerson": "Dispatcher",
                "email": format!("{}@couriers.example.com", code.to_lowercase()),
                "phone": "555-0100",
                "address": "1 Depot Road",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"]["id"].as_i64().unwrap()
    }

    /// Record an incoming letter and return its `data` object.
    pub async fn create_incoming(&self, token: &str, department_id: i64, qr_code: &str) -> Value {
        let response = self
            .server
            .post("/api/v1/incoming")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({
                "qrCode": qr_code,
                "from": "Ministry of Finance",
                "to": department_id,
                "priority": "high",
                "subject": format!("Letter {}", qr_code),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    /// Record an outgoing letter and return its `data` object.
    pub async fn create_outgoing(&self, token: &str, department_id: i64, qr_code: &str) -> Value {
        let response = self
            .server
            .post("/api/v1/outgoing")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({
                "qrCode": qr_code,
                "from": department_id,
                "to": "City Council",
                "subject": format!("Reply {}", qr_code),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    /// GET a path as `token` and return the JSON body, asserting 200.
    pub async fn get_json(&self, path: &str, token: &str) -> Value {
        let response = self
            .server
            .get(path)
            .add_header(AUTHORIZATION, bearer(token))
            .await;
        response.assert_status_ok();
        response.json::<Value>()
    }
}

pub fn access_token(body: &Value) -> String {
    body["data"]["accessToken"]
        .as_str()
        .expect("No access token in response")
        .to_string()
}

pub fn refresh_token(body: &Value) -> String {
    body["data"]["refreshToken"]
        .as_str()
        .expect("No refresh token in response")
        .to_string()
}
