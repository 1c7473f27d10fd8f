//! Web API Department Tests

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{bearer, TestApp, USER_PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_department_with_account() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/v1/departments")
        .add_header(AUTHORIZATION, bearer(&app.admin_token))
        .json(&json!({
            "name": "  Finance ",
            "code": "FIN",
            "head": "Jane Roe",
            "username": "finance",
            "password": USER_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Finance");
    assert_eq!(body["data"]["code"], "FIN");
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["username"], "finance");
    assert!(body["data"]["userId"].is_i64());

    // The account can log in straight away.
    app.login("finance", USER_PASSWORD).await;
}

#[tokio::test]
async fn test_create_department_requires_super_admin() {
    let app = TestApp::new().await;
    let rd_token = app.signup("registry", "rd_department", None).await;

    let response = app
        .server
        .post("/api/v1/departments")
        .add_header(AUTHORIZATION, bearer(&rd_token))
        .json(&json!({
            "name": "Finance",
            "code": "FIN",
            "username": "finance",
            "password": USER_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_code_rejected() {
    let app = TestApp::new().await;
    app.create_department("Finance", "FIN", "finance").await;

    let response = app
        .server
        .post("/api/v1/departments")
        .add_header(AUTHORIZATION, bearer(&app.admin_token))
        .json(&json!({
            "name": "Finance Two",
            "code": "fin",
            "username": "finance2",
            "password": USER_PASSWORD
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_list_departments_paginated_and_filtered() {
    let app = TestApp::new().await;
    for (name, code) in [("Finance", "FIN"), ("Legal", "LEG"), ("Human Resources", "HR")] {
        app.create_department(name, code, &format!("{}_office", code.to_lowercase()))
            .await;
    }
    let page = app.get_json("/api/v1/departments?limit=1&page=2", &app.admin_token).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["currentPage"], 2);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["hasMore"], true);
    assert_eq!(page["records"].as_array().unwrap().len(), 1);

    let id = page["records"][0]["id"].as_i64().unwrap();
    let response = app
        .server
        .put(&format!("/api/v1/departments/{}", id))
        .add_header(AUTHORIZATION, bearer(&app.admin_token))
        .json(&json!({ "status": "inactive" }))
        .await;
    response.assert_status_ok();

    let inactive = app
        .get_json("/api/v1/departments?status=inactive", &app.admin_token)
        .await;
    assert_eq!(inactive["total"], 1);
    assert_eq!(inactive["records"][0]["id"], id);
}

#[tokio::test]
async fn test_department_readable_by_any_user() {
    let app = TestApp::new().await;
    let dept_id = app.create_department("Finance", "FIN", "finance").await;
    let token = app.login("finance", USER_PASSWORD).await;

    let body = app
        .get_json(&format!("/api/v1/departments/{}", dept_id), &token)
        .await;
    assert_eq!(body["data"]["code"], "FIN");

    let response = app
        .server
        .get("/api/v1/departments/999")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_department() {
    let app = TestApp::new().await;
    let dept_id = app.create_department("Finance", "FIN", "finance").await;

    let response = app
        .server
        .put(&format!("/api/v1/departments/{}", dept_id))
        .add_header(AUTHORIZATION, bearer(&app.admin_token))
        .json(&json!({ "name": "Treasury", "contact": "ext. 200" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["name"], "Treasury");
    assert_eq!(body["data"]["contact"], "ext. 200");
    assert_eq!(body["data"]["code"], "FIN");
}

#[tokio::test]
async fn test_delete_department_removes_account() {
    let app = TestApp::new().await;
    let dept_id = app.create_department("Finance", "FIN", "finance").await;

    let response = app
        .server
        .delete(&format!("/api/v1/departments/{}", dept_id))
        .add_header(AUTHORIZATION, bearer(&app.admin_token))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "finance", "password": USER_PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_department_with_letters_refused() {
    let app = TestApp::new().await;
    let dept_id = app.create_department("Finance", "FIN", "finance").await;
    app.create_incoming(&app.admin_token, dept_id, "IN-001").await;
    app.create_incoming(&app.admin_token, dept_id, "IN-002").await;

    let response = app
        .server
        .delete(&format!("/api/v1/departments/{}", dept_id))
        .add_header(AUTHORIZATION, bearer(&app.admin_token))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("2 associated incoming letter"), "{message}");

    // Still there.
    app.get_json(&format!("/api/v1/departments/{}", dept_id), &app.admin_token)
        .await;
}
