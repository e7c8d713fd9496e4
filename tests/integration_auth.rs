#![cfg(feature = "db-tests")]

mod common;

use axum::http::StatusCode;
use common::{TEST_PASSWORD, create_account, send, setup_test_app};
use registrar::registrar_auth::{Role, verify_token};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn test_login_success(pool: PgPool) {
    let account = create_account(&pool, Role::Teacher).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": account.email, "password": TEST_PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["email"], account.email.as_str());
    assert_eq!(body["user"]["role"], "teacher");
    assert!(body["user"].get("password").is_none());

    let claims = verify_token(
        body["access_token"].as_str().unwrap(),
        &common::jwt_config(),
    )
    .unwrap();
    assert_eq!(claims.sub, account.user_id.to_string());
    assert_eq!(claims.role, Role::Teacher);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_wrong_password(pool: PgPool) {
    let account = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": account.email, "password": "wrong-password" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_login_unknown_email_matches_wrong_password(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@test.com", "password": TEST_PASSWORD })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_me_includes_profile_id(pool: PgPool) {
    let student = create_account(&pool, Role::Student).await;
    let admin = create_account(&pool, Role::Admin).await;
    let app = setup_test_app(pool);

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], student.email.as_str());
    assert_eq!(body["profile_id"], student.profile().to_string());

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    assert!(body["profile_id"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_change_password_then_login(pool: PgPool) {
    let account = create_account(&pool, Role::Parent).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&account.token),
        Some(json!({ "current_password": "not-it", "new_password": "brand-new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/change-password",
        Some(&account.token),
        Some(json!({ "current_password": TEST_PASSWORD, "new_password": "brand-new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": account.email, "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": account.email, "password": "brand-new-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
