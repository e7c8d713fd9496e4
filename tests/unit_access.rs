mod common;

use axum::http::StatusCode;
use common::{jwt_config, lazy_pool, send, test_state};
use registrar::registrar_auth::{Role, create_access_token};
use registrar::registrar_config::{JwtConfig, RateLimitConfig};
use registrar::router::init_router;
use serde_json::json;
use uuid::Uuid;

fn app() -> axum::Router {
    init_router(test_state(lazy_pool(), RateLimitConfig::disabled()))
}

fn token_for(role: Role) -> String {
    create_access_token(Uuid::new_v4(), "someone@test.com", role, &jwt_config()).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = send(&app(), "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let other = JwtConfig {
        secret: "not-the-server-secret".to_string(),
        access_token_expiry: 3600,
    };
    let token = create_access_token(Uuid::new_v4(), "a@test.com", Role::Admin, &other).unwrap();

    let (status, _) = send(&app(), "GET", "/api/dashboard/summary", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dashboard_requires_admin() {
    let app = app();
    for role in [Role::Teacher, Role::Student, Role::Parent] {
        let (status, body) = send(
            &app,
            "GET",
            "/api/dashboard/summary",
            Some(&token_for(role)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "role {}", role);
        assert!(body["error"].as_str().unwrap().contains("admin"));
    }
}

#[tokio::test]
async fn test_catalog_writes_require_admin() {
    let app = app();
    let course = json!({
        "name": "Physics",
        "code": "PHY",
        "duration_semesters": 4
    });

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&token_for(Role::Teacher)),
        Some(course.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", "/api/courses", None, Some(course)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_results_upload_is_staff_only() {
    let body = json!({
        "results": [{
            "student_id": Uuid::new_v4(),
            "subject_id": Uuid::new_v4(),
            "score": 55.0
        }]
    });

    let (status, _) = send(
        &app(),
        "POST",
        "/api/results",
        Some(&token_for(Role::Student)),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_invalid_result_batch_is_rejected_before_any_query() {
    let body = json!({
        "results": [{
            "student_id": Uuid::new_v4(),
            "subject_id": Uuid::new_v4(),
            "score": 150.0,
            "grade": "Z"
        }]
    });

    let (status, body) = send(
        &app(),
        "POST",
        "/api/results",
        Some(&token_for(Role::Admin)),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("results[0].score"), "{}", message);
    assert!(message.contains("results[0].grade"), "{}", message);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_verification_token_is_bad_request() {
    let (status, body) = send(
        &app(),
        "GET",
        "/api/admissions/verify-parent?token=short",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Malformed verification token");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, body) = send(&app(), "GET", "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/admissions"].is_object());
    assert!(body["paths"]["/api/lessons/schedule"].is_object());
}
