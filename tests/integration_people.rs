#![cfg(feature = "db-tests")]

mod common;

use axum::http::StatusCode;
use common::{create_account, generate_unique_email, id_of, link_parent, send, setup_test_app};
use registrar::registrar_auth::Role;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "./migrations")]
async fn test_created_teacher_can_log_in(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let app = setup_test_app(pool);
    let email = generate_unique_email();

    let (status, teacher) = send(
        &app,
        "POST",
        "/api/teachers",
        Some(&admin.token),
        Some(json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": email,
            "password": "cobol-forever"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(teacher["user_id"].is_string());

    let (status, login) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "cobol-forever" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = login["access_token"].as_str().unwrap();
    let (status, me) = send(&app, "GET", "/api/teachers/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], teacher["id"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_email_is_a_conflict(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let existing = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/students",
        Some(&admin.token),
        Some(json!({
            "first_name": "Copy",
            "last_name": "Cat",
            "email": existing.email,
            "password": "password123"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_can_only_read_self(pool: PgPool) {
    let alice = create_account(&pool, Role::Student).await;
    let bob = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/students/{}", alice.profile()),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/students/{}", bob.profile()),
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = send(&app, "GET", "/api/students", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = list["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![alice.profile().to_string()]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_reads_linked_children_only(pool: PgPool) {
    let parent = create_account(&pool, Role::Parent).await;
    let child = create_account(&pool, Role::Student).await;
    let stranger = create_account(&pool, Role::Student).await;
    link_parent(&pool, child.profile(), parent.profile()).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/students/{}", child.profile()),
        Some(&parent.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/students/{}", stranger.profile()),
        Some(&parent.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = send(&app, "GET", "/api/students", Some(&parent.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_teacher_lists_all_students(pool: PgPool) {
    let teacher = create_account(&pool, Role::Teacher).await;
    create_account(&pool, Role::Student).await;
    create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool);

    let (status, list) = send(&app, "GET", "/api/students", Some(&teacher.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_student_removes_account(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let student = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool.clone());

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/students/{}", student.profile()),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(student.user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_with_unknown_parent_is_rejected(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/students",
        Some(&admin.token),
        Some(json!({
            "first_name": "Orphan",
            "last_name": "Record",
            "email": generate_unique_email(),
            "password": "password123",
            "parent_id": Uuid::new_v4()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_profile_lists_children(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let parent = create_account(&pool, Role::Parent).await;
    let child = create_account(&pool, Role::Student).await;
    link_parent(&pool, child.profile(), parent.profile()).await;
    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/parents/{}", parent.profile()),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(id_of(&body), parent.profile());
    let children = body["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["id"], child.profile().to_string());

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/parents/{}", parent.profile()),
        Some(&child.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
