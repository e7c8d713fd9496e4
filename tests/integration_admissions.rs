#![cfg(feature = "db-tests")]

mod common;

use axum::Router;
use axum::http::StatusCode;
use common::{
    TestAccount, create_account, create_course, id_of, send, set_verification_token,
    setup_test_app,
};
use registrar::registrar_auth::{Role, generate_token};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

fn application(course_id: Uuid, parent_email: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": format!("ada-{}@test.com", Uuid::new_v4()),
        "date_of_birth": "2007-12-10",
        "course_id": course_id,
        "parent_first_name": "Anne",
        "parent_last_name": "Byron",
        "parent_email": parent_email,
        "parent_phone": "+44 20 7946 0000"
    })
}

fn payment(amount_minor: i64) -> Value {
    json!({
        "amount_minor": amount_minor,
        "method": "bank_transfer",
        "reference": format!("TRX-{}", Uuid::new_v4().simple())
    })
}

async fn submit(app: &Router, course_id: Uuid, parent_email: &str) -> Uuid {
    let (status, receipt) = send(
        app,
        "POST",
        "/api/admissions",
        None,
        Some(application(course_id, parent_email)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    id_of(&receipt)
}

async fn verify(app: &Router, pool: &PgPool, admission_id: Uuid) -> (StatusCode, Value) {
    let token = generate_token();
    set_verification_token(pool, admission_id, &token).await;
    send(
        app,
        "GET",
        &format!("/api/admissions/verify-parent?token={}", token),
        None,
        None,
    )
    .await
}

async fn pay_and_approve(app: &Router, admin: &TestAccount, admission_id: Uuid) -> Value {
    let (status, submitted) = send(
        app,
        "POST",
        &format!("/api/admissions/{}/payments", admission_id),
        None,
        Some(payment(5000)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, approved) = send(
        app,
        "POST",
        &format!("/api/payments/{}/approve", id_of(&submitted)),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["reviewed_by"], admin.user_id.to_string());
    approved
}

async fn admission(app: &Router, admin: &TestAccount, id: Uuid) -> Value {
    let (status, body) = send(
        app,
        "GET",
        &format!("/api/admissions/{}", id),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[sqlx::test(migrations = "./migrations")]
async fn test_submit_returns_receipt(pool: PgPool) {
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool);

    let (status, receipt) = send(
        &app,
        "POST",
        "/api/admissions",
        None,
        Some(application(course_id, "anne@test.com")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["status"], "PENDING");
    assert_eq!(receipt["fee_minor"], 5000);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_submit_for_unknown_course(pool: PgPool) {
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/admissions",
        None,
        Some(application(Uuid::new_v4(), "anne@test.com")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_first_then_payment_completes(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;

    let (status, verified) = verify(&app, &pool, id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verified["status"], "PARENT_VERIFIED");

    pay_and_approve(&app, &admin, id).await;

    let completed = admission(&app, &admin, id).await;
    assert_eq!(completed["status"], "COMPLETED");
    assert!(completed["completed_at"].is_string());
    let student_id: Uuid = completed["student_id"].as_str().unwrap().parse().unwrap();

    let (course, parent_email): (Uuid, String) = sqlx::query_as(
        "SELECT s.course_id, p.email FROM students s
         JOIN parents p ON p.id = s.parent_id
         WHERE s.id = $1 AND s.admission_id = $2",
    )
    .bind(student_id)
    .bind(id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(course, course_id);
    assert_eq!(parent_email, "anne@test.com");

    let roles: Vec<String> = sqlx::query_scalar(
        "SELECT role::text FROM users u
         WHERE u.id IN (SELECT user_id FROM students WHERE id = $1
                        UNION SELECT user_id FROM parents WHERE email = 'anne@test.com')
         ORDER BY role::text",
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(roles, vec!["parent", "student"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_payment_first_then_parent_completes(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;

    pay_and_approve(&app, &admin, id).await;
    assert_eq!(admission(&app, &admin, id).await["status"], "PAYMENT_VERIFIED");

    let token = generate_token();
    set_verification_token(&pool, id, &token).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/admissions/verify-parent?token={}", token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "COMPLETED");

    let students: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE admission_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(students, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_verification_link_is_single_use(pool: PgPool) {
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;

    let token = generate_token();
    set_verification_token(&pool, id, &token).await;
    let uri = format!("/api/admissions/verify-parent?token={}", token);

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_expired_verification_link(pool: PgPool) {
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;

    let token = generate_token();
    set_verification_token(&pool, id, &token).await;
    sqlx::query(
        "UPDATE admission_forms SET verification_expires_at = NOW() - INTERVAL '1 minute'
         WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/admissions/verify-parent?token={}", token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Verification link has expired");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_payment_rules(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool);
    let id = submit(&app, course_id, "anne@test.com").await;
    let uri = format!("/api/admissions/{}/payments", id);

    let (status, _) = send(&app, "POST", &uri, None, Some(payment(4999))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, first) = send(&app, "POST", &uri, None, Some(payment(5000))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["status"], "PENDING");

    let (status, _) = send(&app, "POST", &uri, None, Some(payment(5000))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, rejected) = send(
        &app,
        "POST",
        &format!("/api/payments/{}/reject", id_of(&first)),
        Some(&admin.token),
        Some(json!({ "reason": "Reference not found on statement" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["rejection_reason"], "Reference not found on statement");
    assert_eq!(admission(&app, &admin, id).await["status"], "PENDING");

    let (status, _) = send(&app, "POST", &uri, None, Some(payment(6000))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/payments/{}/approve", id_of(&rejected)),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, listed) = send(&app, "GET", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_rejected_admission_is_closed(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;
    let token = generate_token();
    set_verification_token(&pool, id, &token).await;

    let (status, rejected) = send(
        &app,
        "POST",
        &format!("/api/admissions/{}/reject", id),
        Some(&admin.token),
        Some(json!({ "reason": "Incomplete documents" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["rejection_reason"], "Incomplete documents");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/admissions/verify-parent?token={}", token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/admissions/{}/payments", id),
        None,
        Some(payment(5000)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/admissions/{}/reject", id),
        Some(&admin.token),
        Some(json!({ "reason": "Again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_siblings_share_one_parent(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());

    for _ in 0..2 {
        let id = submit(&app, course_id, "family@test.com").await;
        let (status, _) = verify(&app, &pool, id).await;
        assert_eq!(status, StatusCode::OK);
        pay_and_approve(&app, &admin, id).await;
    }

    let parents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM parents WHERE email = 'family@test.com'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(parents, 1);

    let children: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM students s JOIN parents p ON p.id = s.parent_id
         WHERE p.email = 'family@test.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(children, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_resend_verification(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;
    let uri = format!("/api/admissions/{}/resend-verification", id);

    let before: Option<String> =
        sqlx::query_scalar("SELECT verification_token_hash FROM admission_forms WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();

    let (status, _) = send(&app, "POST", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let after: Option<String> =
        sqlx::query_scalar("SELECT verification_token_hash FROM admission_forms WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(after.is_some());
    assert_ne!(before, after);

    let (status, _) = verify(&app, &pool, id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", &uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admission_listing_and_dashboard(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());

    let pending = submit(&app, course_id, "one@test.com").await;
    let verified = submit(&app, course_id, "two@test.com").await;
    let (status, _) = verify(&app, &pool, verified).await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = send(
        &app,
        "GET",
        "/api/admissions?status=PENDING",
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
    assert_eq!(list["data"][0]["id"], pending.to_string());

    let (status, summary) = send(
        &app,
        "GET",
        "/api/dashboard/summary",
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["courses"], 1);
    let counts = summary["admissions"].as_array().unwrap();
    assert_eq!(counts.len(), 5);
    assert_eq!(counts[0], json!({ "status": "PENDING", "count": 1 }));
    assert_eq!(counts[1], json!({ "status": "PARENT_VERIFIED", "count": 1 }));
    assert_eq!(counts[3], json!({ "status": "COMPLETED", "count": 0 }));
}

async fn provisioned_students(pool: &PgPool, admission_id: Uuid) -> (i64, i64) {
    sqlx::query_as(
        "SELECT
            (SELECT COUNT(*) FROM students WHERE admission_id = $1),
            (SELECT COUNT(*) FROM users u JOIN students s ON s.user_id = u.id
             WHERE s.admission_id = $1 AND u.role = 'student')",
    )
    .bind(admission_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_approvals_complete_once(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;

    let (status, _) = verify(&app, &pool, id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, submitted) = send(
        &app,
        "POST",
        &format!("/api/admissions/{}/payments", id),
        None,
        Some(payment(5000)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let approve_uri = format!("/api/payments/{}/approve", id_of(&submitted));

    let (first, second) = tokio::join!(
        send(&app, "POST", &approve_uri, Some(&admin.token), None),
        send(&app, "POST", &approve_uri, Some(&admin.token), None),
    );
    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);

    assert_eq!(admission(&app, &admin, id).await["status"], "COMPLETED");
    assert_eq!(provisioned_students(&pool, id).await, (1, 1));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_parent_and_payment_verified_together_provision_once(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let course_id = create_course(&pool).await;
    let app = setup_test_app(pool.clone());
    let id = submit(&app, course_id, "anne@test.com").await;

    let (status, submitted) = send(
        &app,
        "POST",
        &format!("/api/admissions/{}/payments", id),
        None,
        Some(payment(5000)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = generate_token();
    set_verification_token(&pool, id, &token).await;

    let verify_uri = format!("/api/admissions/verify-parent?token={}", token);
    let approve_uri = format!("/api/payments/{}/approve", id_of(&submitted));
    let ((verify_status, verified), (approve_status, _)) = tokio::join!(
        send(&app, "POST", &verify_uri, None, None),
        send(&app, "POST", &approve_uri, Some(&admin.token), None),
    );
    assert_eq!(verify_status, StatusCode::OK);
    assert_eq!(approve_status, StatusCode::OK);
    assert!(
        verified["status"] == "COMPLETED" || verified["status"] == "PARENT_VERIFIED",
        "unexpected status {}",
        verified["status"]
    );

    assert_eq!(admission(&app, &admin, id).await["status"], "COMPLETED");
    assert_eq!(provisioned_students(&pool, id).await, (1, 1));

    let (status, _) = send(&app, "POST", &approve_uri, Some(&admin.token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
