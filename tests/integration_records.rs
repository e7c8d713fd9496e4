#![cfg(feature = "db-tests")]

mod common;

use axum::http::StatusCode;
use common::{
    TestAccount, Timetable, create_account, create_lesson, create_timetable, enroll, send,
    setup_test_app,
};
use registrar::registrar_auth::Role;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// A teacher with one Monday lesson and one enrolled student.
struct Classroom {
    teacher: TestAccount,
    student: TestAccount,
    timetable: Timetable,
    lesson_id: Uuid,
}

async fn classroom(pool: &PgPool) -> Classroom {
    let teacher = create_account(pool, Role::Teacher).await;
    let student = create_account(pool, Role::Student).await;
    let timetable = create_timetable(pool, teacher.profile()).await;
    let lesson_id = create_lesson(pool, timetable.offering_id, "MONDAY", "09:00", "10:00").await;
    enroll(pool, student.profile(), timetable.offering_id).await;
    Classroom {
        teacher,
        student,
        timetable,
        lesson_id,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_record_attendance_and_overwrite(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = setup_test_app(pool);
    let uri = format!("/api/lessons/{}/attendance", room.lesson_id);

    let (status, saved) = send(
        &app,
        "POST",
        &uri,
        Some(&room.teacher.token),
        Some(json!({
            "date": "2025-09-08",
            "records": [{ "student_id": room.student.profile(), "present": true }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved.as_array().unwrap().len(), 1);

    let (status, saved) = send(
        &app,
        "POST",
        &uri,
        Some(&room.teacher.token),
        Some(json!({
            "date": "2025-09-08",
            "records": [{ "student_id": room.student.profile(), "present": false }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved[0]["present"], false);

    let (status, list) = send(
        &app,
        "GET",
        "/api/attendance",
        Some(&room.student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);

    let (status, summary) = send(
        &app,
        "GET",
        "/api/attendance/summary",
        Some(&room.student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["present"], 0);
    assert_eq!(summary["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_date_must_match_lesson(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = setup_test_app(pool);
    let uri = format!("/api/lessons/{}/attendance", room.lesson_id);
    let mark = json!([{ "student_id": room.student.profile(), "present": true }]);

    // A Tuesday
    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(&room.teacher.token),
        Some(json!({ "date": "2025-09-09", "records": mark })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("MONDAY"));

    // A Monday after the semester ends
    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&room.teacher.token),
        Some(json!({ "date": "2026-02-02", "records": mark })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_attendance_rejects_unenrolled_and_repeated_students(pool: PgPool) {
    let room = classroom(&pool).await;
    let stranger = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool.clone());
    let uri = format!("/api/lessons/{}/attendance", room.lesson_id);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&room.teacher.token),
        Some(json!({
            "date": "2025-09-08",
            "records": [
                { "student_id": room.student.profile(), "present": true },
                { "student_id": stranger.profile(), "present": true }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&room.teacher.token),
        Some(json!({
            "date": "2025-09-08",
            "records": [
                { "student_id": room.student.profile(), "present": true },
                { "student_id": room.student.profile(), "present": false }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let recorded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(recorded, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_the_offering_teacher_takes_attendance(pool: PgPool) {
    let room = classroom(&pool).await;
    let other_teacher = create_account(&pool, Role::Teacher).await;
    let app = setup_test_app(pool);
    let uri = format!("/api/lessons/{}/attendance", room.lesson_id);
    let body = json!({
        "date": "2025-09-08",
        "records": [{ "student_id": room.student.profile(), "present": true }]
    });

    let (status, _) = send(
        &app,
        "POST",
        &uri,
        Some(&other_teacher.token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", &uri, Some(&room.student.token), Some(body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_results_batch_upserts(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = setup_test_app(pool);
    let subject_id = room.timetable.subject_id;

    let (status, body) = send(
        &app,
        "POST",
        "/api/results",
        Some(&room.teacher.token),
        Some(json!({
            "results": [{
                "student_id": room.student.profile(),
                "subject_id": subject_id,
                "score": 64.5
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upserted"][0]["grade"], "B");

    let (status, body) = send(
        &app,
        "POST",
        "/api/results",
        Some(&room.teacher.token),
        Some(json!({
            "results": [{
                "student_id": room.student.profile(),
                "subject_id": subject_id,
                "score": 38.0,
                "remarks": "Resit required"
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["upserted"][0]["grade"], "F");

    let (status, list) = send(&app, "GET", "/api/results", Some(&room.student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
    assert_eq!(list["data"][0]["remarks"], "Resit required");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_results_batch_is_all_or_nothing(pool: PgPool) {
    let room = classroom(&pool).await;
    let not_my_student = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool.clone());
    let subject_id = room.timetable.subject_id;

    let (status, _) = send(
        &app,
        "POST",
        "/api/results",
        Some(&room.teacher.token),
        Some(json!({
            "results": [
                { "student_id": room.student.profile(), "subject_id": subject_id, "score": 90.0 },
                { "student_id": not_my_student.profile(), "subject_id": subject_id, "score": 90.0 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "POST",
        "/api/results",
        Some(&room.teacher.token),
        Some(json!({
            "results": [
                { "student_id": room.student.profile(), "subject_id": subject_id, "score": 90.0 },
                { "student_id": room.student.profile(), "subject_id": subject_id, "score": 80.0 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM results")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_duplicate_enrollment_conflicts(pool: PgPool) {
    let admin = create_account(&pool, Role::Admin).await;
    let room = classroom(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/enrollments",
        Some(&admin.token),
        Some(json!({
            "student_id": room.student.profile(),
            "subject_offering_id": room.timetable.offering_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = send(
        &app,
        "GET",
        &format!(
            "/api/enrollments?subject_offering_id={}",
            room.timetable.offering_id
        ),
        Some(&room.teacher.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assignments_follow_offering_ownership(pool: PgPool) {
    let room = classroom(&pool).await;
    let other_teacher = create_account(&pool, Role::Teacher).await;
    let outsider = create_account(&pool, Role::Student).await;
    let app = setup_test_app(pool);
    let body = json!({
        "subject_offering_id": room.timetable.offering_id,
        "title": "Sorting algorithms",
        "start_date": "2025-09-08",
        "due_date": "2025-09-22"
    });

    let (status, _) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(&other_teacher.token),
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(&room.teacher.token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Sorting algorithms");

    let (status, list) = send(
        &app,
        "GET",
        "/api/assignments",
        Some(&room.student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);

    let (status, list) = send(&app, "GET", "/api/assignments", Some(&outsider.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_assignment_due_date_follows_start(pool: PgPool) {
    let room = classroom(&pool).await;
    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/assignments",
        Some(&room.teacher.token),
        Some(json!({
            "subject_offering_id": room.timetable.offering_id,
            "title": "Backwards",
            "start_date": "2025-09-22",
            "due_date": "2025-09-08"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
