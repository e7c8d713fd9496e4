use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_core::{AppError, PaginationMeta};
use registrar_models::Weekday;
use registrar_models::ids::{LessonId, StudentId, SubjectOfferingId, TeacherId};

use crate::modules::attendance::model::{
    Attendance, AttendanceFilterParams, AttendanceSummary, PaginatedAttendanceResponse,
    RecordAttendanceDto,
};
use crate::modules::enrollments::service::EnrollmentService;
use crate::utils::scope::{Scope, ensure_teaches_offering, readable_students};

const ATTENDANCE_COLUMNS: &str =
    "a.id, a.student_id, a.lesson_id, a.date, a.present, a.created_at, a.updated_at";

#[derive(Debug, FromRow)]
struct LessonContext {
    subject_offering_id: SubjectOfferingId,
    teacher_id: TeacherId,
    day: Weekday,
    semester_start: NaiveDate,
    semester_end: NaiveDate,
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &AttendanceFilterParams,
    teacher: Option<TeacherId>,
    visible: &Option<Vec<StudentId>>,
) {
    if let Some(student_id) = filters.student_id {
        qb.push(" AND a.student_id = ")
            .push_bind(StudentId::from(student_id));
    }
    if let Some(lesson_id) = filters.lesson_id {
        qb.push(" AND a.lesson_id = ")
            .push_bind(LessonId::from(lesson_id));
    }
    if let Some(from) = filters.from {
        qb.push(" AND a.date >= ").push_bind(from);
    }
    if let Some(to) = filters.to {
        qb.push(" AND a.date <= ").push_bind(to);
    }
    if let Some(teacher_id) = teacher {
        qb.push(" AND o.teacher_id = ").push_bind(teacher_id);
    }
    if let Some(ids) = visible {
        qb.push(" AND a.student_id = ANY(")
            .push_bind(ids.clone())
            .push(")");
    }
}

pub struct AttendanceService;

impl AttendanceService {
    async fn lesson_context(db: &PgPool, lesson_id: LessonId) -> Result<LessonContext, AppError> {
        sqlx::query_as::<_, LessonContext>(
            "SELECT l.subject_offering_id, o.teacher_id, l.day,
                    sem.start_date AS semester_start, sem.end_date AS semester_end
             FROM lessons l
             JOIN subject_offerings o ON o.id = l.subject_offering_id
             JOIN semesters sem ON sem.id = o.semester_id
             WHERE l.id = $1",
        )
        .bind(lesson_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Lesson not found")))
    }

    /// Records one register. Every mark is upserted on (student, lesson,
    /// date) and the batch commits as a whole.
    #[instrument(skip(db, dto), fields(date = %dto.date, marks = dto.records.len()))]
    pub async fn record_attendance(
        db: &PgPool,
        scope: Scope,
        lesson_id: LessonId,
        dto: RecordAttendanceDto,
    ) -> Result<Vec<Attendance>, AppError> {
        let lesson = Self::lesson_context(db, lesson_id).await?;

        match scope {
            Scope::Admin => {}
            Scope::Teacher(teacher_id) => {
                ensure_teaches_offering(db, teacher_id, lesson.subject_offering_id).await?
            }
            _ => {
                return Err(AppError::forbidden(
                    "Access denied. Required role: admin or teacher".to_string(),
                ));
            }
        }

        let weekday = Weekday::from(dto.date.weekday());
        if weekday != lesson.day {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Lesson takes place on {} but {} is a {}",
                lesson.day,
                dto.date,
                weekday
            )));
        }
        if dto.date < lesson.semester_start || dto.date > lesson.semester_end {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "{} is outside the lesson's semester",
                dto.date
            )));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = dto.records.iter().find(|m| !seen.insert(m.student_id)) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} appears more than once in the register",
                duplicate.student_id
            )));
        }

        let students: Vec<StudentId> = dto.records.iter().map(|m| m.student_id).collect();
        let unenrolled =
            EnrollmentService::find_unenrolled(db, lesson.subject_offering_id, &students).await?;
        if !unenrolled.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Students not enrolled in this subject offering: {}",
                unenrolled
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut tx = db.begin().await?;
        let mut saved = Vec::with_capacity(dto.records.len());
        for mark in &dto.records {
            let row = sqlx::query_as::<_, Attendance>(
                "INSERT INTO attendance (student_id, lesson_id, date, present)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (student_id, lesson_id, date)
                 DO UPDATE SET present = EXCLUDED.present, updated_at = NOW()
                 RETURNING id, student_id, lesson_id, date, present, created_at, updated_at",
            )
            .bind(mark.student_id)
            .bind(lesson_id)
            .bind(dto.date)
            .bind(mark.present)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }
        tx.commit().await?;

        info!(lesson_id = %lesson_id, teacher_id = %lesson.teacher_id, "Attendance recorded");
        Ok(saved)
    }

    /// Teachers see registers of their own offerings; students and parents
    /// see their own marks.
    #[instrument(skip(db))]
    pub async fn list_attendance(
        db: &PgPool,
        scope: Scope,
        filters: AttendanceFilterParams,
    ) -> Result<PaginatedAttendanceResponse, AppError> {
        let teacher = match scope {
            Scope::Teacher(id) => Some(id),
            _ => None,
        };
        let visible = readable_students(db, scope).await?;

        let from_clause = " FROM attendance a \
             JOIN lessons l ON l.id = a.lesson_id \
             JOIN subject_offerings o ON o.id = l.subject_offering_id WHERE 1=1";

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){}", from_clause));
        push_filters(&mut count, &filters, teacher, &visible);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}{}",
            ATTENDANCE_COLUMNS, from_clause
        ));
        push_filters(&mut query, &filters, teacher, &visible);
        query
            .push(" ORDER BY a.date DESC, a.student_id LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Attendance>().fetch_all(db).await?;

        Ok(PaginatedAttendanceResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn summary(
        db: &PgPool,
        student_id: StudentId,
    ) -> Result<AttendanceSummary, AppError> {
        let (present, total) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*) FILTER (WHERE present), COUNT(*)
             FROM attendance WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(db)
        .await?;

        Ok(AttendanceSummary::new(student_id, present, total))
    }
}
