use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument, warn};

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{LessonId, StudentId, SubjectOfferingId, TeacherId};

use crate::modules::lessons::model::{
    BookedLesson, ConflictKind, CreateLessonDto, Lesson, LessonFilterParams,
    PaginatedLessonsResponse, ScheduleParams, ScheduleResponse, ScheduledLesson, TimeSlot,
    UpdateLessonDto, expand_occurrences, find_conflict,
};
use crate::utils::scope::{Scope, readable_students};

const LESSON_COLUMNS: &str = "l.id, l.subject_offering_id, l.name, l.day, l.start_time, \
     l.end_time, l.room, l.created_at, l.updated_at";

/// Which lessons a caller sees: `teacher` narrows to one teacher's offerings,
/// `students` to offerings any of those students is enrolled in.
#[derive(Debug, Default)]
struct Visibility {
    teacher: Option<TeacherId>,
    students: Option<Vec<StudentId>>,
}

impl Visibility {
    async fn for_scope(
        db: &PgPool,
        scope: Scope,
        teacher_filter: Option<TeacherId>,
        student_filter: Option<StudentId>,
    ) -> Result<Self, AppError> {
        let visibility = match scope {
            Scope::Admin => Visibility {
                teacher: teacher_filter,
                students: student_filter.map(|id| vec![id]),
            },
            Scope::Teacher(id) => Visibility {
                teacher: Some(id),
                students: student_filter.map(|id| vec![id]),
            },
            Scope::Student(_) | Scope::Parent(_) => {
                let mut students = readable_students(db, scope).await?.unwrap_or_default();
                if let Some(wanted) = student_filter {
                    students.retain(|id| *id == wanted);
                }
                Visibility {
                    teacher: teacher_filter,
                    students: Some(students),
                }
            }
        };
        Ok(visibility)
    }

    fn push(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(teacher_id) = self.teacher {
            qb.push(" AND o.teacher_id = ").push_bind(teacher_id);
        }
        if let Some(students) = &self.students {
            qb.push(
                " AND EXISTS(SELECT 1 FROM enrollments e \
                 WHERE e.subject_offering_id = o.id AND e.student_id = ANY(",
            )
            .push_bind(students.clone())
            .push("))");
        }
    }
}

fn push_lesson_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &LessonFilterParams,
    visibility: &Visibility,
) {
    if let Some(day) = filters.day {
        qb.push(" AND l.day = ").push_bind(day);
    }
    if let Some(offering_id) = filters.subject_offering_id {
        qb.push(" AND l.subject_offering_id = ")
            .push_bind(SubjectOfferingId::from(offering_id));
    }
    visibility.push(qb);
}

pub struct LessonService;

impl LessonService {
    /// Locks the teacher row of the offering so concurrent writes to one
    /// timetable are serialised, and returns the teacher.
    async fn lock_offering_teacher(
        conn: &mut PgConnection,
        offering_id: SubjectOfferingId,
    ) -> Result<TeacherId, AppError> {
        sqlx::query_scalar::<_, TeacherId>(
            "SELECT t.id FROM subject_offerings o
             JOIN teachers t ON t.id = o.teacher_id
             WHERE o.id = $1
             FOR UPDATE OF t",
        )
        .bind(offering_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject offering not found")))
    }

    async fn ensure_no_conflict(
        conn: &mut PgConnection,
        slot: &TimeSlot,
        offering_id: SubjectOfferingId,
        teacher_id: TeacherId,
        exclude: Option<LessonId>,
    ) -> Result<(), AppError> {
        let booked = sqlx::query_as::<_, BookedLesson>(
            "SELECT l.id, l.subject_offering_id, o.teacher_id, l.day, l.start_time, l.end_time
             FROM lessons l
             JOIN subject_offerings o ON o.id = l.subject_offering_id
             WHERE l.day = $1
               AND (l.subject_offering_id = $2 OR o.teacher_id = $3)
               AND ($4::uuid IS NULL OR l.id <> $4)",
        )
        .bind(slot.day)
        .bind(offering_id)
        .bind(teacher_id)
        .bind(exclude)
        .fetch_all(conn)
        .await?;

        match find_conflict(slot, offering_id, teacher_id, &booked) {
            None => Ok(()),
            Some(conflict) => {
                let kind = match conflict.kind {
                    ConflictKind::SubjectOffering => "subject_offering",
                    ConflictKind::Teacher => "teacher",
                };
                warn!(conflicting_lesson = %conflict.lesson_id, kind, "Lesson conflict");
                crate::metrics::track_lesson_conflict(kind);
                Err(AppError::conflict(anyhow::anyhow!(conflict.to_string())))
            }
        }
    }

    /// Checks that every lesson of `offering_id` fits into `teacher_id`'s
    /// timetable before the offering is handed to that teacher.
    ///
    /// Locks the offering row, then the current and the incoming teacher rows
    /// in id order, so lesson writes for either timetable wait for the
    /// reassignment.
    pub(crate) async fn ensure_teacher_available(
        conn: &mut PgConnection,
        offering_id: SubjectOfferingId,
        teacher_id: TeacherId,
    ) -> Result<(), AppError> {
        let current = sqlx::query_scalar::<_, TeacherId>(
            "SELECT teacher_id FROM subject_offerings WHERE id = $1 FOR UPDATE",
        )
        .bind(offering_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject offering not found")))?;
        if current == teacher_id {
            return Ok(());
        }
        sqlx::query("SELECT id FROM teachers WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(vec![current, teacher_id])
            .execute(&mut *conn)
            .await?;

        let lessons = sqlx::query_as::<_, BookedLesson>(
            "SELECT l.id, l.subject_offering_id, o.teacher_id, l.day, l.start_time, l.end_time
             FROM lessons l
             JOIN subject_offerings o ON o.id = l.subject_offering_id
             WHERE o.id = $1 OR (o.teacher_id = $2 AND o.id <> $1)",
        )
        .bind(offering_id)
        .bind(teacher_id)
        .fetch_all(&mut *conn)
        .await?;
        let (moving, booked): (Vec<_>, Vec<_>) = lessons
            .into_iter()
            .partition(|l| l.subject_offering_id == offering_id);

        for lesson in &moving {
            if let Some(conflict) = find_conflict(&lesson.slot(), offering_id, teacher_id, &booked)
            {
                warn!(
                    lesson_id = %lesson.id,
                    conflicting_lesson = %conflict.lesson_id,
                    "Teacher reassignment conflict"
                );
                crate::metrics::track_lesson_conflict("teacher");
                return Err(AppError::conflict(anyhow::anyhow!(
                    "Lesson {} clashes with the new teacher's timetable: {}",
                    lesson.id,
                    conflict
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn create_lesson(db: &PgPool, dto: CreateLessonDto) -> Result<Lesson, AppError> {
        let slot = TimeSlot::new(dto.day, dto.start_time, dto.end_time)
            .map_err(AppError::bad_request)?;

        let mut tx = db.begin().await?;
        let teacher_id = Self::lock_offering_teacher(&mut *tx, dto.subject_offering_id).await?;
        Self::ensure_no_conflict(&mut *tx, &slot, dto.subject_offering_id, teacher_id, None)
            .await?;

        let lesson = sqlx::query_as::<_, Lesson>(
            "INSERT INTO lessons (subject_offering_id, name, day, start_time, end_time, room)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, subject_offering_id, name, day, start_time, end_time, room,
                       created_at, updated_at",
        )
        .bind(dto.subject_offering_id)
        .bind(dto.name.trim())
        .bind(slot.day)
        .bind(slot.start)
        .bind(slot.end)
        .bind(&dto.room)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(lesson_id = %lesson.id, "Lesson scheduled");
        Ok(lesson)
    }

    #[instrument(skip(db))]
    pub async fn list_lessons(
        db: &PgPool,
        scope: Scope,
        filters: LessonFilterParams,
    ) -> Result<PaginatedLessonsResponse, AppError> {
        let visibility = Visibility::for_scope(
            db,
            scope,
            filters.teacher_id.map(TeacherId::from),
            filters.student_id.map(StudentId::from),
        )
        .await?;

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM lessons l \
             JOIN subject_offerings o ON o.id = l.subject_offering_id WHERE 1=1",
        );
        push_lesson_filters(&mut count, &filters, &visibility);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM lessons l \
             JOIN subject_offerings o ON o.id = l.subject_offering_id WHERE 1=1",
            LESSON_COLUMNS
        ));
        push_lesson_filters(&mut query, &filters, &visibility);
        query
            .push(" ORDER BY l.day, l.start_time LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Lesson>().fetch_all(db).await?;

        Ok(PaginatedLessonsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_lesson(db: &PgPool, id: LessonId) -> Result<Lesson, AppError> {
        sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM lessons l WHERE l.id = $1",
            LESSON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Lesson not found")))
    }

    /// Merges the patch and re-runs the conflict check against every other
    /// lesson.
    #[instrument(skip(db))]
    pub async fn update_lesson(
        db: &PgPool,
        id: LessonId,
        dto: UpdateLessonDto,
    ) -> Result<Lesson, AppError> {
        let current = Self::get_lesson(db, id).await?;
        let slot = TimeSlot::new(
            dto.day.unwrap_or(current.day),
            dto.start_time.unwrap_or(current.start_time),
            dto.end_time.unwrap_or(current.end_time),
        )
        .map_err(AppError::bad_request)?;

        let mut tx = db.begin().await?;
        let teacher_id = Self::lock_offering_teacher(&mut *tx, current.subject_offering_id).await?;
        Self::ensure_no_conflict(
            &mut *tx,
            &slot,
            current.subject_offering_id,
            teacher_id,
            Some(id),
        )
        .await?;

        let lesson = sqlx::query_as::<_, Lesson>(
            "UPDATE lessons SET
                name = COALESCE($1, name),
                day = $2,
                start_time = $3,
                end_time = $4,
                room = COALESCE($5, room),
                updated_at = NOW()
             WHERE id = $6
             RETURNING id, subject_offering_id, name, day, start_time, end_time, room,
                       created_at, updated_at",
        )
        .bind(dto.name.as_deref().map(str::trim))
        .bind(slot.day)
        .bind(slot.start)
        .bind(slot.end)
        .bind(&dto.room)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Lesson not found")))?;

        tx.commit().await?;
        Ok(lesson)
    }

    #[instrument(skip(db))]
    pub async fn delete_lesson(db: &PgPool, id: LessonId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Lesson not found")));
        }
        Ok(())
    }

    /// Dated occurrences between `from` and `to` of the lessons the caller
    /// may see. Admins may narrow by teacher or student.
    #[instrument(skip(db))]
    pub async fn schedule(
        db: &PgPool,
        scope: Scope,
        params: ScheduleParams,
    ) -> Result<ScheduleResponse, AppError> {
        registrar_models::scheduling::check_schedule_range(params.from, params.to)
            .map_err(AppError::bad_request)?;

        let visibility = Visibility::for_scope(
            db,
            scope,
            params.teacher_id.map(TeacherId::from),
            params.student_id.map(StudentId::from),
        )
        .await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT l.id, l.subject_offering_id, o.teacher_id, o.semester_id, l.name, l.day, \
             l.start_time, l.end_time, l.room, \
             sem.start_date AS semester_start, sem.end_date AS semester_end \
             FROM lessons l \
             JOIN subject_offerings o ON o.id = l.subject_offering_id \
             JOIN semesters sem ON sem.id = o.semester_id \
             WHERE sem.start_date <= ",
        );
        query
            .push_bind(params.to)
            .push(" AND sem.end_date >= ")
            .push_bind(params.from);
        visibility.push(&mut query);

        let lessons = query
            .build_query_as::<ScheduledLesson>()
            .fetch_all(db)
            .await?;
        let occurrences =
            expand_occurrences(&lessons, params.from, params.to).map_err(AppError::bad_request)?;

        Ok(ScheduleResponse {
            from: params.from,
            to: params.to,
            occurrences,
        })
    }
}
