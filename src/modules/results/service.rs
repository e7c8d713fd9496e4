use std::collections::HashSet;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{ResultId, StudentId, SubjectId, TeacherId};

use crate::modules::results::model::{
    PaginatedResultsResponse, ResultFilterParams, SubjectResult, UpdateResultDto,
    UpsertResultsDto, grade_for_score,
};
use crate::utils::scope::{Scope, ensure_can_read_student, readable_students};

const RESULT_COLUMNS: &str =
    "id, student_id, subject_id, score, grade, remarks, created_at, updated_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &ResultFilterParams,
    visible: &Option<Vec<StudentId>>,
) {
    if let Some(student_id) = filters.student_id {
        qb.push(" AND student_id = ")
            .push_bind(StudentId::from(student_id));
    }
    if let Some(subject_id) = filters.subject_id {
        qb.push(" AND subject_id = ")
            .push_bind(SubjectId::from(subject_id));
    }
    if let Some(ids) = visible {
        qb.push(" AND student_id = ANY(")
            .push_bind(ids.clone())
            .push(")");
    }
}

pub struct ResultService;

impl ResultService {
    /// A teacher may grade a student in a subject only through an offering
    /// of that subject they teach and the student is enrolled in.
    async fn ensure_teacher_grades(
        conn: &mut PgConnection,
        teacher_id: TeacherId,
        student_id: StudentId,
        subject_id: SubjectId,
    ) -> Result<(), AppError> {
        let allowed = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM subject_offerings o
                JOIN enrollments e ON e.subject_offering_id = o.id
                WHERE o.teacher_id = $1 AND o.subject_id = $2 AND e.student_id = $3
             )",
        )
        .bind(teacher_id)
        .bind(subject_id)
        .bind(student_id)
        .fetch_one(conn)
        .await?;

        if allowed {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "You do not teach subject {} to student {}",
                subject_id, student_id
            )))
        }
    }

    fn writer_teacher(scope: Scope) -> Result<Option<TeacherId>, AppError> {
        match scope {
            Scope::Admin => Ok(None),
            Scope::Teacher(id) => Ok(Some(id)),
            _ => Err(AppError::forbidden(
                "Access denied. Required role: admin or teacher".to_string(),
            )),
        }
    }

    /// Upserts a batch of results keyed by (student, subject). Either every
    /// entry is written or none is.
    #[instrument(skip(db, dto), fields(entries = dto.results.len()))]
    pub async fn upsert_results(
        db: &PgPool,
        scope: Scope,
        dto: UpsertResultsDto,
    ) -> Result<Vec<SubjectResult>, AppError> {
        let teacher = Self::writer_teacher(scope)?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = dto
            .results
            .iter()
            .find(|entry| !seen.insert((entry.student_id, entry.subject_id)))
        {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Student {} has more than one result for subject {} in this batch",
                duplicate.student_id,
                duplicate.subject_id
            )));
        }

        let mut tx = db.begin().await?;
        let mut upserted = Vec::with_capacity(dto.results.len());

        for entry in &dto.results {
            if let Some(teacher_id) = teacher {
                Self::ensure_teacher_grades(
                    &mut *tx,
                    teacher_id,
                    entry.student_id,
                    entry.subject_id,
                )
                .await?;
            }

            let row = sqlx::query_as::<_, SubjectResult>(&format!(
                "INSERT INTO results (student_id, subject_id, score, grade, remarks)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (student_id, subject_id) DO UPDATE SET
                    score = EXCLUDED.score,
                    grade = EXCLUDED.grade,
                    remarks = EXCLUDED.remarks,
                    updated_at = NOW()
                 RETURNING {}",
                RESULT_COLUMNS
            ))
            .bind(entry.student_id)
            .bind(entry.subject_id)
            .bind(entry.score)
            .bind(entry.effective_grade())
            .bind(&entry.remarks)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::from_db(e, "Result already exists"))?;

            upserted.push(row);
        }

        tx.commit().await?;
        info!(count = upserted.len(), "Results upserted");
        Ok(upserted)
    }

    #[instrument(skip(db))]
    pub async fn list_results(
        db: &PgPool,
        scope: Scope,
        filters: ResultFilterParams,
    ) -> Result<PaginatedResultsResponse, AppError> {
        let visible = readable_students(db, scope).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM results WHERE 1=1");
        push_filters(&mut count, &filters, &visible);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM results WHERE 1=1",
            RESULT_COLUMNS
        ));
        push_filters(&mut query, &filters, &visible);
        query
            .push(" ORDER BY updated_at DESC LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<SubjectResult>().fetch_all(db).await?;

        Ok(PaginatedResultsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    async fn find_result(db: &PgPool, id: ResultId) -> Result<SubjectResult, AppError> {
        sqlx::query_as::<_, SubjectResult>(&format!(
            "SELECT {} FROM results WHERE id = $1",
            RESULT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Result not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_result(
        db: &PgPool,
        scope: Scope,
        id: ResultId,
    ) -> Result<SubjectResult, AppError> {
        let result = Self::find_result(db, id).await?;
        ensure_can_read_student(db, scope, result.student_id).await?;
        Ok(result)
    }

    /// A new score without a grade re-derives the grade.
    #[instrument(skip(db))]
    pub async fn update_result(
        db: &PgPool,
        scope: Scope,
        id: ResultId,
        dto: UpdateResultDto,
    ) -> Result<SubjectResult, AppError> {
        let current = Self::find_result(db, id).await?;
        if let Some(teacher_id) = Self::writer_teacher(scope)? {
            let mut conn = db.acquire().await?;
            Self::ensure_teacher_grades(
                &mut *conn,
                teacher_id,
                current.student_id,
                current.subject_id,
            )
            .await?;
        }

        let score = dto.score.unwrap_or(current.score);
        let grade = match (dto.grade, dto.score) {
            (Some(grade), _) => grade,
            (None, Some(score)) => grade_for_score(score).to_string(),
            (None, None) => current.grade,
        };

        sqlx::query_as::<_, SubjectResult>(&format!(
            "UPDATE results SET
                score = $1,
                grade = $2,
                remarks = COALESCE($3, remarks),
                updated_at = NOW()
             WHERE id = $4
             RETURNING {}",
            RESULT_COLUMNS
        ))
        .bind(score)
        .bind(grade)
        .bind(&dto.remarks)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Result not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_result(db: &PgPool, scope: Scope, id: ResultId) -> Result<(), AppError> {
        let current = Self::find_result(db, id).await?;
        if let Some(teacher_id) = Self::writer_teacher(scope)? {
            let mut conn = db.acquire().await?;
            Self::ensure_teacher_grades(
                &mut *conn,
                teacher_id,
                current.student_id,
                current.subject_id,
            )
            .await?;
        }

        sqlx::query("DELETE FROM results WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
