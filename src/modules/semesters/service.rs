use sqlx::PgPool;
use tracing::instrument;

use registrar_core::{AppError, PaginationMeta, PaginationParams};
use registrar_models::ids::{CourseId, SemesterId};

use crate::modules::semesters::model::{
    CreateSemesterDto, PaginatedSemestersResponse, Semester, UpdateSemesterDto, check_date_order,
};

const SEMESTER_COLUMNS: &str =
    "id, course_id, number, name, start_date, end_date, created_at, updated_at";
const DUPLICATE_SEMESTER: &str = "This course already has a semester with that number";

pub struct SemesterService;

impl SemesterService {
    #[instrument(skip(db))]
    pub async fn create_semester(
        db: &PgPool,
        course_id: CourseId,
        dto: CreateSemesterDto,
    ) -> Result<Semester, AppError> {
        let semester = sqlx::query_as::<_, Semester>(&format!(
            "INSERT INTO semesters (course_id, number, name, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            SEMESTER_COLUMNS
        ))
        .bind(course_id)
        .bind(dto.number)
        .bind(dto.name.trim())
        .bind(dto.start_date)
        .bind(dto.end_date)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_SEMESTER))?;

        Ok(semester)
    }

    #[instrument(skip(db))]
    pub async fn list_semesters(
        db: &PgPool,
        course_id: Option<CourseId>,
        pagination: PaginationParams,
    ) -> Result<PaginatedSemestersResponse, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM semesters WHERE ($1::uuid IS NULL OR course_id = $1)",
        )
        .bind(course_id)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, Semester>(&format!(
            "SELECT {} FROM semesters
             WHERE ($1::uuid IS NULL OR course_id = $1)
             ORDER BY course_id, number
             LIMIT $2 OFFSET $3",
            SEMESTER_COLUMNS
        ))
        .bind(course_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedSemestersResponse {
            data,
            meta: PaginationMeta::from_params(total, &pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_semester(db: &PgPool, id: SemesterId) -> Result<Semester, AppError> {
        sqlx::query_as::<_, Semester>(&format!(
            "SELECT {} FROM semesters WHERE id = $1",
            SEMESTER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Semester not found")))
    }

    /// Merges the patch onto the stored row and re-checks date order.
    #[instrument(skip(db))]
    pub async fn update_semester(
        db: &PgPool,
        id: SemesterId,
        dto: UpdateSemesterDto,
    ) -> Result<Semester, AppError> {
        let current = Self::get_semester(db, id).await?;

        let start_date = dto.start_date.unwrap_or(current.start_date);
        let end_date = dto.end_date.unwrap_or(current.end_date);
        check_date_order(start_date, end_date).map_err(|_| {
            AppError::unprocessable(anyhow::anyhow!("start_date must be before end_date"))
        })?;

        let semester = sqlx::query_as::<_, Semester>(&format!(
            "UPDATE semesters SET
                number = $1,
                name = $2,
                start_date = $3,
                end_date = $4,
                updated_at = NOW()
             WHERE id = $5
             RETURNING {}",
            SEMESTER_COLUMNS
        ))
        .bind(dto.number.unwrap_or(current.number))
        .bind(dto.name.as_deref().map(str::trim).unwrap_or(&current.name))
        .bind(start_date)
        .bind(end_date)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_SEMESTER))?;

        Ok(semester)
    }

    #[instrument(skip(db))]
    pub async fn delete_semester(db: &PgPool, id: SemesterId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM semesters WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_SEMESTER))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Semester not found")));
        }
        Ok(())
    }
}
