use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::CourseId;

use crate::modules::courses::model::{
    CatalogFilterParams, Course, CreateCourseDto, PaginatedCoursesResponse, UpdateCourseDto,
};

const COURSE_COLUMNS: &str =
    "id, name, code, description, duration_semesters, created_at, updated_at";
const DUPLICATE_COURSE: &str = "A course with this name or code already exists";

/// Appends `AND (name ILIKE .. OR code ILIKE ..)` for a catalog search.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Postgres>, search: &Option<String>) {
    if let Some(search) = search {
        let pattern = format!("%{}%", search.replace('%', "\\%").replace('_', "\\_"));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR code ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub struct CourseService;

impl CourseService {
    #[instrument(skip(db))]
    pub async fn create_course(db: &PgPool, dto: CreateCourseDto) -> Result<Course, AppError> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses (name, code, description, duration_semesters)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(dto.name.trim())
        .bind(dto.code.trim().to_uppercase())
        .bind(&dto.description)
        .bind(dto.duration_semesters)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_COURSE))?;

        Ok(course)
    }

    #[instrument(skip(db))]
    pub async fn list_courses(
        db: &PgPool,
        filters: CatalogFilterParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM courses WHERE 1=1");
        push_search(&mut count, &filters.search);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM courses WHERE 1=1",
            COURSE_COLUMNS
        ));
        push_search(&mut query, &filters.search);
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let data = query.build_query_as::<Course>().fetch_all(db).await?;

        Ok(PaginatedCoursesResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_course(db: &PgPool, id: CourseId) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {} FROM courses WHERE id = $1",
            COURSE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    #[instrument(skip(db))]
    pub async fn update_course(
        db: &PgPool,
        id: CourseId,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET
                name = COALESCE($1, name),
                code = COALESCE($2, code),
                description = COALESCE($3, description),
                duration_semesters = COALESCE($4, duration_semesters),
                updated_at = NOW()
             WHERE id = $5
             RETURNING {}",
            COURSE_COLUMNS
        ))
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.code.map(|c| c.trim().to_uppercase()))
        .bind(&dto.description)
        .bind(dto.duration_semesters)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_COURSE))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    /// Semesters cascade; a course with admissions on file cannot be removed.
    #[instrument(skip(db))]
    pub async fn delete_course(db: &PgPool, id: CourseId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(|e| AppError::from_db(e, DUPLICATE_COURSE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Course not found")));
        }
        Ok(())
    }

    pub async fn ensure_exists(db: &PgPool, id: CourseId) -> Result<(), AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
                .bind(id)
                .fetch_one(db)
                .await?;
        if exists {
            Ok(())
        } else {
            Err(AppError::not_found(anyhow::anyhow!("Course not found")))
        }
    }
}
