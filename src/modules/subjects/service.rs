use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::SubjectId;

use crate::modules::courses::service::push_search;
use crate::modules::subjects::model::{
    CatalogFilterParams, CreateSubjectDto, PaginatedSubjectsResponse, Subject, UpdateSubjectDto,
};

const SUBJECT_COLUMNS: &str = "id, name, code, description, created_at, updated_at";
const DUPLICATE_SUBJECT: &str = "A subject with this name or code already exists";

pub struct SubjectService;

impl SubjectService {
    #[instrument(skip(db))]
    pub async fn create_subject(db: &PgPool, dto: CreateSubjectDto) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!(
            "INSERT INTO subjects (name, code, description)
             VALUES ($1, $2, $3)
             RETURNING {}",
            SUBJECT_COLUMNS
        ))
        .bind(dto.name.trim())
        .bind(dto.code.trim().to_uppercase())
        .bind(&dto.description)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_SUBJECT))
    }

    #[instrument(skip(db))]
    pub async fn list_subjects(
        db: &PgPool,
        filters: CatalogFilterParams,
    ) -> Result<PaginatedSubjectsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM subjects WHERE 1=1");
        push_search(&mut count, &filters.search);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM subjects WHERE 1=1",
            SUBJECT_COLUMNS
        ));
        push_search(&mut query, &filters.search);
        query
            .push(" ORDER BY name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Subject>().fetch_all(db).await?;

        Ok(PaginatedSubjectsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_subject(db: &PgPool, id: SubjectId) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!(
            "SELECT {} FROM subjects WHERE id = $1",
            SUBJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject not found")))
    }

    #[instrument(skip(db))]
    pub async fn update_subject(
        db: &PgPool,
        id: SubjectId,
        dto: UpdateSubjectDto,
    ) -> Result<Subject, AppError> {
        sqlx::query_as::<_, Subject>(&format!(
            "UPDATE subjects SET
                name = COALESCE($1, name),
                code = COALESCE($2, code),
                description = COALESCE($3, description),
                updated_at = NOW()
             WHERE id = $4
             RETURNING {}",
            SUBJECT_COLUMNS
        ))
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.code.map(|c| c.trim().to_uppercase()))
        .bind(&dto.description)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_SUBJECT))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject not found")))
    }

    /// Offerings and results of the subject cascade.
    #[instrument(skip(db))]
    pub async fn delete_subject(db: &PgPool, id: SubjectId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Subject not found")));
        }
        Ok(())
    }
}
