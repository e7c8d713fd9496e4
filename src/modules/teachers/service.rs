use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_auth::Role;
use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{TeacherId, UserId};
use registrar_models::users::NewAccount;

use crate::modules::teachers::model::{
    CreateTeacherDto, PaginatedTeachersResponse, PersonFilterParams, Teacher, UpdateTeacherDto,
};
use crate::utils::identity::{IdentityProvider, normalize_email};

const TEACHER_COLUMNS: &str =
    "id, user_id, first_name, last_name, email, phone, address, created_at, updated_at";

/// Appends a case-insensitive match on first name, last name or email.
pub(crate) fn push_person_search(qb: &mut QueryBuilder<'_, Postgres>, search: &Option<String>) {
    if let Some(search) = search {
        let pattern = format!("%{}%", search.replace('%', "\\%").replace('_', "\\_"));
        qb.push(" AND (first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub struct TeacherService;

impl TeacherService {
    /// Creates the account and the profile in one transaction.
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create_teacher(db: &PgPool, dto: CreateTeacherDto) -> Result<Teacher, AppError> {
        let mut tx = db.begin().await?;

        let account = IdentityProvider::create_account(
            &mut *tx,
            NewAccount {
                first_name: dto.first_name.clone(),
                last_name: dto.last_name.clone(),
                email: dto.email.clone(),
                role: Role::Teacher,
                password: Some(dto.password),
            },
        )
        .await?;

        let teacher = sqlx::query_as::<_, Teacher>(&format!(
            "INSERT INTO teachers (user_id, first_name, last_name, email, phone, address)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            TEACHER_COLUMNS
        ))
        .bind(account.user.id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(normalize_email(&dto.email))
        .bind(&dto.phone)
        .bind(&dto.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "A teacher with this email already exists"))?;

        tx.commit().await?;

        info!(teacher_id = %teacher.id, "Teacher created");
        Ok(teacher)
    }

    #[instrument(skip(db))]
    pub async fn list_teachers(
        db: &PgPool,
        filters: PersonFilterParams,
    ) -> Result<PaginatedTeachersResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM teachers WHERE 1=1");
        push_person_search(&mut count, &filters.search);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM teachers WHERE 1=1",
            TEACHER_COLUMNS
        ));
        push_person_search(&mut query, &filters.search);
        query
            .push(" ORDER BY last_name, first_name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Teacher>().fetch_all(db).await?;

        Ok(PaginatedTeachersResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_teacher(db: &PgPool, id: TeacherId) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(&format!(
            "SELECT {} FROM teachers WHERE id = $1",
            TEACHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))
    }

    #[instrument(skip(db))]
    pub async fn update_teacher(
        db: &PgPool,
        id: TeacherId,
        dto: UpdateTeacherDto,
    ) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(&format!(
            "UPDATE teachers SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                updated_at = NOW()
             WHERE id = $5
             RETURNING {}",
            TEACHER_COLUMNS
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .bind(&dto.address)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))
    }

    /// Removes the profile and its account together. Teachers still assigned
    /// to an offering cannot be removed.
    #[instrument(skip(db))]
    pub async fn delete_teacher(db: &PgPool, id: TeacherId) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let user_id = sqlx::query_scalar::<_, Option<UserId>>(
            "DELETE FROM teachers WHERE id = $1 RETURNING user_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "Teacher is still in use"))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Teacher not found")))?;

        if let Some(user_id) = user_id {
            IdentityProvider::delete_account(&mut *tx, user_id).await?;
        }

        tx.commit().await?;
        info!(teacher_id = %id, "Teacher deleted");
        Ok(())
    }
}
