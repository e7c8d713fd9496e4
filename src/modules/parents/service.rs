use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_auth::Role;
use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{ParentId, UserId};
use registrar_models::users::NewAccount;

use crate::modules::parents::model::{
    CreateParentDto, PaginatedParentsResponse, Parent, ParentWithChildren, PersonFilterParams,
    UpdateParentDto,
};
use crate::modules::students::service::StudentService;
use crate::modules::teachers::service::push_person_search;
use crate::utils::identity::{IdentityProvider, normalize_email};

pub(crate) const PARENT_COLUMNS: &str =
    "id, user_id, first_name, last_name, email, phone, address, created_at, updated_at";

pub struct ParentService;

impl ParentService {
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create_parent(db: &PgPool, dto: CreateParentDto) -> Result<Parent, AppError> {
        let mut tx = db.begin().await?;

        let account = IdentityProvider::create_account(
            &mut *tx,
            NewAccount {
                first_name: dto.first_name.clone(),
                last_name: dto.last_name.clone(),
                email: dto.email.clone(),
                role: Role::Parent,
                password: Some(dto.password),
            },
        )
        .await?;

        let parent = sqlx::query_as::<_, Parent>(&format!(
            "INSERT INTO parents (user_id, first_name, last_name, email, phone, address)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            PARENT_COLUMNS
        ))
        .bind(account.user.id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(normalize_email(&dto.email))
        .bind(&dto.phone)
        .bind(&dto.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "A parent with this email already exists"))?;

        tx.commit().await?;

        info!(parent_id = %parent.id, "Parent created");
        Ok(parent)
    }

    #[instrument(skip(db))]
    pub async fn list_parents(
        db: &PgPool,
        filters: PersonFilterParams,
    ) -> Result<PaginatedParentsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM parents WHERE 1=1");
        push_person_search(&mut count, &filters.search);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM parents WHERE 1=1",
            PARENT_COLUMNS
        ));
        push_person_search(&mut query, &filters.search);
        query
            .push(" ORDER BY last_name, first_name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Parent>().fetch_all(db).await?;

        Ok(PaginatedParentsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_parent(db: &PgPool, id: ParentId) -> Result<ParentWithChildren, AppError> {
        let parent = sqlx::query_as::<_, Parent>(&format!(
            "SELECT {} FROM parents WHERE id = $1",
            PARENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Parent not found")))?;

        let children = StudentService::list_children(db, id).await?;
        Ok(ParentWithChildren { parent, children })
    }

    #[instrument(skip(db))]
    pub async fn update_parent(
        db: &PgPool,
        id: ParentId,
        dto: UpdateParentDto,
    ) -> Result<Parent, AppError> {
        sqlx::query_as::<_, Parent>(&format!(
            "UPDATE parents SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                updated_at = NOW()
             WHERE id = $5
             RETURNING {}",
            PARENT_COLUMNS
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .bind(&dto.address)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Parent not found")))
    }

    /// Children are unlinked, not deleted.
    #[instrument(skip(db))]
    pub async fn delete_parent(db: &PgPool, id: ParentId) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let user_id = sqlx::query_scalar::<_, Option<UserId>>(
            "DELETE FROM parents WHERE id = $1 RETURNING user_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Parent not found")))?;

        if let Some(user_id) = user_id {
            IdentityProvider::delete_account(&mut *tx, user_id).await?;
        }

        tx.commit().await?;
        info!(parent_id = %id, "Parent deleted");
        Ok(())
    }
}
