use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{SemesterId, SubjectId, SubjectOfferingId, TeacherId};

use crate::modules::lessons::service::LessonService;
use crate::modules::subject_offerings::model::{
    CreateSubjectOfferingDto, PaginatedSubjectOfferingsResponse, SubjectOffering,
    SubjectOfferingDetail, SubjectOfferingFilterParams, UpdateSubjectOfferingDto,
};

const OFFERING_COLUMNS: &str =
    "id, subject_id, teacher_id, semester_id, created_at, updated_at";
const DETAIL_SELECT: &str = "SELECT o.id, o.subject_id, s.name AS subject_name, \
     s.code AS subject_code, o.teacher_id, \
     t.first_name || ' ' || t.last_name AS teacher_name, \
     o.semester_id, sem.name AS semester_name, o.created_at, o.updated_at \
     FROM subject_offerings o \
     JOIN subjects s ON s.id = o.subject_id \
     JOIN teachers t ON t.id = o.teacher_id \
     JOIN semesters sem ON sem.id = o.semester_id \
     WHERE 1=1";
const DUPLICATE_OFFERING: &str = "This subject is already offered in that semester";

#[derive(FromRow)]
struct References {
    subject: bool,
    teacher: bool,
    semester: bool,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &SubjectOfferingFilterParams) {
    if let Some(semester_id) = filters.semester_id {
        qb.push(" AND o.semester_id = ")
            .push_bind(SemesterId::from(semester_id));
    }
    if let Some(teacher_id) = filters.teacher_id {
        qb.push(" AND o.teacher_id = ")
            .push_bind(TeacherId::from(teacher_id));
    }
    if let Some(subject_id) = filters.subject_id {
        qb.push(" AND o.subject_id = ")
            .push_bind(SubjectId::from(subject_id));
    }
}

pub struct SubjectOfferingService;

impl SubjectOfferingService {
    async fn ensure_references(
        db: &PgPool,
        subject_id: Option<SubjectId>,
        teacher_id: Option<TeacherId>,
        semester_id: Option<SemesterId>,
    ) -> Result<(), AppError> {
        let found = sqlx::query_as::<_, References>(
            "SELECT
                ($1::uuid IS NULL OR EXISTS(SELECT 1 FROM subjects WHERE id = $1)) AS subject,
                ($2::uuid IS NULL OR EXISTS(SELECT 1 FROM teachers WHERE id = $2)) AS teacher,
                ($3::uuid IS NULL OR EXISTS(SELECT 1 FROM semesters WHERE id = $3)) AS semester",
        )
        .bind(subject_id)
        .bind(teacher_id)
        .bind(semester_id)
        .fetch_one(db)
        .await?;

        let missing = if !found.subject {
            "Subject"
        } else if !found.teacher {
            "Teacher"
        } else if !found.semester {
            "Semester"
        } else {
            return Ok(());
        };
        Err(AppError::not_found(anyhow::anyhow!("{} not found", missing)))
    }

    #[instrument(skip(db))]
    pub async fn create_offering(
        db: &PgPool,
        dto: CreateSubjectOfferingDto,
    ) -> Result<SubjectOffering, AppError> {
        Self::ensure_references(
            db,
            Some(dto.subject_id),
            Some(dto.teacher_id),
            Some(dto.semester_id),
        )
        .await?;

        sqlx::query_as::<_, SubjectOffering>(&format!(
            "INSERT INTO subject_offerings (subject_id, teacher_id, semester_id)
             VALUES ($1, $2, $3)
             RETURNING {}",
            OFFERING_COLUMNS
        ))
        .bind(dto.subject_id)
        .bind(dto.teacher_id)
        .bind(dto.semester_id)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, DUPLICATE_OFFERING))
    }

    #[instrument(skip(db))]
    pub async fn list_offerings(
        db: &PgPool,
        filters: SubjectOfferingFilterParams,
    ) -> Result<PaginatedSubjectOfferingsResponse, AppError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM subject_offerings o WHERE 1=1");
        push_filters(&mut count, &filters);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
        push_filters(&mut query, &filters);
        query
            .push(" ORDER BY sem.start_date DESC, s.name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query
            .build_query_as::<SubjectOfferingDetail>()
            .fetch_all(db)
            .await?;

        Ok(PaginatedSubjectOfferingsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_offering(
        db: &PgPool,
        id: SubjectOfferingId,
    ) -> Result<SubjectOfferingDetail, AppError> {
        sqlx::query_as::<_, SubjectOfferingDetail>(&format!("{} AND o.id = $1", DETAIL_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject offering not found")))
    }

    /// Reassigns the teacher. Fails with 409 when one of the offering's lessons
    /// would overlap a lesson the new teacher already has.
    #[instrument(skip(db))]
    pub async fn update_offering(
        db: &PgPool,
        id: SubjectOfferingId,
        dto: UpdateSubjectOfferingDto,
    ) -> Result<SubjectOffering, AppError> {
        Self::ensure_references(db, None, Some(dto.teacher_id), None).await?;

        let mut tx = db.begin().await?;
        LessonService::ensure_teacher_available(&mut *tx, id, dto.teacher_id).await?;

        let offering = sqlx::query_as::<_, SubjectOffering>(&format!(
            "UPDATE subject_offerings SET teacher_id = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {}",
            OFFERING_COLUMNS
        ))
        .bind(dto.teacher_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Subject offering not found")))?;

        tx.commit().await?;
        Ok(offering)
    }

    /// Lessons, enrollments and assignments of the offering cascade.
    #[instrument(skip(db))]
    pub async fn delete_offering(db: &PgPool, id: SubjectOfferingId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM subject_offerings WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Subject offering not found"
            )));
        }
        Ok(())
    }
}
