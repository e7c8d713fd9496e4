use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{EnrollmentId, StudentId, SubjectOfferingId};

use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentFilterParams, PaginatedEnrollmentsResponse,
};

const ENROLLMENT_COLUMNS: &str = "id, student_id, subject_offering_id, enrolled_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &EnrollmentFilterParams,
    visible: &Option<Vec<StudentId>>,
) {
    if let Some(student_id) = filters.student_id {
        qb.push(" AND student_id = ")
            .push_bind(StudentId::from(student_id));
    }
    if let Some(offering_id) = filters.subject_offering_id {
        qb.push(" AND subject_offering_id = ")
            .push_bind(SubjectOfferingId::from(offering_id));
    }
    if let Some(ids) = visible {
        qb.push(" AND student_id = ANY(")
            .push_bind(ids.clone())
            .push(")");
    }
}

pub struct EnrollmentService;

impl EnrollmentService {
    #[instrument(skip(db))]
    pub async fn enroll(db: &PgPool, dto: CreateEnrollmentDto) -> Result<Enrollment, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "INSERT INTO enrollments (student_id, subject_offering_id)
             VALUES ($1, $2)
             RETURNING {}",
            ENROLLMENT_COLUMNS
        ))
        .bind(dto.student_id)
        .bind(dto.subject_offering_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_db(e, "Student is already enrolled in this subject offering")
        })?;

        info!(
            student_id = %enrollment.student_id,
            subject_offering_id = %enrollment.subject_offering_id,
            "Student enrolled"
        );
        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn list_enrollments(
        db: &PgPool,
        filters: EnrollmentFilterParams,
        visible: Option<Vec<StudentId>>,
    ) -> Result<PaginatedEnrollmentsResponse, AppError> {
        let mut count =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM enrollments WHERE 1=1");
        push_filters(&mut count, &filters, &visible);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM enrollments WHERE 1=1",
            ENROLLMENT_COLUMNS
        ));
        push_filters(&mut query, &filters, &visible);
        query
            .push(" ORDER BY enrolled_at DESC LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Enrollment>().fetch_all(db).await?;

        Ok(PaginatedEnrollmentsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn remove_enrollment(db: &PgPool, id: EnrollmentId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Enrollment not found")));
        }
        Ok(())
    }

    /// Students among `students` that are not enrolled in the offering.
    pub async fn find_unenrolled(
        db: &PgPool,
        offering_id: SubjectOfferingId,
        students: &[StudentId],
    ) -> Result<Vec<StudentId>, AppError> {
        let enrolled = sqlx::query_scalar::<_, StudentId>(
            "SELECT student_id FROM enrollments
             WHERE subject_offering_id = $1 AND student_id = ANY($2)",
        )
        .bind(offering_id)
        .bind(students)
        .fetch_all(db)
        .await?;

        Ok(students
            .iter()
            .filter(|id| !enrolled.contains(id))
            .copied()
            .collect())
    }
}
