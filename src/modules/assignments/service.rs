use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{AssignmentId, StudentId, SubjectOfferingId, TeacherId};

use crate::modules::assignments::model::{
    Assignment, AssignmentFilterParams, CreateAssignmentDto, PaginatedAssignmentsResponse,
    UpdateAssignmentDto, check_due_after_start,
};
use crate::utils::scope::{Scope, ensure_teaches_offering, readable_students};

const ASSIGNMENT_COLUMNS: &str = "a.id, a.subject_offering_id, a.title, a.description, \
     a.start_date, a.due_date, a.created_at, a.updated_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &AssignmentFilterParams,
    teacher: Option<TeacherId>,
    students: &Option<Vec<StudentId>>,
) {
    if let Some(offering_id) = filters.subject_offering_id {
        qb.push(" AND a.subject_offering_id = ")
            .push_bind(SubjectOfferingId::from(offering_id));
    }
    if let Some(due_from) = filters.due_from {
        qb.push(" AND a.due_date >= ").push_bind(due_from);
    }
    if let Some(due_to) = filters.due_to {
        qb.push(" AND a.due_date <= ").push_bind(due_to);
    }
    if let Some(teacher_id) = teacher {
        qb.push(" AND o.teacher_id = ").push_bind(teacher_id);
    }
    if let Some(ids) = students {
        qb.push(
            " AND EXISTS(SELECT 1 FROM enrollments e \
             WHERE e.subject_offering_id = a.subject_offering_id AND e.student_id = ANY(",
        )
        .push_bind(ids.clone())
        .push("))");
    }
}

pub struct AssignmentService;

impl AssignmentService {
    /// Admins manage every assignment, teachers those of their offerings.
    async fn ensure_can_manage(
        db: &PgPool,
        scope: Scope,
        offering_id: SubjectOfferingId,
    ) -> Result<(), AppError> {
        match scope {
            Scope::Admin => Ok(()),
            Scope::Teacher(teacher_id) => {
                ensure_teaches_offering(db, teacher_id, offering_id).await
            }
            _ => Err(AppError::forbidden(
                "Access denied. Required role: admin or teacher".to_string(),
            )),
        }
    }

    #[instrument(skip(db))]
    pub async fn create_assignment(
        db: &PgPool,
        scope: Scope,
        dto: CreateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        Self::ensure_can_manage(db, scope, dto.subject_offering_id).await?;

        let assignment = sqlx::query_as::<_, Assignment>(
            "INSERT INTO assignments (subject_offering_id, title, description, start_date, due_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, subject_offering_id, title, description, start_date, due_date,
                       created_at, updated_at",
        )
        .bind(dto.subject_offering_id)
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.start_date)
        .bind(dto.due_date)
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_db(e, "Assignment already exists"))?;

        info!(assignment_id = %assignment.id, "Assignment created");
        Ok(assignment)
    }

    /// Teachers see their offerings' assignments; students and parents those
    /// of offerings the student is enrolled in.
    #[instrument(skip(db))]
    pub async fn list_assignments(
        db: &PgPool,
        scope: Scope,
        filters: AssignmentFilterParams,
    ) -> Result<PaginatedAssignmentsResponse, AppError> {
        let teacher = match scope {
            Scope::Teacher(id) => Some(id),
            _ => None,
        };
        let students = readable_students(db, scope).await?;
        let from_clause = " FROM assignments a \
             JOIN subject_offerings o ON o.id = a.subject_offering_id WHERE 1=1";

        let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*){}", from_clause));
        push_filters(&mut count, &filters, teacher, &students);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {}{}",
            ASSIGNMENT_COLUMNS, from_clause
        ));
        push_filters(&mut query, &filters, teacher, &students);
        query
            .push(" ORDER BY a.due_date, a.title LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Assignment>().fetch_all(db).await?;

        Ok(PaginatedAssignmentsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_assignment(db: &PgPool, id: AssignmentId) -> Result<Assignment, AppError> {
        sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {} FROM assignments a WHERE a.id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Assignment not found")))
    }

    /// Fetches an assignment only if the caller can see it.
    #[instrument(skip(db))]
    pub async fn get_visible_assignment(
        db: &PgPool,
        scope: Scope,
        id: AssignmentId,
    ) -> Result<Assignment, AppError> {
        let assignment = Self::get_assignment(db, id).await?;
        let visible = match scope {
            Scope::Admin => true,
            Scope::Teacher(teacher_id) => {
                ensure_teaches_offering(db, teacher_id, assignment.subject_offering_id)
                    .await
                    .is_ok()
            }
            Scope::Student(_) | Scope::Parent(_) => {
                let students = readable_students(db, scope).await?.unwrap_or_default();
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM enrollments
                     WHERE subject_offering_id = $1 AND student_id = ANY($2))",
                )
                .bind(assignment.subject_offering_id)
                .bind(&students)
                .fetch_one(db)
                .await?
            }
        };

        if visible {
            Ok(assignment)
        } else {
            Err(AppError::forbidden(
                "You cannot access this assignment".to_string(),
            ))
        }
    }

    #[instrument(skip(db))]
    pub async fn update_assignment(
        db: &PgPool,
        scope: Scope,
        id: AssignmentId,
        dto: UpdateAssignmentDto,
    ) -> Result<Assignment, AppError> {
        let current = Self::get_assignment(db, id).await?;
        Self::ensure_can_manage(db, scope, current.subject_offering_id).await?;

        let start_date = dto.start_date.unwrap_or(current.start_date);
        let due_date = dto.due_date.unwrap_or(current.due_date);
        check_due_after_start(start_date, due_date).map_err(|_| {
            AppError::unprocessable(anyhow::anyhow!("due_date must not be before start_date"))
        })?;

        sqlx::query_as::<_, Assignment>(
            "UPDATE assignments SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                start_date = $3,
                due_date = $4,
                updated_at = NOW()
             WHERE id = $5
             RETURNING id, subject_offering_id, title, description, start_date, due_date,
                       created_at, updated_at",
        )
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(start_date)
        .bind(due_date)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Assignment not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_assignment(
        db: &PgPool,
        scope: Scope,
        id: AssignmentId,
    ) -> Result<(), AppError> {
        let current = Self::get_assignment(db, id).await?;
        Self::ensure_can_manage(db, scope, current.subject_offering_id).await?;

        sqlx::query("DELETE FROM assignments WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
