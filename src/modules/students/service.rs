use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use registrar_auth::Role;
use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{CourseId, ParentId, StudentId, UserId};
use registrar_models::users::NewAccount;

use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, Student, StudentFilterParams, UpdateStudentDto,
};
use crate::modules::teachers::service::push_person_search;
use crate::utils::identity::{IdentityProvider, normalize_email};

pub(crate) const STUDENT_COLUMNS: &str = "id, user_id, first_name, last_name, email, phone, \
     address, date_of_birth, parent_id, course_id, admission_id, created_at, updated_at";

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &StudentFilterParams,
    visible: &Option<Vec<StudentId>>,
) {
    push_person_search(qb, &filters.search);
    if let Some(course_id) = filters.course_id {
        qb.push(" AND course_id = ").push_bind(CourseId::from(course_id));
    }
    if let Some(parent_id) = filters.parent_id {
        qb.push(" AND parent_id = ").push_bind(ParentId::from(parent_id));
    }
    if let Some(ids) = visible {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, dto), fields(email = %dto.email))]
    pub async fn create_student(db: &PgPool, dto: CreateStudentDto) -> Result<Student, AppError> {
        let mut tx = db.begin().await?;

        let account = IdentityProvider::create_account(
            &mut *tx,
            NewAccount {
                first_name: dto.first_name.clone(),
                last_name: dto.last_name.clone(),
                email: dto.email.clone(),
                role: Role::Student,
                password: Some(dto.password),
            },
        )
        .await?;

        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students
                (user_id, first_name, last_name, email, phone, address, date_of_birth, parent_id, course_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(account.user.id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(normalize_email(&dto.email))
        .bind(&dto.phone)
        .bind(&dto.address)
        .bind(dto.date_of_birth)
        .bind(dto.parent_id)
        .bind(dto.course_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_db(e, "A student with this email already exists"))?;

        tx.commit().await?;

        info!(student_id = %student.id, "Student created");
        Ok(student)
    }

    /// Lists students. `visible` narrows the result to the given ids.
    #[instrument(skip(db))]
    pub async fn list_students(
        db: &PgPool,
        filters: StudentFilterParams,
        visible: Option<Vec<StudentId>>,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students WHERE 1=1");
        push_filters(&mut count, &filters, &visible);
        let total: i64 = count.build_query_scalar().fetch_one(db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM students WHERE 1=1",
            STUDENT_COLUMNS
        ));
        push_filters(&mut query, &filters, &visible);
        query
            .push(" ORDER BY last_name, first_name LIMIT ")
            .push_bind(filters.pagination.limit())
            .push(" OFFSET ")
            .push_bind(filters.pagination.offset());
        let data = query.build_query_as::<Student>().fetch_all(db).await?;

        Ok(PaginatedStudentsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_student(db: &PgPool, id: StudentId) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE id = $1",
            STUDENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db))]
    pub async fn list_children(db: &PgPool, parent_id: ParentId) -> Result<Vec<Student>, AppError> {
        let children = sqlx::query_as::<_, Student>(&format!(
            "SELECT {} FROM students WHERE parent_id = $1 ORDER BY first_name",
            STUDENT_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(db)
        .await?;
        Ok(children)
    }

    #[instrument(skip(db))]
    pub async fn update_student(
        db: &PgPool,
        id: StudentId,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(&format!(
            "UPDATE students SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                date_of_birth = COALESCE($5, date_of_birth),
                parent_id = COALESCE($6, parent_id),
                course_id = COALESCE($7, course_id),
                updated_at = NOW()
             WHERE id = $8
             RETURNING {}",
            STUDENT_COLUMNS
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .bind(&dto.address)
        .bind(dto.date_of_birth)
        .bind(dto.parent_id)
        .bind(dto.course_id)
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(|e| AppError::from_db(e, "A student with this email already exists"))?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    /// Removes the profile and its account together; enrollments, attendance
    /// and results of the student cascade.
    #[instrument(skip(db))]
    pub async fn delete_student(db: &PgPool, id: StudentId) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        let user_id = sqlx::query_scalar::<_, Option<UserId>>(
            "DELETE FROM students WHERE id = $1 RETURNING user_id",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        if let Some(user_id) = user_id {
            IdentityProvider::delete_account(&mut *tx, user_id).await?;
        }

        tx.commit().await?;
        info!(student_id = %id, "Student deleted");
        Ok(())
    }
}
