//! Resolves which records the caller may see.
//!
//! Admins see everything. Teachers, students and parents are mapped from
//! their account to their profile row, and handlers narrow queries with it.

use sqlx::PgPool;

use registrar_auth::Role;
use registrar_core::AppError;
use registrar_models::ids::{ParentId, StudentId, SubjectOfferingId, TeacherId, UserId};

use crate::middleware::auth::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Admin,
    Teacher(TeacherId),
    Student(StudentId),
    Parent(ParentId),
}

impl Scope {
    pub async fn resolve(db: &PgPool, auth_user: &AuthUser) -> Result<Self, AppError> {
        let user_id = auth_user.user_id()?;
        match auth_user.role() {
            Role::Admin => Ok(Scope::Admin),
            Role::Teacher => {
                let id = profile_id(db, "teachers", user_id).await?;
                Ok(Scope::Teacher(TeacherId::from(id)))
            }
            Role::Student => {
                let id = profile_id(db, "students", user_id).await?;
                Ok(Scope::Student(StudentId::from(id)))
            }
            Role::Parent => {
                let id = profile_id(db, "parents", user_id).await?;
                Ok(Scope::Parent(ParentId::from(id)))
            }
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Scope::Admin)
    }
}

async fn profile_id(db: &PgPool, table: &str, user_id: UserId) -> Result<uuid::Uuid, AppError> {
    let query = format!("SELECT id FROM {} WHERE user_id = $1", table);
    sqlx::query_scalar::<_, uuid::Uuid>(&query)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::forbidden("No profile is linked to this account".to_string()))
}

/// Profile id for `/api/auth/me`; `None` for admins or unlinked accounts.
pub async fn find_profile_id(
    db: &PgPool,
    role: Role,
    user_id: UserId,
) -> Result<Option<uuid::Uuid>, AppError> {
    let table = match role {
        Role::Admin => return Ok(None),
        Role::Teacher => "teachers",
        Role::Student => "students",
        Role::Parent => "parents",
    };
    let query = format!("SELECT id FROM {} WHERE user_id = $1", table);
    let id = sqlx::query_scalar::<_, uuid::Uuid>(&query)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(id)
}

pub async fn children_of(db: &PgPool, parent_id: ParentId) -> Result<Vec<StudentId>, AppError> {
    let ids = sqlx::query_scalar::<_, StudentId>("SELECT id FROM students WHERE parent_id = $1")
        .bind(parent_id)
        .fetch_all(db)
        .await?;
    Ok(ids)
}

/// Fails with 403 unless the teacher teaches the offering.
pub async fn ensure_teaches_offering(
    db: &PgPool,
    teacher_id: TeacherId,
    offering_id: SubjectOfferingId,
) -> Result<(), AppError> {
    let teaches = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM subject_offerings WHERE id = $1 AND teacher_id = $2)",
    )
    .bind(offering_id)
    .bind(teacher_id)
    .fetch_one(db)
    .await?;

    if teaches {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "You do not teach this subject offering".to_string(),
        ))
    }
}

/// Student ids the caller may read records for; `None` means unrestricted.
pub async fn readable_students(
    db: &PgPool,
    scope: Scope,
) -> Result<Option<Vec<StudentId>>, AppError> {
    match scope {
        Scope::Admin | Scope::Teacher(_) => Ok(None),
        Scope::Student(id) => Ok(Some(vec![id])),
        Scope::Parent(id) => Ok(Some(children_of(db, id).await?)),
    }
}

/// Fails with 403 when a student or parent asks about someone else.
pub async fn ensure_can_read_student(
    db: &PgPool,
    scope: Scope,
    student_id: StudentId,
) -> Result<(), AppError> {
    match readable_students(db, scope).await? {
        None => Ok(()),
        Some(ids) if ids.contains(&student_id) => Ok(()),
        Some(_) => Err(AppError::forbidden(
            "You cannot access this student's records".to_string(),
        )),
    }
}
