use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::TeacherId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::teachers::model::{
    CreateTeacherDto, PaginatedTeachersResponse, PersonFilterParams, Teacher, UpdateTeacherDto,
};
use crate::modules::teachers::service::TeacherService;
use crate::state::AppState;
use crate::utils::scope::Scope;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/teachers",
    request_body = CreateTeacherDto,
    responses(
        (status = 201, description = "Teacher and account created", body = Teacher),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_teacher(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateTeacherDto>,
) -> Result<(StatusCode, Json<Teacher>), AppError> {
    let teacher = TeacherService::create_teacher(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

#[utoipa::path(
    get,
    path = "/api/teachers",
    params(PersonFilterParams),
    responses(
        (status = 200, description = "Teachers", body = PaginatedTeachersResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_teachers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filters): Query<PersonFilterParams>,
) -> Result<Json<PaginatedTeachersResponse>, AppError> {
    let teachers = TeacherService::list_teachers(&state.db, filters).await?;
    Ok(Json(teachers))
}

#[utoipa::path(
    get,
    path = "/api/teachers/me",
    responses(
        (status = 200, description = "The caller's teacher profile", body = Teacher),
        (status = 403, description = "No teacher profile", body = ErrorResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_teacher_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Teacher>, AppError> {
    match Scope::resolve(&state.db, &auth_user).await? {
        Scope::Teacher(id) => Ok(Json(TeacherService::get_teacher(&state.db, id).await?)),
        _ => Err(AppError::forbidden(
            "Only teachers have a teacher profile".to_string(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/teachers/{id}",
    params(("id" = TeacherId, Path, description = "Teacher ID")),
    responses(
        (status = 200, description = "Teacher", body = Teacher),
        (status = 403, description = "Not your record", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_teacher(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<TeacherId>,
) -> Result<Json<Teacher>, AppError> {
    match Scope::resolve(&state.db, &auth_user).await? {
        Scope::Admin => {}
        Scope::Teacher(own) if own == id => {}
        _ => {
            return Err(AppError::forbidden(
                "You can only view your own teacher record".to_string(),
            ));
        }
    }
    let teacher = TeacherService::get_teacher(&state.db, id).await?;
    Ok(Json(teacher))
}

#[utoipa::path(
    put,
    path = "/api/teachers/{id}",
    params(("id" = TeacherId, Path, description = "Teacher ID")),
    request_body = UpdateTeacherDto,
    responses(
        (status = 200, description = "Teacher updated", body = Teacher),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_teacher(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<TeacherId>,
    ValidatedJson(dto): ValidatedJson<UpdateTeacherDto>,
) -> Result<Json<Teacher>, AppError> {
    let teacher = TeacherService::update_teacher(&state.db, id, dto).await?;
    Ok(Json(teacher))
}

#[utoipa::path(
    delete,
    path = "/api/teachers/{id}",
    params(("id" = TeacherId, Path, description = "Teacher ID")),
    responses(
        (status = 204, description = "Teacher and account deleted"),
        (status = 400, description = "Teacher still assigned to an offering", body = ErrorResponse),
        (status = 404, description = "Teacher not found", body = ErrorResponse)
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_teacher(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<TeacherId>,
) -> Result<StatusCode, AppError> {
    TeacherService::delete_teacher(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
