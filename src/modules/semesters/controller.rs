use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::{CourseId, SemesterId};

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::semesters::model::{
    PaginatedSemestersResponse, Semester, SemesterFilterParams, UpdateSemesterDto,
};
use crate::modules::semesters::service::SemesterService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/semesters",
    params(SemesterFilterParams),
    responses(
        (status = 200, description = "Semesters", body = PaginatedSemestersResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Semesters",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_semesters(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<SemesterFilterParams>,
) -> Result<Json<PaginatedSemestersResponse>, AppError> {
    let semesters = SemesterService::list_semesters(
        &state.db,
        filters.course_id.map(CourseId::from),
        filters.pagination,
    )
    .await?;
    Ok(Json(semesters))
}

#[utoipa::path(
    get,
    path = "/api/semesters/{id}",
    params(("id" = SemesterId, Path, description = "Semester ID")),
    responses(
        (status = 200, description = "Semester", body = Semester),
        (status = 404, description = "Semester not found", body = ErrorResponse)
    ),
    tag = "Semesters",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_semester(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<SemesterId>,
) -> Result<Json<Semester>, AppError> {
    let semester = SemesterService::get_semester(&state.db, id).await?;
    Ok(Json(semester))
}

#[utoipa::path(
    put,
    path = "/api/semesters/{id}",
    params(("id" = SemesterId, Path, description = "Semester ID")),
    request_body = UpdateSemesterDto,
    responses(
        (status = 200, description = "Semester updated", body = Semester),
        (status = 404, description = "Semester not found", body = ErrorResponse),
        (status = 409, description = "Semester number already used", body = ErrorResponse),
        (status = 422, description = "Dates out of order", body = ErrorResponse)
    ),
    tag = "Semesters",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_semester(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<SemesterId>,
    ValidatedJson(dto): ValidatedJson<UpdateSemesterDto>,
) -> Result<Json<Semester>, AppError> {
    let semester = SemesterService::update_semester(&state.db, id, dto).await?;
    Ok(Json(semester))
}

#[utoipa::path(
    delete,
    path = "/api/semesters/{id}",
    params(("id" = SemesterId, Path, description = "Semester ID")),
    responses(
        (status = 204, description = "Semester deleted"),
        (status = 400, description = "Semester still referenced", body = ErrorResponse),
        (status = 404, description = "Semester not found", body = ErrorResponse)
    ),
    tag = "Semesters",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_semester(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<SemesterId>,
) -> Result<StatusCode, AppError> {
    SemesterService::delete_semester(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
