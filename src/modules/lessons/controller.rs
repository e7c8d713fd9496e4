use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::LessonId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::lessons::model::{
    CreateLessonDto, Lesson, LessonFilterParams, PaginatedLessonsResponse, ScheduleParams,
    ScheduleResponse, UpdateLessonDto,
};
use crate::modules::lessons::service::LessonService;
use crate::state::AppState;
use crate::utils::scope::Scope;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/lessons",
    request_body = CreateLessonDto,
    responses(
        (status = 201, description = "Lesson scheduled", body = Lesson),
        (status = 400, description = "start_time is not before end_time", body = ErrorResponse),
        (status = 404, description = "Subject offering not found", body = ErrorResponse),
        (status = 409, description = "Overlaps another lesson of the offering or teacher", body = ErrorResponse)
    ),
    tag = "Lessons",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_lesson(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateLessonDto>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let lesson = LessonService::create_lesson(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    get,
    path = "/api/lessons",
    params(LessonFilterParams),
    responses(
        (status = 200, description = "Lessons visible to the caller", body = PaginatedLessonsResponse)
    ),
    tag = "Lessons",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_lessons(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<LessonFilterParams>,
) -> Result<Json<PaginatedLessonsResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let lessons = LessonService::list_lessons(&state.db, scope, filters).await?;
    Ok(Json(lessons))
}

/// Teachers get their own lessons, students their enrolled lessons, parents
/// their children's lessons.
#[utoipa::path(
    get,
    path = "/api/lessons/schedule",
    params(ScheduleParams),
    responses(
        (status = 200, description = "Dated lesson occurrences", body = ScheduleResponse),
        (status = 400, description = "Range inverted or longer than 62 days", body = ErrorResponse)
    ),
    tag = "Lessons",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_schedule(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<ScheduleResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let schedule = LessonService::schedule(&state.db, scope, params).await?;
    Ok(Json(schedule))
}

#[utoipa::path(
    get,
    path = "/api/lessons/{id}",
    params(("id" = LessonId, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson", body = Lesson),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    tag = "Lessons",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_lesson(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<LessonId>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = LessonService::get_lesson(&state.db, id).await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    put,
    path = "/api/lessons/{id}",
    params(("id" = LessonId, Path, description = "Lesson ID")),
    request_body = UpdateLessonDto,
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "start_time is not before end_time", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 409, description = "Overlaps another lesson of the offering or teacher", body = ErrorResponse)
    ),
    tag = "Lessons",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_lesson(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<LessonId>,
    ValidatedJson(dto): ValidatedJson<UpdateLessonDto>,
) -> Result<Json<Lesson>, AppError> {
    let lesson = LessonService::update_lesson(&state.db, id, dto).await?;
    Ok(Json(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/lessons/{id}",
    params(("id" = LessonId, Path, description = "Lesson ID")),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    tag = "Lessons",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_lesson(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<LessonId>,
) -> Result<StatusCode, AppError> {
    LessonService::delete_lesson(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
