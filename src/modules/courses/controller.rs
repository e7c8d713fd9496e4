use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::{AppError, PaginationParams};
use registrar_models::ids::CourseId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::courses::model::{
    CatalogFilterParams, Course, CreateCourseDto, CreateSemesterDto, PaginatedCoursesResponse,
    PaginatedSemestersResponse, Semester, UpdateCourseDto,
};
use crate::modules::courses::service::CourseService;
use crate::modules::semesters::service::SemesterService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 409, description = "Duplicate name or code", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_course(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = CourseService::create_course(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    get,
    path = "/api/courses",
    params(CatalogFilterParams),
    responses(
        (status = 200, description = "Courses", body = PaginatedCoursesResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<CatalogFilterParams>,
) -> Result<Json<PaginatedCoursesResponse>, AppError> {
    let courses = CourseService::list_courses(&state.db, filters).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(("id" = CourseId, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course", body = Course),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<CourseId>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::get_course(&state.db, id).await?;
    Ok(Json(course))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(("id" = CourseId, Path, description = "Course ID")),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Duplicate name or code", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_course(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::update_course(&state.db, id, dto).await?;
    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(("id" = CourseId, Path, description = "Course ID")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 400, description = "Course still referenced", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CourseId>,
) -> Result<StatusCode, AppError> {
    CourseService::delete_course(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/courses/{id}/semesters",
    params(("id" = CourseId, Path, description = "Course ID")),
    request_body = CreateSemesterDto,
    responses(
        (status = 201, description = "Semester created", body = Semester),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Semester number already used", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Semesters",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_course_semester(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<CreateSemesterDto>,
) -> Result<(StatusCode, Json<Semester>), AppError> {
    CourseService::ensure_exists(&state.db, id).await?;
    let semester = SemesterService::create_semester(&state.db, id, dto).await?;
    Ok((StatusCode::CREATED, Json(semester)))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/semesters",
    params(("id" = CourseId, Path, description = "Course ID"), PaginationParams),
    responses(
        (status = 200, description = "Semesters of the course", body = PaginatedSemestersResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    tag = "Semesters",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_course_semesters(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<CourseId>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedSemestersResponse>, AppError> {
    CourseService::ensure_exists(&state.db, id).await?;
    let semesters = SemesterService::list_semesters(&state.db, Some(id), pagination).await?;
    Ok(Json(semesters))
}
