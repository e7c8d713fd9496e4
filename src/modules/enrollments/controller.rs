use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::EnrollmentId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::enrollments::model::{
    CreateEnrollmentDto, Enrollment, EnrollmentFilterParams, PaginatedEnrollmentsResponse,
};
use crate::modules::enrollments::service::EnrollmentService;
use crate::state::AppState;
use crate::utils::scope::{Scope, readable_students};
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = CreateEnrollmentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "Unknown student or offering", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn enroll_student(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateEnrollmentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::enroll(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/enrollments",
    params(EnrollmentFilterParams),
    responses(
        (status = 200, description = "Enrollments visible to the caller", body = PaginatedEnrollmentsResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_enrollments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<EnrollmentFilterParams>,
) -> Result<Json<PaginatedEnrollmentsResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let visible = readable_students(&state.db, scope).await?;
    let enrollments = EnrollmentService::list_enrollments(&state.db, filters, visible).await?;
    Ok(Json(enrollments))
}

#[utoipa::path(
    delete,
    path = "/api/enrollments/{id}",
    params(("id" = EnrollmentId, Path, description = "Enrollment ID")),
    responses(
        (status = 204, description = "Enrollment removed"),
        (status = 404, description = "Enrollment not found", body = ErrorResponse)
    ),
    tag = "Enrollments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn remove_enrollment(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<EnrollmentId>,
) -> Result<StatusCode, AppError> {
    EnrollmentService::remove_enrollment(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
