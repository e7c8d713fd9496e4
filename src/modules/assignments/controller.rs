use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::AssignmentId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireStaff;
use crate::modules::assignments::model::{
    Assignment, AssignmentFilterParams, CreateAssignmentDto, PaginatedAssignmentsResponse,
    UpdateAssignmentDto,
};
use crate::modules::assignments::service::AssignmentService;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::scope::Scope;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/assignments",
    request_body = CreateAssignmentDto,
    responses(
        (status = 201, description = "Assignment created", body = Assignment),
        (status = 403, description = "Not the offering's teacher", body = ErrorResponse),
        (status = 422, description = "Due date before start date", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_assignment(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<CreateAssignmentDto>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let assignment = AssignmentService::create_assignment(&state.db, scope, dto).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    get,
    path = "/api/assignments",
    params(AssignmentFilterParams),
    responses(
        (status = 200, description = "Assignments visible to the caller", body = PaginatedAssignmentsResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_assignments(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<AssignmentFilterParams>,
) -> Result<Json<PaginatedAssignmentsResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let assignments = AssignmentService::list_assignments(&state.db, scope, filters).await?;
    Ok(Json(assignments))
}

#[utoipa::path(
    get,
    path = "/api/assignments/{id}",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = Assignment),
        (status = 403, description = "Not visible to the caller", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_assignment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AssignmentId>,
) -> Result<Json<Assignment>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let assignment = AssignmentService::get_visible_assignment(&state.db, scope, id).await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    put,
    path = "/api/assignments/{id}",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentDto,
    responses(
        (status = 200, description = "Assignment updated", body = Assignment),
        (status = 403, description = "Not the offering's teacher", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse),
        (status = 422, description = "Due date before start date", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_assignment(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<AssignmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateAssignmentDto>,
) -> Result<Json<Assignment>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let assignment = AssignmentService::update_assignment(&state.db, scope, id, dto).await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    delete,
    path = "/api/assignments/{id}",
    params(("id" = AssignmentId, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment deleted"),
        (status = 403, description = "Not the offering's teacher", body = ErrorResponse),
        (status = 404, description = "Assignment not found", body = ErrorResponse)
    ),
    tag = "Assignments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_assignment(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<AssignmentId>,
) -> Result<StatusCode, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    AssignmentService::delete_assignment(&state.db, scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
