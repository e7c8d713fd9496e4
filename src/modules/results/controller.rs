use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::ResultId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireStaff;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::results::model::{
    PaginatedResultsResponse, ResultFilterParams, SubjectResult, UpdateResultDto,
    UpsertResultsDto, UpsertResultsResponse,
};
use crate::modules::results::service::ResultService;
use crate::state::AppState;
use crate::utils::scope::Scope;
use crate::validator::ValidatedJson;

/// Batch upsert of results. Each entry is validated and the batch commits
/// in one transaction.
#[utoipa::path(
    post,
    path = "/api/results",
    request_body = UpsertResultsDto,
    responses(
        (status = 200, description = "Results written", body = UpsertResultsResponse),
        (status = 400, description = "Duplicate entry or unknown student/subject", body = ErrorResponse),
        (status = 403, description = "Teacher does not teach the subject to the student", body = ErrorResponse),
        (status = 422, description = "An entry failed validation", body = ErrorResponse)
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn upsert_results(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<UpsertResultsDto>,
) -> Result<Json<UpsertResultsResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let upserted = ResultService::upsert_results(&state.db, scope, dto).await?;
    Ok(Json(UpsertResultsResponse { upserted }))
}

#[utoipa::path(
    get,
    path = "/api/results",
    params(ResultFilterParams),
    responses(
        (status = 200, description = "Results visible to the caller", body = PaginatedResultsResponse)
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_results(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<ResultFilterParams>,
) -> Result<Json<PaginatedResultsResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let results = ResultService::list_results(&state.db, scope, filters).await?;
    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/api/results/{id}",
    params(("id" = ResultId, Path, description = "Result ID")),
    responses(
        (status = 200, description = "Result", body = SubjectResult),
        (status = 403, description = "Not your record", body = ErrorResponse),
        (status = 404, description = "Result not found", body = ErrorResponse)
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_result(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ResultId>,
) -> Result<Json<SubjectResult>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let result = ResultService::get_result(&state.db, scope, id).await?;
    Ok(Json(result))
}

#[utoipa::path(
    put,
    path = "/api/results/{id}",
    params(("id" = ResultId, Path, description = "Result ID")),
    request_body = UpdateResultDto,
    responses(
        (status = 200, description = "Result updated", body = SubjectResult),
        (status = 403, description = "Teacher does not teach the subject to the student", body = ErrorResponse),
        (status = 404, description = "Result not found", body = ErrorResponse)
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_result(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<ResultId>,
    ValidatedJson(dto): ValidatedJson<UpdateResultDto>,
) -> Result<Json<SubjectResult>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let result = ResultService::update_result(&state.db, scope, id, dto).await?;
    Ok(Json(result))
}

#[utoipa::path(
    delete,
    path = "/api/results/{id}",
    params(("id" = ResultId, Path, description = "Result ID")),
    responses(
        (status = 204, description = "Result deleted"),
        (status = 403, description = "Teacher does not teach the subject to the student", body = ErrorResponse),
        (status = 404, description = "Result not found", body = ErrorResponse)
    ),
    tag = "Results",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_result(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<ResultId>,
) -> Result<StatusCode, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    ResultService::delete_result(&state.db, scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
