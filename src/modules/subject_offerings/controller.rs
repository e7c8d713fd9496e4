use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::SubjectOfferingId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::subject_offerings::model::{
    CreateSubjectOfferingDto, PaginatedSubjectOfferingsResponse, SubjectOffering,
    SubjectOfferingDetail, SubjectOfferingFilterParams, UpdateSubjectOfferingDto,
};
use crate::modules::subject_offerings::service::SubjectOfferingService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/subject-offerings",
    request_body = CreateSubjectOfferingDto,
    responses(
        (status = 201, description = "Offering created", body = SubjectOffering),
        (status = 404, description = "Subject, teacher or semester not found", body = ErrorResponse),
        (status = 409, description = "Subject already offered in the semester", body = ErrorResponse)
    ),
    tag = "Subject Offerings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_offering(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateSubjectOfferingDto>,
) -> Result<(StatusCode, Json<SubjectOffering>), AppError> {
    let offering = SubjectOfferingService::create_offering(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(offering)))
}

#[utoipa::path(
    get,
    path = "/api/subject-offerings",
    params(SubjectOfferingFilterParams),
    responses(
        (status = 200, description = "Offerings", body = PaginatedSubjectOfferingsResponse)
    ),
    tag = "Subject Offerings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_offerings(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(filters): Query<SubjectOfferingFilterParams>,
) -> Result<Json<PaginatedSubjectOfferingsResponse>, AppError> {
    let offerings = SubjectOfferingService::list_offerings(&state.db, filters).await?;
    Ok(Json(offerings))
}

#[utoipa::path(
    get,
    path = "/api/subject-offerings/{id}",
    params(("id" = SubjectOfferingId, Path, description = "Subject offering ID")),
    responses(
        (status = 200, description = "Offering", body = SubjectOfferingDetail),
        (status = 404, description = "Offering not found", body = ErrorResponse)
    ),
    tag = "Subject Offerings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_offering(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<SubjectOfferingId>,
) -> Result<Json<SubjectOfferingDetail>, AppError> {
    let offering = SubjectOfferingService::get_offering(&state.db, id).await?;
    Ok(Json(offering))
}

#[utoipa::path(
    put,
    path = "/api/subject-offerings/{id}",
    params(("id" = SubjectOfferingId, Path, description = "Subject offering ID")),
    request_body = UpdateSubjectOfferingDto,
    responses(
        (status = 200, description = "Teacher reassigned", body = SubjectOffering),
        (status = 404, description = "Offering or teacher not found", body = ErrorResponse)
    ),
    tag = "Subject Offerings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_offering(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<SubjectOfferingId>,
    ValidatedJson(dto): ValidatedJson<UpdateSubjectOfferingDto>,
) -> Result<Json<SubjectOffering>, AppError> {
    let offering = SubjectOfferingService::update_offering(&state.db, id, dto).await?;
    Ok(Json(offering))
}

#[utoipa::path(
    delete,
    path = "/api/subject-offerings/{id}",
    params(("id" = SubjectOfferingId, Path, description = "Subject offering ID")),
    responses(
        (status = 204, description = "Offering deleted"),
        (status = 404, description = "Offering not found", body = ErrorResponse)
    ),
    tag = "Subject Offerings",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_offering(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<SubjectOfferingId>,
) -> Result<StatusCode, AppError> {
    SubjectOfferingService::delete_offering(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
