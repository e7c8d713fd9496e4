use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use validator::Validate;

use registrar_core::AppError;
use registrar_models::auth::MessageResponse;
use registrar_models::ids::AdmissionId;

use crate::middleware::role::RequireAdmin;
use crate::modules::admissions::model::{
    Admission, AdmissionFilterParams, AdmissionReceipt, AdmissionStatusResponse,
    PaginatedAdmissionsResponse, RejectAdmissionDto, SubmitAdmissionDto, VerifyParentQuery,
};
use crate::modules::admissions::service::AdmissionService;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Public admission form. No account is needed.
#[utoipa::path(
    post,
    path = "/api/admissions",
    request_body = SubmitAdmissionDto,
    responses(
        (status = 201, description = "Application received", body = AdmissionReceipt),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Admissions"
)]
#[instrument(skip(state, dto))]
pub async fn submit_admission(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<SubmitAdmissionDto>,
) -> Result<(StatusCode, Json<AdmissionReceipt>), AppError> {
    let receipt =
        AdmissionService::submit(&state.db, &state.email, &state.admission_config, dto).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Target of the emailed link.
#[utoipa::path(
    get,
    path = "/api/admissions/verify-parent",
    params(VerifyParentQuery),
    responses(
        (status = 200, description = "Parent verified", body = AdmissionStatusResponse),
        (status = 400, description = "Malformed or expired token", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 409, description = "Admission already verified or closed", body = ErrorResponse)
    ),
    tag = "Admissions"
)]
#[instrument(skip(state, query))]
pub async fn verify_parent(
    State(state): State<AppState>,
    Query(query): Query<VerifyParentQuery>,
) -> Result<Json<AdmissionStatusResponse>, AppError> {
    query
        .validate()
        .map_err(|_| AppError::bad_request(anyhow::anyhow!("Malformed verification token")))?;
    let response =
        AdmissionService::verify_parent_email(&state.db, &state.email, &query.token).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/admissions",
    params(AdmissionFilterParams),
    responses(
        (status = 200, description = "Admissions", body = PaginatedAdmissionsResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Admissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_admissions(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(filters): Query<AdmissionFilterParams>,
) -> Result<Json<PaginatedAdmissionsResponse>, AppError> {
    let admissions = AdmissionService::list_admissions(&state.db, filters).await?;
    Ok(Json(admissions))
}

#[utoipa::path(
    get,
    path = "/api/admissions/{id}",
    params(("id" = AdmissionId, Path, description = "Admission ID")),
    responses(
        (status = 200, description = "Admission", body = Admission),
        (status = 404, description = "Admission not found", body = ErrorResponse)
    ),
    tag = "Admissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_admission(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AdmissionId>,
) -> Result<Json<Admission>, AppError> {
    let admission = AdmissionService::get_admission(&state.db, id).await?;
    Ok(Json(admission))
}

#[utoipa::path(
    post,
    path = "/api/admissions/{id}/reject",
    params(("id" = AdmissionId, Path, description = "Admission ID")),
    request_body = RejectAdmissionDto,
    responses(
        (status = 200, description = "Admission rejected", body = Admission),
        (status = 404, description = "Admission not found", body = ErrorResponse),
        (status = 409, description = "Admission already closed", body = ErrorResponse)
    ),
    tag = "Admissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn reject_admission(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AdmissionId>,
    ValidatedJson(dto): ValidatedJson<RejectAdmissionDto>,
) -> Result<Json<Admission>, AppError> {
    let admission = AdmissionService::reject(&state.db, &state.email, id, &dto.reason).await?;
    Ok(Json(admission))
}

#[utoipa::path(
    post,
    path = "/api/admissions/{id}/resend-verification",
    params(("id" = AdmissionId, Path, description = "Admission ID")),
    responses(
        (status = 200, description = "New link sent", body = MessageResponse),
        (status = 404, description = "Admission not found", body = ErrorResponse),
        (status = 409, description = "Parent already verified or admission closed", body = ErrorResponse)
    ),
    tag = "Admissions",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn resend_verification(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AdmissionId>,
) -> Result<Json<MessageResponse>, AppError> {
    AdmissionService::resend_verification(&state.db, &state.email, &state.admission_config, id)
        .await?;
    Ok(Json(MessageResponse::new("Verification link sent to the parent")))
}
