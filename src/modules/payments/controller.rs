use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::{AdmissionId, PaymentId};

use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::payments::model::{Payment, RejectPaymentDto, SubmitPaymentDto};
use crate::modules::payments::service::PaymentService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

/// Public: the applicant reports the fee payment for review.
#[utoipa::path(
    post,
    path = "/api/admissions/{id}/payments",
    params(("id" = AdmissionId, Path, description = "Admission ID")),
    request_body = SubmitPaymentDto,
    responses(
        (status = 201, description = "Payment recorded", body = Payment),
        (status = 400, description = "Amount below the admission fee", body = ErrorResponse),
        (status = 404, description = "Admission not found", body = ErrorResponse),
        (status = 409, description = "Payment already pending or approved, or admission closed", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    ),
    tag = "Payments"
)]
#[instrument(skip(state, dto))]
pub async fn submit_payment(
    State(state): State<AppState>,
    Path(id): Path<AdmissionId>,
    ValidatedJson(dto): ValidatedJson<SubmitPaymentDto>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment =
        PaymentService::submit_payment(&state.db, &state.admission_config, id, dto).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/admissions/{id}/payments",
    params(("id" = AdmissionId, Path, description = "Admission ID")),
    responses(
        (status = 200, description = "Payments, newest first", body = Vec<Payment>),
        (status = 404, description = "Admission not found", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_admission_payments(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<AdmissionId>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = PaymentService::list_for_admission(&state.db, id).await?;
    Ok(Json(payments))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/approve",
    params(("id" = PaymentId, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment approved", body = Payment),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already reviewed or admission closed", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn approve_payment(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    Path(id): Path<PaymentId>,
) -> Result<Json<Payment>, AppError> {
    let reviewer = auth_user.user_id()?;
    let payment = PaymentService::approve_payment(&state.db, &state.email, id, reviewer).await?;
    Ok(Json(payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/reject",
    params(("id" = PaymentId, Path, description = "Payment ID")),
    request_body = RejectPaymentDto,
    responses(
        (status = 200, description = "Payment rejected", body = Payment),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment already reviewed", body = ErrorResponse)
    ),
    tag = "Payments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn reject_payment(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    Path(id): Path<PaymentId>,
    ValidatedJson(dto): ValidatedJson<RejectPaymentDto>,
) -> Result<Json<Payment>, AppError> {
    let reviewer = auth_user.user_id()?;
    let payment =
        PaymentService::reject_payment(&state.db, &state.email, id, reviewer, &dto.reason).await?;
    Ok(Json(payment))
}
