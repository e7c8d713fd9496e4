use sqlx::{PgConnection, PgPool};
use tracing::{error, info, instrument};

use registrar_config::AdmissionConfig;
use registrar_core::AppError;
use registrar_models::AdmissionEvent;
use registrar_models::ids::{AdmissionId, PaymentId, UserId};

use crate::modules::admissions::service::AdmissionService;
use crate::modules::payments::model::{Payment, PaymentStatus, SubmitPaymentDto};
use crate::utils::email::EmailService;

const PAYMENT_COLUMNS: &str = "id, admission_id, amount_minor, method, reference, status, \
     reviewed_by, reviewed_at, rejection_reason, created_at, updated_at";

/// Locks a payment row that is still awaiting review.
async fn lock_pending(conn: &mut PgConnection, id: PaymentId) -> Result<Payment, AppError> {
    let payment = sqlx::query_as::<_, Payment>(&format!(
        "SELECT {} FROM payments WHERE id = $1 FOR UPDATE",
        PAYMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Payment not found")))?;

    if payment.status != PaymentStatus::Pending {
        return Err(AppError::conflict(anyhow::anyhow!(
            "Payment has already been reviewed ({})",
            payment.status
        )));
    }
    Ok(payment)
}

pub struct PaymentService;

impl PaymentService {
    /// Records a fee payment for review. One pending or approved payment per
    /// admission; a rejected one may be replaced.
    #[instrument(skip(db, config, dto))]
    pub async fn submit_payment(
        db: &PgPool,
        config: &AdmissionConfig,
        admission_id: AdmissionId,
        dto: SubmitPaymentDto,
    ) -> Result<Payment, AppError> {
        if dto.amount_minor < config.fee_minor {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Payment must cover the admission fee of {}",
                config.fee_minor
            )));
        }

        let mut tx = db.begin().await?;
        let admission = AdmissionService::lock(&mut *tx, admission_id).await?;

        if admission.status.is_terminal() {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Admission is {} and accepts no payments",
                admission.status
            )));
        }
        if admission.status.payment_verified() {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Payment for this admission is already approved"
            )));
        }

        let live = sqlx::query_scalar::<_, PaymentStatus>(
            "SELECT status FROM payments WHERE admission_id = $1 AND status <> 'REJECTED'",
        )
        .bind(admission_id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(status) = live.filter(PaymentStatus::blocks_resubmission) {
            return Err(AppError::conflict(anyhow::anyhow!(
                "A {} payment already exists for this admission",
                status.to_string().to_lowercase()
            )));
        }

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments (admission_id, amount_minor, method, reference)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(admission_id)
        .bind(dto.amount_minor)
        .bind(dto.method.trim())
        .bind(dto.reference.trim())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from_db(e, "A payment for this admission is already under review")
        })?;
        tx.commit().await?;

        info!(payment_id = %payment.id, admission_id = %admission_id, "Payment submitted");
        Ok(payment)
    }

    #[instrument(skip(db))]
    pub async fn list_for_admission(
        db: &PgPool,
        admission_id: AdmissionId,
    ) -> Result<Vec<Payment>, AppError> {
        AdmissionService::get_admission(db, admission_id).await?;

        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE admission_id = $1 ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(admission_id)
        .fetch_all(db)
        .await?;
        Ok(payments)
    }

    /// Approves the payment and records the payment verification on the
    /// admission, completing it when the parent already confirmed.
    #[instrument(skip(db, email))]
    pub async fn approve_payment(
        db: &PgPool,
        email: &EmailService,
        id: PaymentId,
        reviewer: UserId,
    ) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;
        let payment = lock_pending(&mut *tx, id).await?;
        let admission = AdmissionService::lock(&mut *tx, payment.admission_id).await?;

        let (_, notices) =
            AdmissionService::apply_event(&mut *tx, admission, AdmissionEvent::PaymentApproved)
                .await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET
                status = 'APPROVED',
                reviewed_by = $1,
                reviewed_at = NOW(),
                updated_at = NOW()
             WHERE id = $2
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(reviewer)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(payment_id = %id, admission_id = %payment.admission_id, "Payment approved");
        AdmissionService::send_credentials(email, &notices).await;
        Ok(payment)
    }

    /// Rejects the payment. The admission keeps its status so a new payment
    /// can be submitted.
    #[instrument(skip(db, email, reason))]
    pub async fn reject_payment(
        db: &PgPool,
        email: &EmailService,
        id: PaymentId,
        reviewer: UserId,
        reason: &str,
    ) -> Result<Payment, AppError> {
        let mut tx = db.begin().await?;
        lock_pending(&mut *tx, id).await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments SET
                status = 'REJECTED',
                reviewed_by = $1,
                reviewed_at = NOW(),
                rejection_reason = $2,
                updated_at = NOW()
             WHERE id = $3
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(reviewer)
        .bind(reason)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let applicant = sqlx::query_as::<_, (String, String)>(
            "SELECT email, first_name FROM admission_forms WHERE id = $1",
        )
        .bind(payment.admission_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(payment_id = %id, admission_id = %payment.admission_id, "Payment rejected");

        let (to, name) = applicant;
        if let Err(e) = email.send_payment_rejected(&to, &name, reason).await {
            error!(payment_id = %id, error = %e.error, "Failed to send payment rejection email");
            crate::metrics::track_email_failed("payment_rejected");
        }
        Ok(payment)
    }
}
