use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{error, info, instrument, warn};

use registrar_auth::{Role, generate_token, hash_token};
use registrar_config::AdmissionConfig;
use registrar_core::{AppError, PaginationMeta};
use registrar_models::ids::{AdmissionId, ParentId, StudentId};
use registrar_models::users::NewAccount;

use crate::modules::admissions::model::{
    Admission, AdmissionEvent, AdmissionFilterParams, AdmissionReceipt, AdmissionStatus,
    AdmissionStatusResponse, PaginatedAdmissionsResponse, SubmitAdmissionDto, TransitionError,
};
use crate::utils::email::EmailService;
use crate::utils::identity::{IdentityProvider, normalize_email};

pub(crate) const ADMISSION_COLUMNS: &str = "id, first_name, last_name, email, phone, address, \
     date_of_birth, course_id, parent_first_name, parent_last_name, parent_email, parent_phone, \
     status, parent_verified_at, payment_verified_at, completed_at, rejection_reason, \
     student_id, created_at, updated_at";

/// Login details of an account created during completion, mailed after
/// commit.
#[derive(Debug, Clone)]
pub struct CredentialNotice {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password: String,
}

fn transition_error(err: TransitionError) -> AppError {
    AppError::conflict(anyhow::anyhow!(err.to_string()))
}

pub struct AdmissionService;

impl AdmissionService {
    /// Stores a new PENDING form and mails the parent a verification link.
    ///
    /// A mail failure does not fail the submission; an admin can resend the
    /// link.
    #[instrument(skip(db, email, config, dto), fields(course_id = %dto.course_id))]
    pub async fn submit(
        db: &PgPool,
        email: &EmailService,
        config: &AdmissionConfig,
        dto: SubmitAdmissionDto,
    ) -> Result<AdmissionReceipt, AppError> {
        let course_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
                .bind(dto.course_id)
                .fetch_one(db)
                .await?;
        if !course_exists {
            return Err(AppError::not_found(anyhow::anyhow!("Course not found")));
        }

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(config.token_ttl_hours);

        let admission = sqlx::query_as::<_, Admission>(&format!(
            "INSERT INTO admission_forms
                (first_name, last_name, email, phone, address, date_of_birth, course_id,
                 parent_first_name, parent_last_name, parent_email, parent_phone,
                 verification_token_hash, verification_expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {}",
            ADMISSION_COLUMNS
        ))
        .bind(dto.first_name.trim())
        .bind(dto.last_name.trim())
        .bind(normalize_email(&dto.email))
        .bind(&dto.phone)
        .bind(&dto.address)
        .bind(dto.date_of_birth)
        .bind(dto.course_id)
        .bind(dto.parent_first_name.trim())
        .bind(dto.parent_last_name.trim())
        .bind(normalize_email(&dto.parent_email))
        .bind(&dto.parent_phone)
        .bind(hash_token(&token))
        .bind(expires_at)
        .fetch_one(db)
        .await?;

        crate::metrics::track_admission_submitted();
        info!(admission_id = %admission.id, "Admission submitted");

        if let Err(e) = email
            .send_parent_verification(
                &admission.parent_email,
                &admission.parent_first_name,
                &format!("{} {}", admission.first_name, admission.last_name),
                &token,
                config.token_ttl_hours,
            )
            .await
        {
            error!(
                admission_id = %admission.id,
                error = %e.error,
                "Failed to send parent verification email"
            );
            crate::metrics::track_email_failed("parent_verification");
        }

        Ok(AdmissionReceipt {
            id: admission.id,
            status: admission.status,
            fee_minor: config.fee_minor,
            message: "Application received. The parent has been emailed a verification link."
                .to_string(),
        })
    }

    /// Confirms the parent's email from the link token.
    #[instrument(skip(db, email, token))]
    pub async fn verify_parent_email(
        db: &PgPool,
        email: &EmailService,
        token: &str,
    ) -> Result<AdmissionStatusResponse, AppError> {
        let mut tx = db.begin().await?;

        let found = sqlx::query_as::<_, (AdmissionId, Option<chrono::DateTime<Utc>>)>(
            "SELECT id, verification_expires_at FROM admission_forms
             WHERE verification_token_hash = $1
             FOR UPDATE",
        )
        .bind(hash_token(token))
        .fetch_optional(&mut *tx)
        .await?;

        let Some((id, expires_at)) = found else {
            warn!("Unknown verification token");
            return Err(AppError::not_found(anyhow::anyhow!(
                "Verification link is invalid or has already been used"
            )));
        };
        if expires_at.is_none_or(|at| at < Utc::now()) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Verification link has expired"
            )));
        }

        let admission = Self::lock(&mut *tx, id).await?;
        let (admission, notices) =
            Self::apply_event(&mut *tx, admission, AdmissionEvent::ParentVerified).await?;
        tx.commit().await?;

        Self::send_credentials(email, &notices).await;

        let message = match admission.status {
            AdmissionStatus::Completed => {
                "Admission completed. Login details have been emailed."
            }
            _ => "Thank you. The application is now awaiting payment approval.",
        };
        Ok(AdmissionStatusResponse {
            id: admission.id,
            status: admission.status,
            message: message.to_string(),
        })
    }

    /// Issues a fresh link for forms still waiting on the parent.
    #[instrument(skip(db, email, config))]
    pub async fn resend_verification(
        db: &PgPool,
        email: &EmailService,
        config: &AdmissionConfig,
        id: AdmissionId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        let admission = Self::lock(&mut *tx, id).await?;

        if !matches!(
            admission.status,
            AdmissionStatus::Pending | AdmissionStatus::PaymentVerified
        ) {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Admission is {} and needs no parent verification",
                admission.status
            )));
        }

        let token = generate_token();
        sqlx::query(
            "UPDATE admission_forms
             SET verification_token_hash = $1, verification_expires_at = $2, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(hash_token(&token))
        .bind(Utc::now() + Duration::hours(config.token_ttl_hours))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        email
            .send_parent_verification(
                &admission.parent_email,
                &admission.parent_first_name,
                &format!("{} {}", admission.first_name, admission.last_name),
                &token,
                config.token_ttl_hours,
            )
            .await
            .inspect_err(|_| crate::metrics::track_email_failed("parent_verification"))?;

        info!(admission_id = %id, "Verification link resent");
        Ok(())
    }

    #[instrument(skip(db, email, reason))]
    pub async fn reject(
        db: &PgPool,
        email: &EmailService,
        id: AdmissionId,
        reason: &str,
    ) -> Result<Admission, AppError> {
        let mut tx = db.begin().await?;
        let admission = Self::lock(&mut *tx, id).await?;
        let next = admission
            .status
            .apply(AdmissionEvent::Rejected)
            .map_err(transition_error)?;

        let admission = sqlx::query_as::<_, Admission>(&format!(
            "UPDATE admission_forms SET
                status = $1,
                rejection_reason = $2,
                verification_token_hash = NULL,
                verification_expires_at = NULL,
                updated_at = NOW()
             WHERE id = $3
             RETURNING {}",
            ADMISSION_COLUMNS
        ))
        .bind(next)
        .bind(reason)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        crate::metrics::track_admission_transition(next.as_str());
        info!(admission_id = %id, "Admission rejected");

        if let Err(e) = email
            .send_admission_rejected(&admission.email, &admission.first_name, reason)
            .await
        {
            error!(admission_id = %id, error = %e.error, "Failed to send rejection email");
            crate::metrics::track_email_failed("admission_rejected");
        }

        Ok(admission)
    }

    #[instrument(skip(db))]
    pub async fn list_admissions(
        db: &PgPool,
        filters: AdmissionFilterParams,
    ) -> Result<PaginatedAdmissionsResponse, AppError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM admission_forms
             WHERE ($1::admission_status IS NULL OR status = $1)",
        )
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let data = sqlx::query_as::<_, Admission>(&format!(
            "SELECT {} FROM admission_forms
             WHERE ($1::admission_status IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
            ADMISSION_COLUMNS
        ))
        .bind(filters.status)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedAdmissionsResponse {
            data,
            meta: PaginationMeta::from_params(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_admission(db: &PgPool, id: AdmissionId) -> Result<Admission, AppError> {
        sqlx::query_as::<_, Admission>(&format!(
            "SELECT {} FROM admission_forms WHERE id = $1",
            ADMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Admission not found")))
    }

    /// Loads the form and holds its row lock until the transaction ends.
    pub(crate) async fn lock(
        conn: &mut PgConnection,
        id: AdmissionId,
    ) -> Result<Admission, AppError> {
        sqlx::query_as::<_, Admission>(&format!(
            "SELECT {} FROM admission_forms WHERE id = $1 FOR UPDATE",
            ADMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Admission not found")))
    }

    /// Applies a verification to a locked form. On completion the parent and
    /// student are provisioned and their credentials returned for mailing.
    pub(crate) async fn apply_event(
        conn: &mut PgConnection,
        admission: Admission,
        event: AdmissionEvent,
    ) -> Result<(Admission, Vec<CredentialNotice>), AppError> {
        let next = admission.status.apply(event).map_err(transition_error)?;

        let query = match event {
            AdmissionEvent::ParentVerified => format!(
                "UPDATE admission_forms SET
                    status = $1,
                    parent_verified_at = NOW(),
                    verification_token_hash = NULL,
                    verification_expires_at = NULL,
                    updated_at = NOW()
                 WHERE id = $2
                 RETURNING {}",
                ADMISSION_COLUMNS
            ),
            AdmissionEvent::PaymentApproved => format!(
                "UPDATE admission_forms SET
                    status = $1,
                    payment_verified_at = NOW(),
                    updated_at = NOW()
                 WHERE id = $2
                 RETURNING {}",
                ADMISSION_COLUMNS
            ),
            AdmissionEvent::Rejected => format!(
                "UPDATE admission_forms SET status = $1, updated_at = NOW()
                 WHERE id = $2
                 RETURNING {}",
                ADMISSION_COLUMNS
            ),
        };

        let updated = sqlx::query_as::<_, Admission>(&query)
            .bind(next)
            .bind(admission.id)
            .fetch_one(&mut *conn)
            .await?;

        crate::metrics::track_admission_transition(next.as_str());
        info!(admission_id = %updated.id, status = %next, "Admission advanced");

        if next != AdmissionStatus::Completed {
            return Ok((updated, Vec::new()));
        }
        Self::complete(conn, updated).await
    }

    /// Creates (or reuses) the parent, creates the student and links both to
    /// the form.
    async fn complete(
        conn: &mut PgConnection,
        admission: Admission,
    ) -> Result<(Admission, Vec<CredentialNotice>), AppError> {
        let mut notices = Vec::new();

        let existing_parent = sqlx::query_scalar::<_, ParentId>(
            "SELECT id FROM parents WHERE email = $1 FOR UPDATE",
        )
        .bind(&admission.parent_email)
        .fetch_optional(&mut *conn)
        .await?;

        let parent_id = match existing_parent {
            Some(id) => {
                info!(parent_id = %id, "Reusing existing parent");
                id
            }
            None => {
                let account = IdentityProvider::create_account(
                    &mut *conn,
                    NewAccount {
                        first_name: admission.parent_first_name.clone(),
                        last_name: admission.parent_last_name.clone(),
                        email: admission.parent_email.clone(),
                        role: Role::Parent,
                        password: None,
                    },
                )
                .await?;

                let id = sqlx::query_scalar::<_, ParentId>(
                    "INSERT INTO parents (user_id, first_name, last_name, email, phone)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING id",
                )
                .bind(account.user.id)
                .bind(&admission.parent_first_name)
                .bind(&admission.parent_last_name)
                .bind(&admission.parent_email)
                .bind(&admission.parent_phone)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| AppError::from_db(e, "A parent with this email already exists"))?;

                notices.push(CredentialNotice {
                    email: account.user.email,
                    name: admission.parent_first_name.clone(),
                    role: Role::Parent,
                    password: account.password,
                });
                id
            }
        };

        let account = IdentityProvider::create_account(
            &mut *conn,
            NewAccount {
                first_name: admission.first_name.clone(),
                last_name: admission.last_name.clone(),
                email: admission.email.clone(),
                role: Role::Student,
                password: None,
            },
        )
        .await?;

        let student_id = sqlx::query_scalar::<_, StudentId>(
            "INSERT INTO students
                (user_id, first_name, last_name, email, phone, address, date_of_birth,
                 parent_id, course_id, admission_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
        )
        .bind(account.user.id)
        .bind(&admission.first_name)
        .bind(&admission.last_name)
        .bind(&admission.email)
        .bind(&admission.phone)
        .bind(&admission.address)
        .bind(admission.date_of_birth)
        .bind(parent_id)
        .bind(admission.course_id)
        .bind(admission.id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_db(e, "A student with this email already exists"))?;

        notices.push(CredentialNotice {
            email: account.user.email,
            name: admission.first_name.clone(),
            role: Role::Student,
            password: account.password,
        });

        let completed = sqlx::query_as::<_, Admission>(&format!(
            "UPDATE admission_forms SET student_id = $1, completed_at = NOW(), updated_at = NOW()
             WHERE id = $2
             RETURNING {}",
            ADMISSION_COLUMNS
        ))
        .bind(student_id)
        .bind(admission.id)
        .fetch_one(&mut *conn)
        .await?;

        info!(
            admission_id = %completed.id,
            student_id = %student_id,
            parent_id = %parent_id,
            "Admission completed"
        );
        Ok((completed, notices))
    }

    /// Mails provisioned credentials. Failures are logged and counted; the
    /// accounts stay.
    pub(crate) async fn send_credentials(email: &EmailService, notices: &[CredentialNotice]) {
        for notice in notices {
            if let Err(e) = email
                .send_account_credentials(
                    &notice.email,
                    &notice.name,
                    notice.role.as_str(),
                    &notice.password,
                )
                .await
            {
                error!(
                    to = %notice.email,
                    role = %notice.role,
                    error = %e.error,
                    "Failed to send account credentials"
                );
                crate::metrics::track_email_failed("account_credentials");
            }
        }
    }
}
