//! Admission intake and its verification state machine.
//!
//! An application needs two independent confirmations, in either order: the
//! parent clicks the emailed link, and an admin approves the payment. The
//! second confirmation completes the admission and provisions accounts.
//!
//! ```text
//!            ParentVerified             PaymentApproved
//! PENDING ───────────────▶ PARENT_VERIFIED ─────────────▶ COMPLETED
//!    │                                                     ▲
//!    │ PaymentApproved                  ParentVerified     │
//!    └────────────────▶ PAYMENT_VERIFIED ──────────────────┘
//!
//! any non-terminal state ── Rejected ──▶ REJECTED
//! ```

use crate::ids::{AdmissionId, CourseId, StudentId};
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_from_str;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "admission_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdmissionStatus {
    Pending,
    ParentVerified,
    PaymentVerified,
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionEvent {
    ParentVerified,
    PaymentApproved,
    Rejected,
}

impl fmt::Display for AdmissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdmissionEvent::ParentVerified => "parent verification",
            AdmissionEvent::PaymentApproved => "payment approval",
            AdmissionEvent::Rejected => "rejection",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The verification carried by the event was already recorded.
    AlreadyApplied {
        status: AdmissionStatus,
        event: AdmissionEvent,
    },
    /// The admission is completed or rejected and accepts no more events.
    Terminal {
        status: AdmissionStatus,
        event: AdmissionEvent,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::AlreadyApplied { event, .. } => {
                write!(f, "Admission has already received {}", event)
            }
            TransitionError::Terminal { status, event } => {
                write!(f, "Cannot apply {} to a {} admission", event, status)
            }
        }
    }
}

impl std::error::Error for TransitionError {}

impl AdmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionStatus::Pending => "PENDING",
            AdmissionStatus::ParentVerified => "PARENT_VERIFIED",
            AdmissionStatus::PaymentVerified => "PAYMENT_VERIFIED",
            AdmissionStatus::Completed => "COMPLETED",
            AdmissionStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AdmissionStatus::Completed | AdmissionStatus::Rejected)
    }

    pub fn parent_verified(&self) -> bool {
        matches!(
            self,
            AdmissionStatus::ParentVerified | AdmissionStatus::Completed
        )
    }

    pub fn payment_verified(&self) -> bool {
        matches!(
            self,
            AdmissionStatus::PaymentVerified | AdmissionStatus::Completed
        )
    }

    /// Computes the status after `event`, or why the event is not allowed.
    pub fn apply(self, event: AdmissionEvent) -> Result<AdmissionStatus, TransitionError> {
        use AdmissionEvent as E;
        use AdmissionStatus as S;

        match (self, event) {
            (S::Completed | S::Rejected, _) => Err(TransitionError::Terminal {
                status: self,
                event,
            }),
            (_, E::Rejected) => Ok(S::Rejected),
            (S::Pending, E::ParentVerified) => Ok(S::ParentVerified),
            (S::Pending, E::PaymentApproved) => Ok(S::PaymentVerified),
            (S::ParentVerified, E::PaymentApproved) => Ok(S::Completed),
            (S::PaymentVerified, E::ParentVerified) => Ok(S::Completed),
            (S::ParentVerified, E::ParentVerified) | (S::PaymentVerified, E::PaymentApproved) => {
                Err(TransitionError::AlreadyApplied {
                    status: self,
                    event,
                })
            }
        }
    }
}

impl fmt::Display for AdmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(AdmissionStatus::Pending),
            "PARENT_VERIFIED" => Ok(AdmissionStatus::ParentVerified),
            "PAYMENT_VERIFIED" => Ok(AdmissionStatus::PaymentVerified),
            "COMPLETED" => Ok(AdmissionStatus::Completed),
            "REJECTED" => Ok(AdmissionStatus::Rejected),
            other => Err(format!("Invalid admission status: {}", other)),
        }
    }
}

/// Admission form as exposed to admins. The token hash stays server side.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Admission {
    pub id: AdmissionId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: NaiveDate,
    pub course_id: CourseId,
    pub parent_first_name: String,
    pub parent_last_name: String,
    pub parent_email: String,
    pub parent_phone: Option<String>,
    pub status: AdmissionStatus,
    pub parent_verified_at: Option<DateTime<Utc>>,
    pub payment_verified_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub student_id: Option<StudentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public intake form.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitAdmissionDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: NaiveDate,
    pub course_id: CourseId,
    #[validate(length(min = 1, max = 100))]
    pub parent_first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub parent_last_name: String,
    #[validate(email)]
    pub parent_email: String,
    #[validate(length(max = 30))]
    pub parent_phone: Option<String>,
}

/// Returned to the applicant after submitting the form.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdmissionReceipt {
    pub id: AdmissionId,
    pub status: AdmissionStatus,
    /// Fee to pay, in minor currency units
    pub fee_minor: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyParentQuery {
    #[validate(length(equal = 64))]
    pub token: String,
}

/// Public status view after verification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdmissionStatusResponse {
    pub id: AdmissionId,
    pub status: AdmissionStatus,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectAdmissionDto {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdmissionFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    #[param(value_type = Option<String>, example = "PENDING")]
    pub status: Option<AdmissionStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedAdmissionsResponse, Admission);

/// Status count for the dashboard.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AdmissionStatusCount {
    pub status: AdmissionStatus,
    pub count: i64,
}
