//! Admission fee payments.

use crate::ids::{AdmissionId, PaymentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use utoipa::ToSchema;
use validator::Validate;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    /// A pending or approved payment blocks submitting another one.
    pub fn blocks_resubmission(&self) -> bool {
        !matches!(self, PaymentStatus::Rejected)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: PaymentId,
    pub admission_id: AdmissionId,
    /// Amount in minor currency units
    pub amount_minor: i64,
    pub method: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitPaymentDto {
    #[validate(range(min = 1))]
    pub amount_minor: i64,
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "bank_transfer")]
    pub method: String,
    #[validate(length(min = 1, max = 100))]
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectPaymentDto {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}
