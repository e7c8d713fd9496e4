//! Student enrollment in subject offerings.

use crate::ids::{EnrollmentId, StudentId, SubjectOfferingId};
use chrono::{DateTime, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub subject_offering_id: SubjectOfferingId,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollmentDto {
    pub student_id: StudentId,
    pub subject_offering_id: SubjectOfferingId,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EnrollmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_offering_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedEnrollmentsResponse, Enrollment);
