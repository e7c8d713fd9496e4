//! A subject taught by one teacher in one semester.

use crate::ids::{SemesterId, SubjectId, SubjectOfferingId, TeacherId};
use chrono::{DateTime, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubjectOffering {
    pub id: SubjectOfferingId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub semester_id: SemesterId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Offering joined with the names a timetable needs.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubjectOfferingDetail {
    pub id: SubjectOfferingId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: String,
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub semester_id: SemesterId,
    pub semester_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectOfferingDto {
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub semester_id: SemesterId,
}

/// Only the teacher can be reassigned; subject and semester identify the offering.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectOfferingDto {
    pub teacher_id: TeacherId,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubjectOfferingFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub semester_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedSubjectOfferingsResponse, SubjectOfferingDetail);
