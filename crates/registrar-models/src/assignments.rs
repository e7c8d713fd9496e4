//! Assignments set on a subject offering.

use crate::ids::{AssignmentId, SubjectOfferingId};
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::{deserialize_optional_date, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Assignment {
    pub id: AssignmentId,
    pub subject_offering_id: SubjectOfferingId,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_assignment_dates"))]
pub struct CreateAssignmentDto {
    pub subject_offering_id: SubjectOfferingId,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
}

fn validate_assignment_dates(dto: &CreateAssignmentDto) -> Result<(), ValidationError> {
    check_due_after_start(dto.start_date, dto.due_date)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAssignmentDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// An assignment may be due on the day it is set, never before.
pub fn check_due_after_start(start: NaiveDate, due: NaiveDate) -> Result<(), ValidationError> {
    if start <= due {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_order");
        err.message = Some("due_date must not be before start_date".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AssignmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_offering_id: Option<Uuid>,
    /// Earliest due date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>, format = Date)]
    pub due_from: Option<NaiveDate>,
    /// Latest due date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>, format = Date)]
    pub due_to: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedAssignmentsResponse, Assignment);

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    #[test]
    fn test_same_day_due_is_allowed() {
        let dto = CreateAssignmentDto {
            subject_offering_id: SubjectOfferingId::new(),
            title: "Essay".to_string(),
            description: None,
            start_date: d(10, 1),
            due_date: d(10, 1),
        };
        assert!(dto.validate().is_ok());
        assert!(
            CreateAssignmentDto {
                due_date: d(9, 30),
                ..dto
            }
            .validate()
            .is_err()
        );
    }
}
