//! Semesters belong to a course and bound the dates lessons occur on.

use crate::ids::{CourseId, SemesterId};
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Semester {
    pub id: SemesterId,
    pub course_id: CourseId,
    /// Position within the course, starting at 1
    pub number: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateSemesterDto {
    #[validate(range(min = 1, max = 20))]
    pub number: i32,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn validate_create_dates(dto: &CreateSemesterDto) -> Result<(), ValidationError> {
    check_date_order(dto.start_date, dto.end_date)
}

/// Partial update. Date order is checked against the stored row once the
/// patch is merged.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSemesterDto {
    #[validate(range(min = 1, max = 20))]
    pub number: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A semester must start strictly before it ends.
pub fn check_date_order(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if start < end {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_order");
        err.message = Some("start_date must be before end_date".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SemesterFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedSemestersResponse, Semester);

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_semester_dates_must_be_ordered() {
        let dto = CreateSemesterDto {
            number: 1,
            name: "First Semester".to_string(),
            start_date: date(2025, 9, 1),
            end_date: date(2026, 1, 31),
        };
        assert!(dto.validate().is_ok());

        let same_day = CreateSemesterDto {
            end_date: date(2025, 9, 1),
            ..dto.clone()
        };
        assert!(same_day.validate().is_err());

        let reversed = CreateSemesterDto {
            start_date: date(2026, 2, 1),
            ..dto
        };
        assert!(reversed.validate().is_err());
    }

    #[test]
    fn test_check_date_order() {
        assert!(check_date_order(date(2025, 1, 1), date(2025, 1, 2)).is_ok());
        assert!(check_date_order(date(2025, 1, 2), date(2025, 1, 1)).is_err());
    }
}
