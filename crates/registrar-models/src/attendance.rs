//! Attendance marks per student, lesson and date.

use crate::ids::{AttendanceId, LessonId, StudentId};
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::{deserialize_optional_date, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attendance {
    pub id: AttendanceId,
    pub student_id: StudentId,
    pub lesson_id: LessonId,
    pub date: NaiveDate,
    pub present: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct AttendanceMark {
    pub student_id: StudentId,
    pub present: bool,
}

/// A register for one lesson on one date.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordAttendanceDto {
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 500))]
    pub records: Vec<AttendanceMark>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub lesson_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedAttendanceResponse, Attendance);

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceSummaryParams {
    /// Required for admins and teachers; students default to themselves
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub student_id: StudentId,
    pub present: i64,
    pub total: i64,
    /// Fraction of lessons attended, 0.0 when nothing is recorded
    pub rate: f64,
}

impl AttendanceSummary {
    pub fn new(student_id: StudentId, present: i64, total: i64) -> Self {
        let rate = if total > 0 {
            present as f64 / total as f64
        } else {
            0.0
        };
        Self {
            student_id,
            present,
            total,
            rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rate() {
        let id = StudentId::new();
        assert_eq!(AttendanceSummary::new(id, 3, 4).rate, 0.75);
        assert_eq!(AttendanceSummary::new(id, 0, 0).rate, 0.0);
    }

    #[test]
    fn test_empty_register_is_invalid() {
        let dto = RecordAttendanceDto {
            date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            records: vec![],
        };
        assert!(dto.validate().is_err());
    }
}
