//! Weekly lessons and their dated occurrences.

use crate::ids::{LessonId, SemesterId, SubjectOfferingId, TeacherId};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::{
    deserialize_optional_date, deserialize_optional_from_str, deserialize_optional_uuid,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Day of the week a lesson repeats on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "weekday", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "MONDAY",
            Weekday::Tuesday => "TUESDAY",
            Weekday::Wednesday => "WEDNESDAY",
            Weekday::Thursday => "THURSDAY",
            Weekday::Friday => "FRIDAY",
            Weekday::Saturday => "SATURDAY",
            Weekday::Sunday => "SUNDAY",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MONDAY" => Ok(Weekday::Monday),
            "TUESDAY" => Ok(Weekday::Tuesday),
            "WEDNESDAY" => Ok(Weekday::Wednesday),
            "THURSDAY" => Ok(Weekday::Thursday),
            "FRIDAY" => Ok(Weekday::Friday),
            "SATURDAY" => Ok(Weekday::Saturday),
            "SUNDAY" => Ok(Weekday::Sunday),
            other => Err(format!("Invalid weekday: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: LessonId,
    pub subject_offering_id: SubjectOfferingId,
    pub name: String,
    pub day: Weekday,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:30:00")]
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLessonDto {
    pub subject_offering_id: SubjectOfferingId,
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    pub day: Weekday,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:30:00")]
    pub end_time: NaiveTime,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateLessonDto {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    pub day: Option<Weekday>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveTime>,
    #[validate(length(max = 50))]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LessonFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_from_str")]
    #[param(value_type = Option<String>, example = "MONDAY")]
    pub day: Option<Weekday>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_offering_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    /// Lessons of offerings this student is enrolled in
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedLessonsResponse, Lesson);

/// Date range for `/api/lessons/schedule`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleParams {
    #[param(value_type = String, format = Date)]
    pub from: NaiveDate,
    #[param(value_type = String, format = Date)]
    pub to: NaiveDate,
    /// Admin only: restrict to one teacher
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub teacher_id: Option<Uuid>,
    /// Admin only: restrict to one student's enrollments
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
}

/// Lesson row joined with the owning teacher and semester bounds.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduledLesson {
    pub id: LessonId,
    pub subject_offering_id: SubjectOfferingId,
    pub teacher_id: TeacherId,
    pub semester_id: SemesterId,
    pub name: String,
    pub day: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
    pub semester_start: NaiveDate,
    pub semester_end: NaiveDate,
}

/// One dated instance of a weekly lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LessonOccurrence {
    pub lesson_id: LessonId,
    pub subject_offering_id: SubjectOfferingId,
    pub teacher_id: TeacherId,
    pub name: String,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub day: Weekday,
    #[schema(value_type = String)]
    pub start_time: NaiveTime,
    #[schema(value_type = String)]
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleResponse {
    #[schema(value_type = String, format = Date)]
    pub from: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub to: NaiveDate,
    pub occurrences: Vec<LessonOccurrence>,
}

/// Optional date window for list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateWindowParams {
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_from_chrono() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
        assert_eq!(Weekday::from(chrono::Datelike::weekday(&date)), Weekday::Monday);
    }

    #[test]
    fn test_weekday_parse_is_case_insensitive() {
        assert_eq!("friday".parse::<Weekday>(), Ok(Weekday::Friday));
        assert_eq!("SUNDAY".parse::<Weekday>(), Ok(Weekday::Sunday));
        assert!("funday".parse::<Weekday>().is_err());
    }

    #[test]
    fn test_weekday_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Weekday::Wednesday).unwrap(),
            "\"WEDNESDAY\""
        );
    }

    #[test]
    fn test_lesson_filter_day_from_query_string() {
        let params: LessonFilterParams =
            serde_json::from_str(r#"{"day":"tuesday","teacher_id":""}"#).unwrap();
        assert_eq!(params.day, Some(Weekday::Tuesday));
        assert!(params.teacher_id.is_none());
    }
}
