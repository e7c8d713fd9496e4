//! Student profiles.

use crate::ids::{AdmissionId, CourseId, ParentId, StudentId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::{deserialize_optional_string, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: StudentId,
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Option<ParentId>,
    pub course_id: Option<CourseId>,
    /// Admission the student was provisioned from, if any
    pub admission_id: Option<AdmissionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Option<ParentId>,
    pub course_id: Option<CourseId>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_id: Option<ParentId>,
    pub course_id: Option<CourseId>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub parent_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedStudentsResponse, Student);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_filter_parses_uuid_strings() {
        let params: StudentFilterParams = serde_json::from_str(
            r#"{"course_id":"12345678-1234-1234-1234-123456789abc","parent_id":"","page":"2"}"#,
        )
        .unwrap();
        assert!(params.course_id.is_some());
        assert!(params.parent_id.is_none());
        assert_eq!(params.pagination.offset(), 10);
    }

    #[test]
    fn test_create_student_rejects_bad_email() {
        let dto = CreateStudentDto {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada-at-example".to_string(),
            password: "password123".to_string(),
            phone: None,
            address: None,
            date_of_birth: None,
            parent_id: None,
            course_id: None,
        };
        assert!(dto.validate().is_err());
    }
}
