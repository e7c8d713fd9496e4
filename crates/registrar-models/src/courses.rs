//! Courses (programmes of study) and subjects.

use crate::ids::{CourseId, SubjectId};
use chrono::{DateTime, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_string;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    /// Number of semesters the course runs for
    pub duration_semesters: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "CS")]
    pub code: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 20))]
    pub duration_semesters: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 20))]
    pub duration_semesters: Option<i32>,
}

/// Name/code search shared by courses and subjects.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogFilterParams {
    /// Case-insensitive match on name or code
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedCoursesResponse, Course);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectDto {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "MTH101")]
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectDto {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub code: Option<String>,
    pub description: Option<String>,
}

paginated!(PaginatedSubjectsResponse, Subject);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_course_validation() {
        let ok = CreateCourseDto {
            name: "Computer Science".to_string(),
            code: "CS".to_string(),
            description: None,
            duration_semesters: 8,
        };
        assert!(ok.validate().is_ok());

        let zero_semesters = CreateCourseDto {
            duration_semesters: 0,
            ..ok.clone()
        };
        assert!(zero_semesters.validate().is_err());

        let long_code = CreateCourseDto {
            code: "X".repeat(21),
            ..ok
        };
        assert!(long_code.validate().is_err());
    }

    #[test]
    fn test_update_course_allows_empty_patch() {
        let patch = UpdateCourseDto {
            name: None,
            code: None,
            description: None,
            duration_semesters: None,
        };
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_catalog_filter_blank_search() {
        let params: CatalogFilterParams =
            serde_json::from_str(r#"{"search":"","limit":"5"}"#).unwrap();
        assert!(params.search.is_none());
        assert_eq!(params.pagination.limit(), 5);
    }

    #[test]
    fn test_create_subject_requires_code() {
        let dto = CreateSubjectDto {
            name: "Mathematics".to_string(),
            code: String::new(),
            description: None,
        };
        assert!(dto.validate().is_err());
    }
}
