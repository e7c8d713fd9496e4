//! Teacher profiles.

use crate::ids::{TeacherId, UserId};
use chrono::{DateTime, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_string;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Teacher {
    pub id: TeacherId,
    /// Identity account, `None` once the account has been removed
    pub user_id: Option<UserId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeacherDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    /// Initial password for the teacher's account
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTeacherDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Search over first name, last name and email.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PersonFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedTeachersResponse, Teacher);

#[cfg(test)]
mod tests {
    use super::*;

    fn dto() -> CreateTeacherDto {
        CreateTeacherDto {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@college.edu".to_string(),
            password: "changeme123".to_string(),
            phone: None,
            address: None,
        }
    }

    #[test]
    fn test_create_teacher_validation() {
        assert!(dto().validate().is_ok());
        assert!(
            CreateTeacherDto {
                email: "grace".to_string(),
                ..dto()
            }
            .validate()
            .is_err()
        );
        assert!(
            CreateTeacherDto {
                password: "short".to_string(),
                ..dto()
            }
            .validate()
            .is_err()
        );
    }
}
