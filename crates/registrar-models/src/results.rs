//! Subject results and letter grading.

use crate::ids::{ResultId, StudentId, SubjectId};
use chrono::{DateTime, Utc};
use registrar_core::PaginationParams;
use registrar_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const GRADES: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

/// Letter grade for a score out of 100.
pub fn grade_for_score(score: f64) -> &'static str {
    match score {
        s if s >= 70.0 => "A",
        s if s >= 60.0 => "B",
        s if s >= 50.0 => "C",
        s if s >= 45.0 => "D",
        s if s >= 40.0 => "E",
        _ => "F",
    }
}

fn validate_grade(grade: &str) -> Result<(), ValidationError> {
    if GRADES.contains(&grade) {
        Ok(())
    } else {
        let mut err = ValidationError::new("grade");
        err.message = Some("grade must be one of A, B, C, D, E, F".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubjectResult {
    pub id: ResultId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub score: f64,
    pub grade: String,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One result to create or overwrite, keyed by (student, subject).
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResultEntry {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
    /// Derived from the score when omitted
    #[validate(custom(function = "validate_grade"))]
    pub grade: Option<String>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

impl ResultEntry {
    pub fn effective_grade(&self) -> String {
        self.grade
            .clone()
            .unwrap_or_else(|| grade_for_score(self.score).to_string())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertResultsDto {
    #[validate(length(min = 1, max = 500), nested)]
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpsertResultsResponse {
    pub upserted: Vec<SubjectResult>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateResultDto {
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: Option<f64>,
    #[validate(custom(function = "validate_grade"))]
    pub grade: Option<String>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResultFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub subject_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

paginated!(PaginatedResultsResponse, SubjectResult);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade_for_score(100.0), "A");
        assert_eq!(grade_for_score(70.0), "A");
        assert_eq!(grade_for_score(69.9), "B");
        assert_eq!(grade_for_score(60.0), "B");
        assert_eq!(grade_for_score(50.0), "C");
        assert_eq!(grade_for_score(45.0), "D");
        assert_eq!(grade_for_score(44.5), "E");
        assert_eq!(grade_for_score(40.0), "E");
        assert_eq!(grade_for_score(39.99), "F");
        assert_eq!(grade_for_score(0.0), "F");
    }

    fn entry(score: f64, grade: Option<&str>) -> ResultEntry {
        ResultEntry {
            student_id: StudentId::new(),
            subject_id: SubjectId::new(),
            score,
            grade: grade.map(str::to_string),
            remarks: None,
        }
    }

    #[test]
    fn test_supplied_grade_wins() {
        assert_eq!(entry(82.0, None).effective_grade(), "A");
        assert_eq!(entry(82.0, Some("B")).effective_grade(), "B");
    }

    #[test]
    fn test_entry_validation() {
        assert!(entry(100.0, None).validate().is_ok());
        assert!(entry(100.5, None).validate().is_err());
        assert!(entry(-1.0, None).validate().is_err());
        assert!(entry(50.0, Some("Z")).validate().is_err());
    }

    #[test]
    fn test_batch_validates_each_entry() {
        let batch = UpsertResultsDto {
            results: vec![entry(55.0, None), entry(150.0, None)],
        };
        assert!(batch.validate().is_err());

        let empty = UpsertResultsDto { results: vec![] };
        assert!(empty.validate().is_err());
    }
}
