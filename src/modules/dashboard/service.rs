use sqlx::PgPool;
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::admissions::{AdmissionStatus, AdmissionStatusCount};
use registrar_models::dashboard::DashboardSummary;

const ALL_STATUSES: [AdmissionStatus; 5] = [
    AdmissionStatus::Pending,
    AdmissionStatus::ParentVerified,
    AdmissionStatus::PaymentVerified,
    AdmissionStatus::Completed,
    AdmissionStatus::Rejected,
];

/// Fills in zero counts so every status is always reported, in workflow
/// order.
pub fn complete_status_counts(found: &[AdmissionStatusCount]) -> Vec<AdmissionStatusCount> {
    ALL_STATUSES
        .iter()
        .map(|status| AdmissionStatusCount {
            status: *status,
            count: found
                .iter()
                .find(|c| c.status == *status)
                .map_or(0, |c| c.count),
        })
        .collect()
}

pub struct DashboardService;

impl DashboardService {
    #[instrument(skip(db))]
    pub async fn summary(db: &PgPool) -> Result<DashboardSummary, AppError> {
        let (students, teachers, parents, courses) = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM students),
                (SELECT COUNT(*) FROM teachers),
                (SELECT COUNT(*) FROM parents),
                (SELECT COUNT(*) FROM courses)",
        )
        .fetch_one(db)
        .await?;

        let counts = sqlx::query_as::<_, AdmissionStatusCount>(
            "SELECT status, COUNT(*) AS count FROM admission_forms GROUP BY status",
        )
        .fetch_all(db)
        .await?;

        Ok(DashboardSummary {
            students,
            teachers,
            parents,
            courses,
            admissions: complete_status_counts(&counts),
        })
    }
}
