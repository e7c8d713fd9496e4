//! Admin dashboard counters.

use crate::admissions::AdmissionStatusCount;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub students: i64,
    pub teachers: i64,
    pub parents: i64,
    pub courses: i64,
    /// Admissions per status; statuses with no admissions are reported as 0
    pub admissions: Vec<AdmissionStatusCount>,
}
