//! # Registrar Models
//!
//! Database rows, request/response DTOs and the pure domain rules of the
//! Registrar API.
//!
//! - [`scheduling`]: lesson slot overlap, conflict detection and weekly expansion
//! - [`admissions`]: the admission verification state machine
//! - [`results`]: score to letter grade mapping
//!
//! The remaining modules hold one entity each with its DTOs and filters.

/// Declares a `{ data, meta }` page of rows for a list endpoint.
macro_rules! paginated {
    ($name:ident, $item:ty) => {
        #[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
        pub struct $name {
            pub data: Vec<$item>,
            pub meta: registrar_core::PaginationMeta,
        }
    };
}

pub mod admissions;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod ids;
pub mod lessons;
pub mod parents;
pub mod payments;
pub mod results;
pub mod scheduling;
pub mod semesters;
pub mod students;
pub mod subject_offerings;
pub mod teachers;
pub mod users;

pub use admissions::{AdmissionEvent, AdmissionStatus, TransitionError};
pub use lessons::Weekday;
pub use users::{Role, User};
