//! Feature modules. Each holds `model`, `service`, `controller` and `router`.

pub mod admissions;
pub mod assignments;
pub mod attendance;
pub mod auth;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod lessons;
pub mod parents;
pub mod payments;
pub mod results;
pub mod semesters;
pub mod students;
pub mod subject_offerings;
pub mod subjects;
pub mod teachers;
