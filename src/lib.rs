//! # Registrar API
//!
//! A REST API for running a college: courses and semesters, teachers,
//! students and parents, weekly lessons with conflict checks, enrollments,
//! attendance, assignments, results, and a public admission workflow that
//! provisions accounts once the parent and the payment are verified.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # Bearer auth, role guards, public rate limit
//! ├── modules/          # Feature modules
//! │   ├── auth/         # Login, current account, password change
//! │   ├── courses/      # Courses (+ nested semesters)
//! │   ├── semesters/
//! │   ├── subjects/
//! │   ├── teachers/ students/ parents/
//! │   ├── subject_offerings/
//! │   ├── lessons/      # Weekly slots, conflict check, schedule
//! │   ├── enrollments/ attendance/ assignments/ results/
//! │   ├── admissions/   # Intake and verification state machine
//! │   ├── payments/     # Fee payments and review
//! │   └── dashboard/
//! └── utils/            # Email, identity provider, role scope
//! ```
//!
//! Each feature module has `model.rs` (re-exports from `registrar-models`),
//! `service.rs` (queries and rules), `controller.rs` (handlers with OpenAPI
//! annotations) and `router.rs`.
//!
//! ## Roles
//!
//! | Role | Access |
//! |------|--------|
//! | Admin | Everything; created with `registrar-cli create-admin` |
//! | Teacher | Own offerings: attendance, assignments, results |
//! | Student | Own records and enrolled lessons |
//! | Parent | Records of linked children |
//!
//! ## API Documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;

// Re-export workspace crates for convenience
pub use registrar_auth;
pub use registrar_config;
pub use registrar_core;
pub use registrar_db;
pub use registrar_models;
