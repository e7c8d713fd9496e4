//! Student profiles. Each profile owns a `student` account and may be linked
//! to a parent and a course.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_students_router;
