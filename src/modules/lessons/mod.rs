//! Weekly lessons, the timetable conflict check and dated schedules.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_lessons_router;
