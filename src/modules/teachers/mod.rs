//! Teacher profiles. Each profile owns a `teacher` account.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_teachers_router;
