//! Public admission intake and the verification workflow.
//!
//! A form is completed once the parent has confirmed the emailed link and an
//! admin has approved the fee payment. Completion provisions the parent and
//! student profiles with their accounts in the same transaction.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;

pub use router::init_admissions_router;
