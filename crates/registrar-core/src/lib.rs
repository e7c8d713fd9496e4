//! # Registrar Core
//!
//! Core types, errors, and utilities shared by every Registrar crate.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Pagination parameters and response metadata
//! - [`password`]: bcrypt password hashing and verification
//! - [`serde`]: Lenient query-string deserializers
//!
//! # Example
//!
//! ```ignore
//! use registrar_core::{AppError, PaginationParams};
//!
//! let error = AppError::not_found(anyhow::anyhow!("Course not found"));
//! let params = PaginationParams::default();
//! assert_eq!(params.limit(), 10);
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
