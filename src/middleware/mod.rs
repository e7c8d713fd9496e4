//! Request guards.
//!
//! - [`auth`]: the [`auth::AuthUser`] bearer token extractor
//! - [`role`]: role layers and extractors
//! - [`rate_limit`]: per-IP limiting for public endpoints

pub mod auth;
pub mod rate_limit;
pub mod role;
