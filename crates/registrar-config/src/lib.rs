//! # Registrar Config
//!
//! Configuration structures loaded from environment variables.
//!
//! - [`jwt`]: JWT authentication configuration
//! - [`cors`]: CORS configuration
//! - [`email`]: SMTP configuration
//! - [`rate_limit`]: Rate limiting for public endpoints
//! - [`admission`]: Admission fee and verification token lifetime
//!
//! # Example
//!
//! ```ignore
//! use registrar_config::{JwtConfig, EmailConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let email_config = EmailConfig::from_env();
//! ```

pub mod admission;
pub mod cors;
pub mod email;
pub mod jwt;
pub mod rate_limit;

pub use admission::AdmissionConfig;
pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;

/// Reads an environment variable and parses it, falling back to `default`.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
