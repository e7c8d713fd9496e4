//! # Registrar Auth
//!
//! Identity primitives for the Registrar API.
//!
//! - [`claims`]: the [`Role`] enum and access token [`Claims`]
//! - [`jwt`]: access token creation and verification
//! - [`secrets`]: verification tokens and generated passwords
//!
//! # Example
//!
//! ```ignore
//! use registrar_auth::{Role, create_access_token, verify_token};
//! use registrar_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "ada@college.edu", Role::Teacher, &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.role, Role::Teacher);
//! ```

pub mod claims;
pub mod jwt;
pub mod secrets;

pub use claims::{Claims, Role};
pub use jwt::{create_access_token, verify_token};
pub use secrets::{generate_password, generate_token, hash_token};
