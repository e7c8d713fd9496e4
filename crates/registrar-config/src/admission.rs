//! Admission intake settings.
//!
//! - `ADMISSION_FEE_MINOR`: expected application fee in minor currency units
//!   (default: 5000). Payments below this amount are refused.
//! - `ADMISSION_TOKEN_TTL_HOURS`: lifetime of parent verification links
//!   (default: 48).

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdmissionConfig {
    pub fee_minor: i64,
    pub token_ttl_hours: i64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            fee_minor: 5000,
            token_ttl_hours: 48,
        }
    }
}

impl AdmissionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fee_minor: env_or("ADMISSION_FEE_MINOR", defaults.fee_minor),
            token_ttl_hours: env_or("ADMISSION_TOKEN_TTL_HOURS", defaults.token_ttl_hours)
                .max(1),
        }
    }
}
