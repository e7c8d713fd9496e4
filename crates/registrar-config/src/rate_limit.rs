//! Rate limiting configuration for unauthenticated endpoints.
//!
//! Login and the public admission endpoints are rate limited per client IP
//! using a token bucket:
//!
//! - `RATE_LIMIT_PUBLIC_PER_SECOND`: tokens replenished per second (default: 1)
//! - `RATE_LIMIT_PUBLIC_BURST_SIZE`: bucket size (default: 10)
//! - `RATE_LIMIT_ENABLED`: set to `false` to disable (default: true)
//! - `RATE_LIMIT_TRUST_PROXY`: key on `X-Forwarded-For` / `X-Real-IP` instead
//!   of the peer address; only enable behind a proxy that overwrites them
//!   (default: false)

use governor::Quota;
use std::num::NonZeroU32;

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub public_per_second: u32,
    pub public_burst_size: u32,
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            public_per_second: 1,
            public_burst_size: 10,
            trust_forwarded_headers: false,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            public_per_second: env_or("RATE_LIMIT_PUBLIC_PER_SECOND", defaults.public_per_second),
            public_burst_size: env_or("RATE_LIMIT_PUBLIC_BURST_SIZE", defaults.public_burst_size),
            trust_forwarded_headers: std::env::var("RATE_LIMIT_TRUST_PROXY")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(defaults.trust_forwarded_headers),
        }
    }

    /// A configuration that never limits, for tests.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Builds the governor quota; zero values are raised to one.
    #[must_use]
    pub fn public_quota(&self) -> Quota {
        let per_second = NonZeroU32::new(self.public_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.public_burst_size).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(per_second).allow_burst(burst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.public_per_second, 1);
        assert_eq!(config.public_burst_size, 10);
        assert!(!config.trust_forwarded_headers);
    }

    #[test]
    fn test_disabled_config() {
        assert!(!RateLimitConfig::disabled().enabled);
    }

    #[test]
    fn test_quota_burst() {
        let config = RateLimitConfig {
            enabled: true,
            public_per_second: 2,
            public_burst_size: 5,
            trust_forwarded_headers: false,
        };
        assert_eq!(config.public_quota().burst_size().get(), 5);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = RateLimitConfig {
            enabled: true,
            public_per_second: 0,
            public_burst_size: 0,
            trust_forwarded_headers: false,
        };
        assert_eq!(config.public_quota().burst_size().get(), 1);
    }
}
