use std::sync::Arc;

use governor::DefaultKeyedRateLimiter;
use sqlx::PgPool;

use registrar_config::{AdmissionConfig, CorsConfig, EmailConfig, JwtConfig, RateLimitConfig};

use crate::utils::email::EmailService;

/// Per-IP limiter shared by login and the public admission endpoints.
pub type PublicRateLimiter = DefaultKeyedRateLimiter<String>;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub admission_config: AdmissionConfig,
    pub email: Arc<EmailService>,
    pub public_limiter: Arc<PublicRateLimiter>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        jwt_config: JwtConfig,
        email_config: EmailConfig,
        cors_config: CorsConfig,
        rate_limit_config: RateLimitConfig,
        admission_config: AdmissionConfig,
    ) -> Self {
        let public_limiter = Arc::new(PublicRateLimiter::keyed(rate_limit_config.public_quota()));
        Self {
            db,
            email: Arc::new(EmailService::new(email_config.clone())),
            jwt_config,
            email_config,
            cors_config,
            rate_limit_config,
            admission_config,
            public_limiter,
        }
    }

    /// Builds the state from environment variables around an existing pool.
    pub fn from_env(db: PgPool) -> Self {
        Self::new(
            db,
            JwtConfig::from_env(),
            EmailConfig::from_env(),
            CorsConfig::from_env(),
            RateLimitConfig::from_env(),
            AdmissionConfig::from_env(),
        )
    }
}

pub async fn init_app_state() -> AppState {
    AppState::from_env(registrar_db::init_db_pool().await)
}
