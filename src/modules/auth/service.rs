use sqlx::PgPool;
use tracing::{instrument, warn};

use registrar_auth::create_access_token;
use registrar_config::JwtConfig;
use registrar_core::{AppError, verify_password};
use registrar_models::ids::UserId;

use crate::modules::auth::model::{ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse};
use crate::utils::identity::IdentityProvider;
use crate::utils::scope::find_profile_id;

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, jwt_config, dto), fields(email = %dto.email))]
    pub async fn login(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let invalid = || AppError::unauthorized("Invalid email or password".to_string());

        let Some(account) = IdentityProvider::find_account_by_email(db, &dto.email).await? else {
            warn!("Login attempt for unknown email");
            crate::metrics::track_login(false);
            return Err(invalid());
        };

        if !verify_password(&dto.password, &account.password)? {
            warn!(user_id = %account.id, "Login attempt with wrong password");
            crate::metrics::track_login(false);
            return Err(invalid());
        }

        let access_token = create_access_token(
            account.id.into_inner(),
            &account.email,
            account.role,
            jwt_config,
        )?;
        crate::metrics::track_login(true);

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user: account.into(),
        })
    }

    #[instrument(skip(db))]
    pub async fn me(db: &PgPool, user_id: UserId) -> Result<MeResponse, AppError> {
        let account = IdentityProvider::find_account_by_id(db, user_id).await?;
        let profile_id = find_profile_id(db, account.role, user_id).await?;

        Ok(MeResponse {
            user: account.into(),
            profile_id,
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn change_password(
        db: &PgPool,
        user_id: UserId,
        dto: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let account = IdentityProvider::find_account_by_id(db, user_id).await?;

        if !verify_password(&dto.current_password, &account.password)? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }
        if dto.current_password == dto.new_password {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "New password must differ from the current password"
            )));
        }

        IdentityProvider::set_password(db, user_id, &dto.new_password).await
    }
}
