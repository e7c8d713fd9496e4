//! Access token creation and verification.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET`. The role claim is the only
//! authorization input; profile ownership is resolved against the database.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use registrar_config::JwtConfig;
use registrar_core::AppError;

use crate::claims::{Claims, Role};

/// Creates an access token for an account.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = (now + jwt_config.access_token_expiry).max(0) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role,
        exp,
        iat: now as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

/// Verifies an access token and returns the embedded claims.
///
/// # Errors
///
/// Returns an unauthorized error if the signature is invalid, the token has
/// expired, or it is malformed.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test_secret_key_for_testing_purposes".to_string(),
            access_token_expiry: 3600,
        }
    }

    #[test]
    fn test_create_and_verify() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "a@b.com", Role::Student, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.role, Role::Student);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_wrong_secret() {
        let token = create_access_token(Uuid::new_v4(), "a@b.com", Role::Admin, &config()).unwrap();
        let other = JwtConfig {
            secret: "different".to_string(),
            access_token_expiry: 3600,
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn test_verify_garbage() {
        assert!(verify_token("invalid.token.here", &config()).is_err());
        assert!(verify_token("", &config()).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = JwtConfig {
            secret: config().secret,
            access_token_expiry: -3600,
        };
        let token = create_access_token(Uuid::new_v4(), "a@b.com", Role::Admin, &expired).unwrap();
        assert!(verify_token(&token, &config()).is_err());
    }
}
