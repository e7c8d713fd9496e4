//! Admin accounts. The API has no endpoint that creates admins.

use registrar_core::hash_password;
use registrar_models::Role;
use registrar_models::ids::UserId;
use sqlx::PgPool;

/// Creates an admin account, failing when the email is taken.
pub async fn create_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<UserId, Box<dyn std::error::Error>> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(format!("Invalid email address: {}", email).into());
    }

    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (first_name, last_name, email, password, role)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name.trim())
    .bind(last_name.trim())
    .bind(&email)
    .bind(&hashed_password)
    .bind(Role::Admin)
    .fetch_optional(db)
    .await?;

    user_id.ok_or_else(|| "User with this email already exists".into())
}
