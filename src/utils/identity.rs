//! Local identity provider.
//!
//! Accounts live in the `users` table with a bcrypt hash and a single role.
//! Every operation takes an executor so profile writes and account writes can
//! share one transaction.

use sqlx::{PgConnection, PgExecutor};
use tracing::instrument;

use registrar_auth::generate_password;
use registrar_core::{AppError, hash_password};
use registrar_models::ids::UserId;
use registrar_models::users::{NewAccount, ProvisionedAccount, User, UserCredentials};

pub struct IdentityProvider;

/// Canonical form used for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl IdentityProvider {
    /// Creates an account. Without a supplied password a temporary one is
    /// generated and returned so it can be emailed.
    #[instrument(skip(conn, account), fields(email = %account.email, role = %account.role))]
    pub async fn create_account(
        conn: &mut PgConnection,
        account: NewAccount,
    ) -> Result<ProvisionedAccount, AppError> {
        let (password, generated) = match account.password {
            Some(password) => (password, false),
            None => (generate_password(), true),
        };
        let hashed = hash_password(&password)?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (first_name, last_name, email, password, role)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, first_name, last_name, email, role, created_at, updated_at"#,
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(normalize_email(&account.email))
        .bind(&hashed)
        .bind(account.role)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_db(e, "An account with this email already exists"))?;

        crate::metrics::track_account_provisioned(account.role.as_str());

        Ok(ProvisionedAccount {
            user,
            password,
            generated,
        })
    }

    #[instrument(skip(executor))]
    pub async fn find_account_by_email<'e, E>(
        executor: E,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let account = sqlx::query_as::<_, UserCredentials>(
            r#"SELECT id, first_name, last_name, email, password, role, created_at, updated_at
               FROM users WHERE email = $1"#,
        )
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    #[instrument(skip(executor))]
    pub async fn find_account_by_id<'e, E>(
        executor: E,
        id: UserId,
    ) -> Result<UserCredentials, AppError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserCredentials>(
            r#"SELECT id, first_name, last_name, email, password, role, created_at, updated_at
               FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Account not found")))
    }

    /// Removes an account. A missing account is not an error; profiles whose
    /// account was already removed can still be deleted.
    #[instrument(skip(executor))]
    pub async fn delete_account<'e, E>(executor: E, id: UserId) -> Result<(), AppError>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    #[instrument(skip(executor, new_password))]
    pub async fn set_password<'e, E>(
        executor: E,
        id: UserId,
        new_password: &str,
    ) -> Result<(), AppError>
    where
        E: PgExecutor<'e>,
    {
        let hashed = hash_password(new_password)?;
        let result = sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(&hashed)
            .bind(id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Account not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@College.EDU "), "ada@college.edu");
    }
}
