//! Identity accounts.
//!
//! A `users` row is the login identity; the teacher, student and parent
//! tables hold the profile and point back at it through `user_id`.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub use registrar_auth::Role;

/// An identity account. The password hash never leaves the database layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account row including the bcrypt hash, used only for credential checks.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserCredentials> for User {
    fn from(row: UserCredentials) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for provisioning an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    /// When `None` a temporary password is generated.
    pub password: Option<String>,
}

/// A freshly created account together with the plaintext password that was
/// set, so it can be emailed once.
#[derive(Debug, Clone)]
pub struct ProvisionedAccount {
    pub user: User,
    pub password: String,
    pub generated: bool,
}
