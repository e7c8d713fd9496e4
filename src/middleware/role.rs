//! Role checks.
//!
//! Whole route groups are guarded with the [`require_admin`] layer; handlers
//! use the [`RequireAdmin`] and [`RequireStaff`] extractors.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use registrar_auth::Role;
use registrar_core::AppError;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Fails with 403 unless the caller holds one of `allowed`.
pub fn ensure_role(auth_user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&auth_user.role()) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Access denied. Required role: {}",
            allowed
                .iter()
                .map(Role::as_str)
                .collect::<Vec<_>>()
                .join(" or ")
        )))
    }
}

pub async fn require_roles(
    state: &AppState,
    req: Request,
    next: Next,
    allowed: &[Role],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let auth_user = AuthUser::from_request_parts(&mut parts, state).await?;
    ensure_role(&auth_user, allowed)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    require_roles(&state, req, next, &[Role::Admin])
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        ensure_role(&auth_user, &[Role::Admin])?;
        Ok(RequireAdmin(auth_user))
    }
}

/// Admin or teacher.
#[derive(Debug, Clone)]
pub struct RequireStaff(pub AuthUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        ensure_role(&auth_user, &[Role::Admin, Role::Teacher])?;
        Ok(RequireStaff(auth_user))
    }
}
