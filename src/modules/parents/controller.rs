use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::ParentId;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::parents::model::{
    CreateParentDto, PaginatedParentsResponse, Parent, ParentWithChildren, PersonFilterParams,
    UpdateParentDto,
};
use crate::modules::parents::service::ParentService;
use crate::state::AppState;
use crate::utils::scope::Scope;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/parents",
    request_body = CreateParentDto,
    responses(
        (status = 201, description = "Parent and account created", body = Parent),
        (status = 403, description = "Admin only", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_parent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<CreateParentDto>,
) -> Result<(StatusCode, Json<Parent>), AppError> {
    let parent = ParentService::create_parent(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(parent)))
}

#[utoipa::path(
    get,
    path = "/api/parents",
    params(PersonFilterParams),
    responses(
        (status = 200, description = "Parents", body = PaginatedParentsResponse),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_parents(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filters): Query<PersonFilterParams>,
) -> Result<Json<PaginatedParentsResponse>, AppError> {
    let parents = ParentService::list_parents(&state.db, filters).await?;
    Ok(Json(parents))
}

#[utoipa::path(
    get,
    path = "/api/parents/me",
    responses(
        (status = 200, description = "The caller's parent profile with children", body = ParentWithChildren),
        (status = 403, description = "No parent profile", body = ErrorResponse)
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_my_parent_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ParentWithChildren>, AppError> {
    match Scope::resolve(&state.db, &auth_user).await? {
        Scope::Parent(id) => Ok(Json(ParentService::get_parent(&state.db, id).await?)),
        _ => Err(AppError::forbidden(
            "Only parents have a parent profile".to_string(),
        )),
    }
}

#[utoipa::path(
    get,
    path = "/api/parents/{id}",
    params(("id" = ParentId, Path, description = "Parent ID")),
    responses(
        (status = 200, description = "Parent with children", body = ParentWithChildren),
        (status = 403, description = "Not your record", body = ErrorResponse),
        (status = 404, description = "Parent not found", body = ErrorResponse)
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_parent(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<ParentId>,
) -> Result<Json<ParentWithChildren>, AppError> {
    match Scope::resolve(&state.db, &auth_user).await? {
        Scope::Admin => {}
        Scope::Parent(own) if own == id => {}
        _ => {
            return Err(AppError::forbidden(
                "You can only view your own parent record".to_string(),
            ));
        }
    }
    let parent = ParentService::get_parent(&state.db, id).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    put,
    path = "/api/parents/{id}",
    params(("id" = ParentId, Path, description = "Parent ID")),
    request_body = UpdateParentDto,
    responses(
        (status = 200, description = "Parent updated", body = Parent),
        (status = 404, description = "Parent not found", body = ErrorResponse)
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_parent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ParentId>,
    ValidatedJson(dto): ValidatedJson<UpdateParentDto>,
) -> Result<Json<Parent>, AppError> {
    let parent = ParentService::update_parent(&state.db, id, dto).await?;
    Ok(Json(parent))
}

#[utoipa::path(
    delete,
    path = "/api/parents/{id}",
    params(("id" = ParentId, Path, description = "Parent ID")),
    responses(
        (status = 204, description = "Parent and account deleted"),
        (status = 404, description = "Parent not found", body = ErrorResponse)
    ),
    tag = "Parents",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_parent(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ParentId>,
) -> Result<StatusCode, AppError> {
    ParentService::delete_parent(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
