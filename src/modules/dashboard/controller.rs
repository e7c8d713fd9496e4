use axum::{Json, extract::State};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::dashboard::DashboardSummary;

use crate::modules::auth::controller::ErrorResponse;
use crate::modules::dashboard::service::DashboardService;
use crate::state::AppState;

/// Admin only; guarded by the router.
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    responses(
        (status = 200, description = "Headcounts and admissions per status", body = DashboardSummary),
        (status = 403, description = "Admin only", body = ErrorResponse)
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<DashboardSummary>, AppError> {
    let summary = DashboardService::summary(&state.db).await?;
    Ok(Json(summary))
}
