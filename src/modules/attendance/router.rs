use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{attendance_summary, list_attendance};

/// Registers are recorded under `/api/lessons/{id}/attendance`.
pub fn init_attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attendance))
        .route("/summary", get(attendance_summary))
}
