use axum::{Router, routing::post};

use crate::state::AppState;

use super::controller::{approve_payment, reject_payment};

pub fn init_payments_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/approve", post(approve_payment))
        .route("/{id}/reject", post(reject_payment))
}
