use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{get, post},
};

use crate::middleware::rate_limit::public_rate_limit;
use crate::modules::payments::controller::{list_admission_payments, submit_payment};
use crate::state::AppState;

use super::controller::{
    get_admission, list_admissions, reject_admission, resend_verification, submit_admission,
    verify_parent,
};

/// Public handlers carry the rate limit individually.
pub fn init_admissions_router(state: AppState) -> Router<AppState> {
    let limit = middleware::from_fn_with_state(state, public_rate_limit);

    Router::new()
        .route(
            "/",
            get(list_admissions).post(submit_admission.layer(limit.clone())),
        )
        .route(
            "/verify-parent",
            get(verify_parent.layer(limit.clone())).post(verify_parent.layer(limit.clone())),
        )
        .route("/{id}", get(get_admission))
        .route("/{id}/reject", post(reject_admission))
        .route("/{id}/resend-verification", post(resend_verification))
        .route(
            "/{id}/payments",
            get(list_admission_payments).post(submit_payment.layer(limit)),
        )
}
