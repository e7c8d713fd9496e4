use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::rate_limit::public_rate_limit;
use crate::state::AppState;

use super::controller::{change_password, login, me};

pub fn init_auth_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(state, public_rate_limit));

    Router::new()
        .merge(public)
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}
