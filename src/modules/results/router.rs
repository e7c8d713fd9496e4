use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{delete_result, get_result, list_results, update_result, upsert_results};

pub fn init_results_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_results).post(upsert_results))
        .route(
            "/{id}",
            get(get_result).put(update_result).delete(delete_result),
        )
}
