use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{delete_semester, get_semester, list_semesters, update_semester};

pub fn init_semesters_router() -> Router<AppState> {
    Router::new().route("/", get(list_semesters)).route(
        "/{id}",
        get(get_semester)
            .put(update_semester)
            .delete(delete_semester),
    )
}
