use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_assignment, delete_assignment, get_assignment, list_assignments, update_assignment,
};

pub fn init_assignments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route(
            "/{id}",
            get(get_assignment)
                .put(update_assignment)
                .delete(delete_assignment),
        )
}
