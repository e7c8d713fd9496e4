use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_offering, delete_offering, get_offering, list_offerings, update_offering,
};

pub fn init_subject_offerings_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_offerings).post(create_offering))
        .route(
            "/{id}",
            get(get_offering)
                .put(update_offering)
                .delete(delete_offering),
        )
}
