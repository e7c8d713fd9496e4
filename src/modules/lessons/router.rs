use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::attendance::controller::record_attendance;
use crate::state::AppState;

use super::controller::{
    create_lesson, delete_lesson, get_lesson, get_schedule, list_lessons, update_lesson,
};

pub fn init_lessons_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_lessons).post(create_lesson))
        .route("/schedule", get(get_schedule))
        .route(
            "/{id}",
            get(get_lesson).put(update_lesson).delete(delete_lesson),
        )
        .route("/{id}/attendance", post(record_attendance))
}
