use axum::{
    Router,
    routing::{delete, get},
};

use crate::state::AppState;

use super::controller::{enroll_student, list_enrollments, remove_enrollment};

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_enrollments).post(enroll_student))
        .route("/{id}", delete(remove_enrollment))
}
