use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_teacher, delete_teacher, get_my_teacher_profile, get_teacher, list_teachers,
    update_teacher,
};

pub fn init_teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers).post(create_teacher))
        .route("/me", get(get_my_teacher_profile))
        .route(
            "/{id}",
            get(get_teacher).put(update_teacher).delete(delete_teacher),
        )
}
