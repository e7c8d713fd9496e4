use axum::{Router, routing::get};

use crate::state::AppState;

use super::controller::{
    create_course, create_course_semester, delete_course, get_course, list_course_semesters,
    list_courses, update_course,
};

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route(
            "/{id}/semesters",
            get(list_course_semesters).post(create_course_semester),
        )
}
