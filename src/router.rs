use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::role::require_admin;
use crate::modules::admissions::init_admissions_router;
use crate::modules::assignments::init_assignments_router;
use crate::modules::attendance::init_attendance_router;
use crate::modules::auth::init_auth_router;
use crate::modules::courses::init_courses_router;
use crate::modules::dashboard::init_dashboard_router;
use crate::modules::enrollments::init_enrollments_router;
use crate::modules::lessons::init_lessons_router;
use crate::modules::parents::init_parents_router;
use crate::modules::payments::init_payments_router;
use crate::modules::results::init_results_router;
use crate::modules::semesters::init_semesters_router;
use crate::modules::students::init_students_router;
use crate::modules::subject_offerings::init_subject_offerings_router;
use crate::modules::subjects::init_subjects_router;
use crate::modules::teachers::init_teachers_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

pub fn init_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router(state.clone()))
                .nest("/courses", init_courses_router())
                .nest("/semesters", init_semesters_router())
                .nest("/subjects", init_subjects_router())
                .nest("/teachers", init_teachers_router())
                .nest("/students", init_students_router())
                .nest("/parents", init_parents_router())
                .nest("/subject-offerings", init_subject_offerings_router())
                .nest("/lessons", init_lessons_router())
                .nest("/enrollments", init_enrollments_router())
                .nest("/attendance", init_attendance_router())
                .nest("/assignments", init_assignments_router())
                .nest("/results", init_results_router())
                .nest("/admissions", init_admissions_router(state.clone()))
                .nest("/payments", init_payments_router())
                .nest(
                    "/dashboard",
                    init_dashboard_router()
                        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin)),
                ),
        )
        .with_state(state.clone())
        .layer(cors_layer(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
