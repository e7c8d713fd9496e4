use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use registrar_core::AppError;
use registrar_models::ids::{LessonId, StudentId};

use crate::middleware::auth::AuthUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::attendance::model::{
    Attendance, AttendanceFilterParams, AttendanceSummary, AttendanceSummaryParams,
    PaginatedAttendanceResponse, RecordAttendanceDto,
};
use crate::modules::attendance::service::AttendanceService;
use crate::state::AppState;
use crate::utils::scope::{Scope, ensure_can_read_student};
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/lessons/{id}/attendance",
    params(("id" = LessonId, Path, description = "Lesson ID")),
    request_body = RecordAttendanceDto,
    responses(
        (status = 200, description = "Register saved", body = Vec<Attendance>),
        (status = 400, description = "Wrong weekday, outside the semester or student not enrolled", body = ErrorResponse),
        (status = 403, description = "Not the offering's teacher", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn record_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<LessonId>,
    ValidatedJson(dto): ValidatedJson<RecordAttendanceDto>,
) -> Result<Json<Vec<Attendance>>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let saved = AttendanceService::record_attendance(&state.db, scope, id, dto).await?;
    Ok(Json(saved))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilterParams),
    responses(
        (status = 200, description = "Attendance visible to the caller", body = PaginatedAttendanceResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<AttendanceFilterParams>,
) -> Result<Json<PaginatedAttendanceResponse>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let attendance = AttendanceService::list_attendance(&state.db, scope, filters).await?;
    Ok(Json(attendance))
}

/// Students default to themselves; everyone else names the student.
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(AttendanceSummaryParams),
    responses(
        (status = 200, description = "Attendance totals", body = AttendanceSummary),
        (status = 400, description = "student_id missing", body = ErrorResponse),
        (status = 403, description = "Not your record", body = ErrorResponse)
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn attendance_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<AttendanceSummaryParams>,
) -> Result<Json<AttendanceSummary>, AppError> {
    let scope = Scope::resolve(&state.db, &auth_user).await?;
    let student_id = match (params.student_id, scope) {
        (Some(id), _) => StudentId::from(id),
        (None, Scope::Student(own)) => own,
        (None, _) => {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "student_id is required"
            )));
        }
    };
    ensure_can_read_student(&state.db, scope, student_id).await?;

    let summary = AttendanceService::summary(&state.db, student_id).await?;
    Ok(Json(summary))
}
