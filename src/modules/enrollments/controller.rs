use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use slate_core::{AppError, ErrorResponse};
use slate_models::{BulkEnrollDto, BulkEnrollOutcome, CourseId, CourseStats, EnrollStudentDto, Enrollment};

use crate::middleware::auth::AuthUser;
use crate::modules::enrollments::service::EnrollmentService;
use crate::state::AppState;
use crate::validator::{JsonBody, ValidatedJson};

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = EnrollStudentDto,
    responses(
        (status = 201, description = "Student enrolled", body = Enrollment),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Role not permitted to enroll students", body = ErrorResponse),
        (status = 404, description = "Student or course not found", body = ErrorResponse),
        (status = 409, description = "Student already enrolled", body = ErrorResponse),
        (status = 422, description = "Student inactive, course inactive or course full", body = ErrorResponse),
        (status = 503, description = "Store busy, retry later", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state))]
pub async fn enroll_student(
    State(state): State<AppState>,
    auth_user: AuthUser,
    JsonBody(dto): JsonBody<EnrollStudentDto>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = EnrollmentService::enroll_with_retry(
        &state,
        auth_user.principal(),
        dto.student_id,
        dto.course_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    post,
    path = "/api/courses/{course_id}/enrollments/bulk",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    request_body = BulkEnrollDto,
    responses(
        (status = 200, description = "Per-student results", body = BulkEnrollOutcome),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Role not permitted to enroll students", body = ErrorResponse),
        (status = 422, description = "Empty or oversized student list", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state, dto))]
pub async fn bulk_enroll(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<BulkEnrollDto>,
) -> Result<Json<BulkEnrollOutcome>, AppError> {
    let outcome =
        EnrollmentService::bulk_enroll(&state, auth_user.principal(), course_id, &dto.student_ids)
            .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/courses/{course_id}/stats",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Seat statistics", body = CourseStats),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Enrollments"
)]
#[instrument(skip(state))]
pub async fn course_stats(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<CourseId>,
) -> Result<Json<CourseStats>, AppError> {
    let stats = EnrollmentService::enrollment_stats(&state, auth_user.principal(), course_id).await?;
    Ok(Json(stats))
}
