use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use slate_core::{AppError, ErrorResponse};
use slate_models::{Course, CourseId, CreateCourseDto};

use crate::middleware::auth::AuthUser;
use crate::modules::courses::service::CourseService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 409, description = "Course code already in use", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Courses"
)]
#[instrument(skip(state, dto))]
pub async fn create_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = CourseService::create_course(&state, auth_user.principal(), dto).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    patch,
    path = "/api/courses/{course_id}/deactivate",
    params(
        ("course_id" = Uuid, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course deactivated", body = Course),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 422, description = "Course already inactive", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Courses"
)]
#[instrument(skip(state))]
pub async fn deactivate_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(course_id): Path<CourseId>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::deactivate_course(&state, auth_user.principal(), course_id).await?;
    Ok(Json(course))
}
