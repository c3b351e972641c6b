use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use slate_core::{AppError, ErrorResponse};
use slate_models::{StudentId, StudentProfile};

use crate::middleware::auth::AuthUser;
use crate::modules::students::service::StudentService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(
        ("id" = Uuid, Path, description = "Student profile ID")
    ),
    responses(
        (status = 200, description = "Student profile", body = StudentProfile),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - role not permitted or not the owner", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_student(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<StudentId>,
) -> Result<Json<StudentProfile>, AppError> {
    let student = StudentService::get_student(&state, auth_user.principal(), id).await?;
    Ok(Json(student))
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(
        ("id" = Uuid, Path, description = "Student profile ID")
    ),
    responses(
        (status = 204, description = "Student soft-deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 404, description = "Student not found or already deleted", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn delete_student(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<StudentId>,
) -> Result<StatusCode, AppError> {
    StudentService::soft_delete_student(&state, auth_user.principal(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
