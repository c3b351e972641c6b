use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;
use uuid::Uuid;

use slate_core::{AppError, ErrorResponse};
use slate_models::{ChangeRoleDto, Principal, PrincipalId};

use crate::middleware::auth::AuthUser;
use crate::modules::principals::service::PrincipalService;
use crate::state::AppState;
use crate::validator::JsonBody;

#[utoipa::path(
    patch,
    path = "/api/principals/{id}/role",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    request_body = ChangeRoleDto,
    responses(
        (status = 200, description = "Role changed", body = Principal),
        (status = 400, description = "Unknown role", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden or above the actor's role ceiling", body = ErrorResponse),
        (status = 404, description = "Principal not found", body = ErrorResponse),
        (status = 503, description = "Role changed concurrently, retry", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Principals"
)]
#[instrument(skip(state))]
pub async fn change_role(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<PrincipalId>,
    JsonBody(dto): JsonBody<ChangeRoleDto>,
) -> Result<Json<Principal>, AppError> {
    let principal = PrincipalService::change_role(&state, auth_user.principal(), id, dto.role).await?;
    Ok(Json(principal))
}
