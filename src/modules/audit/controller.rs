use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use slate_core::{AppError, ErrorResponse};
use slate_models::{AuditQuery, AuditRecord};

use crate::middleware::auth::AuthUser;
use crate::modules::audit::service::AuditService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/audit",
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit records, newest first", body = Vec<AuditRecord>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Audit"
)]
#[instrument(skip(state))]
pub async fn list_audit(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditRecord>>, AppError> {
    let records = AuditService::list_audit(&state, auth_user.principal(), query).await?;
    Ok(Json(records))
}
