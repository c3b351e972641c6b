use tracing::{instrument, warn};

use slate_core::AppError;
use slate_db::AuditSink;
use slate_models::{Action, AuditQuery, AuditRecord, Principal, ResourceType};
use slate_observability::track_audit_write_failure;

use crate::state::AppState;

pub struct AuditService;

impl AuditService {
    /// Best-effort append: a failed write is logged and counted, never
    /// returned to the caller.
    pub async fn record(sink: &dyn AuditSink, record: &AuditRecord) {
        if let Err(e) = sink.append(record).await {
            warn!(
                error = %e,
                action = %record.action,
                target_id = ?record.target_id,
                "Failed to write audit record"
            );
            track_audit_write_failure(&record.action);
        }
    }

    #[instrument(skip(state, principal), fields(principal_id = %principal.id))]
    pub async fn list_audit(
        state: &AppState,
        principal: &Principal,
        query: AuditQuery,
    ) -> Result<Vec<AuditRecord>, AppError> {
        state
            .authz
            .require(principal, ResourceType::AuditRecord, Action::Read, None)
            .await?;

        state.audit.list(query.target_id, query.limit()).await
    }
}
