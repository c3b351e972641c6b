use serde_json::json;
use tracing::{info, instrument};

use slate_cache::invalidate;
use slate_core::{AppError, reasons};
use slate_models::{Action, AuditRecord, Principal, PrincipalId, ResourceType, Role, actions};

use crate::modules::audit::service::AuditService;
use crate::state::AppState;

pub struct PrincipalService;

impl PrincipalService {
    /// Changes a principal's role.
    ///
    /// Besides the `(principal, update)` rule, the actor's tier caps both the
    /// role being granted and the role being replaced: an Admin can neither
    /// mint nor demote a SuperAdmin.
    #[instrument(skip(state, actor), fields(actor_id = %actor.id, target_id = %target_id, role = %new_role))]
    pub async fn change_role(
        state: &AppState,
        actor: &Principal,
        target_id: PrincipalId,
        new_role: Role,
    ) -> Result<Principal, AppError> {
        let target = state
            .store
            .find_principal(target_id)
            .await?
            .ok_or_else(|| AppError::not_found("Principal not found"))?;

        state
            .authz
            .require(actor, ResourceType::Principal, Action::Update, Some(&target))
            .await?;

        for role in [new_role, target.role] {
            if !actor.role.outranks_or_equals(role) {
                return Err(AppError::forbidden(
                    reasons::ROLE_CEILING,
                    format!("A {} cannot assign or replace the {} role", actor.role, role),
                ));
            }
        }

        let previous = target.role;
        // Conditional on the role the ceiling was checked against.
        let updated = state
            .store
            .update_principal_role(target_id, previous, new_role)
            .await?;
        info!(from = %previous, to = %new_role, "Role changed");

        let record = AuditRecord::new(
            actions::ROLE_CHANGED,
            Some(actor.id),
            Some(target_id.into_inner()),
            json!({ "from": previous, "to": new_role }),
        );
        AuditService::record(state.audit.as_ref(), &record).await;
        invalidate::principal(state.cache.as_ref(), target_id.into_inner()).await;

        Ok(updated)
    }
}
