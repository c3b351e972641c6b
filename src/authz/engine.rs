use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument};

use slate_core::{AppError, reasons};
use slate_db::AuditSink;
use slate_models::{
    Action, AuditRecord, OwnedResource, PermissionRule, Principal, ResourceType, actions,
};
use slate_observability::track_authorization_check;

use super::matrix::PermissionMatrix;
use crate::modules::audit::service::AuditService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// `bypass` is set when the rule was skipped for a SuperAdmin.
    Allow { bypass: bool },
    Deny { reason: &'static str },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    /// Label used for the `outcome` metric dimension and audit detail.
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow { bypass: false } => "allowed",
            Decision::Allow { bypass: true } => "bypass",
            Decision::Deny { .. } => "denied",
        }
    }
}

pub struct AuthorizationEngine {
    matrix: PermissionMatrix,
    audit: Arc<dyn AuditSink>,
}

impl fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("rules", &self.matrix.len())
            .finish_non_exhaustive()
    }
}

impl AuthorizationEngine {
    pub fn new(matrix: PermissionMatrix, audit: Arc<dyn AuditSink>) -> Self {
        Self { matrix, audit }
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    /// Pure rule evaluation, no side effects.
    ///
    /// Order: rule lookup, active flag, SuperAdmin bypass, role membership,
    /// then ownership when the rule asks for it.
    pub fn evaluate(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
        target: Option<&dyn OwnedResource>,
    ) -> Result<Decision, AppError> {
        let rule = self.matrix.rule(resource_type, action)?;
        if let Some(decision) = Self::decide_by_role(principal, rule) {
            return Ok(decision);
        }

        if !rule.requires_ownership {
            return Ok(Decision::Allow { bypass: false });
        }

        let target = target.ok_or_else(|| {
            AppError::invalid_argument(format!(
                "Ownership check on ({resource_type}, {action}) needs a target object"
            ))
        })?;

        if self.matrix.overrides_ownership(principal.role)
            || target.owner_id() == Some(principal.id)
        {
            Ok(Decision::Allow { bypass: false })
        } else {
            Ok(Decision::Deny {
                reason: reasons::NOT_OWNER,
            })
        }
    }

    /// The evaluation steps before ownership. An ownership rule the role
    /// passes comes back as a plain allow, so callers can reject on role
    /// alone before loading the target.
    pub fn evaluate_role(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
    ) -> Result<Decision, AppError> {
        let rule = self.matrix.rule(resource_type, action)?;
        Ok(Self::decide_by_role(principal, rule).unwrap_or(Decision::Allow { bypass: false }))
    }

    /// `None` when the role passes and the rule's ownership step decides.
    fn decide_by_role(principal: &Principal, rule: &PermissionRule) -> Option<Decision> {
        if !principal.is_active {
            return Some(Decision::Deny {
                reason: reasons::PRINCIPAL_INACTIVE,
            });
        }

        if principal.role.is_super_admin() {
            return Some(Decision::Allow { bypass: true });
        }

        if !rule.allows(principal.role) {
            return Some(Decision::Deny {
                reason: reasons::ROLE_NOT_PERMITTED,
            });
        }

        None
    }

    /// Evaluates the rule, then records the decision. Denials and SuperAdmin
    /// bypasses each append one audit record; plain allows are not audited.
    #[instrument(
        skip(self, principal, target),
        fields(principal_id = %principal.id, role = %principal.role)
    )]
    pub async fn authorize(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
        target: Option<&dyn OwnedResource>,
    ) -> Result<Decision, AppError> {
        let decision = self.evaluate(principal, resource_type, action, target)?;
        self.record(principal, resource_type, action, target, decision).await;
        Ok(decision)
    }

    async fn record(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
        target: Option<&dyn OwnedResource>,
        decision: Decision,
    ) {
        track_authorization_check(principal.role.as_str(), decision.outcome());

        let audit_action = match decision {
            Decision::Allow { bypass: false } => {
                debug!(%resource_type, %action, "Access allowed");
                return;
            }
            Decision::Allow { bypass: true } => {
                info!(%resource_type, %action, "SuperAdmin bypassed permission rule");
                actions::AUTHZ_BYPASS
            }
            Decision::Deny { reason } => {
                info!(%resource_type, %action, reason, "Access denied");
                actions::AUTHZ_DENIED
            }
        };

        let mut detail = json!({
            "resource_type": resource_type,
            "action": action,
            "outcome": decision.outcome(),
        });
        if let Decision::Deny { reason } = decision {
            detail["reason"] = json!(reason);
        }

        let record = AuditRecord::new(
            audit_action,
            Some(principal.id),
            target.map(|t| t.resource_id()),
            detail,
        );
        AuditService::record(self.audit.as_ref(), &record).await;
    }

    /// Like [`authorize`](Self::authorize), but turns a denial into
    /// `PERMISSION_DENIED` carrying the deny reason.
    pub async fn require(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
        target: Option<&dyn OwnedResource>,
    ) -> Result<(), AppError> {
        match self
            .authorize(principal, resource_type, action, target)
            .await?
        {
            Decision::Allow { .. } => Ok(()),
            Decision::Deny { reason } => Err(denied(reason, resource_type, action)),
        }
    }

    /// Rejects on role alone, before the target is loaded. A denial is
    /// recorded like any other; a pass records nothing and must be followed
    /// by [`require`](Self::require) with the target.
    pub async fn require_role(
        &self,
        principal: &Principal,
        resource_type: ResourceType,
        action: Action,
    ) -> Result<(), AppError> {
        match self.evaluate_role(principal, resource_type, action)? {
            Decision::Allow { .. } => Ok(()),
            decision @ Decision::Deny { reason } => {
                self.record(principal, resource_type, action, None, decision).await;
                Err(denied(reason, resource_type, action))
            }
        }
    }
}

fn denied(reason: &'static str, resource_type: ResourceType, action: Action) -> AppError {
    AppError::forbidden(reason, format!("Not permitted to {action} {resource_type}"))
}
