//! Audit trail records.
//!
//! Records are append-only. `actor_id` is `None` for system actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::ids::{AuditRecordId, PrincipalId};

/// Audit action names.
pub mod actions {
    pub const STUDENT_ENROLLED: &str = "STUDENT_ENROLLED";
    pub const STUDENT_SOFT_DELETED: &str = "STUDENT_SOFT_DELETED";
    pub const COURSE_CREATED: &str = "COURSE_CREATED";
    pub const COURSE_DEACTIVATED: &str = "COURSE_DEACTIVATED";
    pub const ROLE_CHANGED: &str = "ROLE_CHANGED";
    pub const AUTHZ_DENIED: &str = "AUTHZ_DENIED";
    pub const AUTHZ_BYPASS: &str = "AUTHZ_BYPASS";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub action: String,
    pub actor_id: Option<PrincipalId>,
    pub target_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        action: &str,
        actor_id: Option<PrincipalId>,
        target_id: Option<Uuid>,
        detail: Value,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            action: action.to_string(),
            actor_id,
            target_id,
            detail,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AuditQuery {
    pub target_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl AuditQuery {
    /// Defaults to 50, clamped between 1 and 100.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 100)
    }
}
