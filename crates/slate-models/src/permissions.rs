//! Permission rule vocabulary.
//!
//! A [`PermissionRule`] states which roles may perform an [`Action`] on a
//! [`ResourceType`], and whether the acting principal must also own the
//! target object.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ids::PrincipalId;
use crate::roles::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Enrollment,
    Student,
    Course,
    Principal,
    AuditRecord,
    Invoice,
    Attendance,
    Grade,
}

impl ResourceType {
    pub const ALL: [ResourceType; 8] = [
        ResourceType::Enrollment,
        ResourceType::Student,
        ResourceType::Course,
        ResourceType::Principal,
        ResourceType::AuditRecord,
        ResourceType::Invoice,
        ResourceType::Attendance,
        ResourceType::Grade,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceType::Enrollment => "enrollment",
            ResourceType::Student => "student",
            ResourceType::Course => "course",
            ResourceType::Principal => "principal",
            ResourceType::AuditRecord => "audit_record",
            ResourceType::Invoice => "invoice",
            ResourceType::Attendance => "attendance",
            ResourceType::Grade => "grade",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Domain-specific operations outside CRUD (approve, export, ...).
    Special,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Special,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Special => "special",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseVocabularyError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for ResourceType {
    type Err = ParseVocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ParseVocabularyError {
                kind: "resource type",
                value: s.to_string(),
            })
    }
}

impl FromStr for Action {
    type Err = ParseVocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseVocabularyError {
                kind: "action",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionRule {
    pub resource_type: ResourceType,
    pub action: Action,
    pub allowed_roles: BTreeSet<Role>,
    pub requires_ownership: bool,
}

impl PermissionRule {
    pub fn new(
        resource_type: ResourceType,
        action: Action,
        allowed_roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            resource_type,
            action,
            allowed_roles: allowed_roles.into_iter().collect(),
            requires_ownership: false,
        }
    }

    pub fn owned(mut self) -> Self {
        self.requires_ownership = true;
        self
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// Objects that can be the target of an ownership-checked rule.
pub trait OwnedResource: Send + Sync {
    /// Identifier recorded in the audit trail when a check on this object is denied.
    fn resource_id(&self) -> Uuid;

    /// The principal that owns this object, if any.
    fn owner_id(&self) -> Option<PrincipalId>;
}
