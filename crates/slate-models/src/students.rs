//! Student profile models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::ids::{ClassGroupId, PrincipalId, StudentId};
use crate::permissions::OwnedResource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Inactive,
    Graduated,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown student status: {0}")]
pub struct ParseStudentStatusError(pub String);

impl StudentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Graduated => "graduated",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudentStatus {
    type Err = ParseStudentStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(StudentStatus::Active),
            "inactive" => Ok(StudentStatus::Inactive),
            "graduated" => Ok(StudentStatus::Graduated),
            other => Err(ParseStudentStatusError(other.to_string())),
        }
    }
}

impl TryFrom<String> for StudentStatus {
    type Error = ParseStudentStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A student profile. `deleted_at` set means the profile is soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentProfile {
    pub id: StudentId,
    pub student_number: String,
    pub principal_id: PrincipalId,
    pub class_group_id: Option<ClassGroupId>,
    #[sqlx(try_from = "String")]
    pub status: StudentStatus,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<PrincipalId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

impl OwnedResource for StudentProfile {
    fn resource_id(&self) -> Uuid {
        self.id.into_inner()
    }

    fn owner_id(&self) -> Option<PrincipalId> {
        Some(self.principal_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStudentProfile {
    #[validate(length(min = 1, max = 20))]
    pub student_number: String,
    pub principal_id: PrincipalId,
    pub class_group_id: Option<ClassGroupId>,
}

impl NewStudentProfile {
    pub fn into_profile(self) -> StudentProfile {
        let now = Utc::now();
        StudentProfile {
            id: StudentId::new(),
            student_number: self.student_number,
            principal_id: self.principal_id,
            class_group_id: self.class_group_id,
            status: StudentStatus::Active,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
