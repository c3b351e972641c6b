//! The fixed role set and its hierarchy.
//!
//! ```text
//! SuperAdmin                       tier 3
//!     ├── Admin, Principal, Accountant   tier 2
//!     │     ├── Staff, Teacher           tier 1
//!     │     │     └── Student, Parent    tier 0
//! ```
//!
//! The hierarchy decides who may *assign* a role. Permission checks never use
//! rank: a rule lists its allowed roles explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Principal,
    Accountant,
    Staff,
    Teacher,
    Student,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl Role {
    pub const ALL: [Role; 8] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Principal,
        Role::Accountant,
        Role::Staff,
        Role::Teacher,
        Role::Student,
        Role::Parent,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Principal => "principal",
            Role::Accountant => "accountant",
            Role::Staff => "staff",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    /// Hierarchy tier, higher is more senior.
    pub const fn tier(self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin | Role::Principal | Role::Accountant => 2,
            Role::Staff | Role::Teacher => 1,
            Role::Student | Role::Parent => 0,
        }
    }

    pub const fn outranks_or_equals(self, other: Role) -> bool {
        self.tier() >= other.tier()
    }

    pub const fn is_super_admin(self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
