//! Principal models and DTOs.
//!
//! A principal is any authenticated actor. Its identity never changes; its
//! role can only be changed through the principal administration service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::ids::PrincipalId;
use crate::permissions::OwnedResource;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub display_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    /// Linked student or teacher profile, when the principal has one.
    pub profile_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for Principal {
    fn resource_id(&self) -> Uuid {
        self.id.into_inner()
    }

    fn owner_id(&self) -> Option<PrincipalId> {
        Some(self.id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewPrincipal {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub display_name: String,
    pub role: Role,
    pub profile_id: Option<Uuid>,
}

impl NewPrincipal {
    pub fn into_principal(self) -> Principal {
        let now = Utc::now();
        Principal {
            id: PrincipalId::new(),
            email: self.email,
            display_name: self.display_name,
            role: self.role,
            is_active: true,
            profile_id: self.profile_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangeRoleDto {
    pub role: Role,
}
