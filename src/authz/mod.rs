//! Role-based authorization.
//!
//! A [`PermissionMatrix`] maps every `(resource_type, action)` pair to one
//! [`PermissionRule`](slate_models::PermissionRule). The
//! [`AuthorizationEngine`] evaluates a principal against it and records
//! denials and SuperAdmin bypasses in the audit trail.
//!
//! Role checks are plain set membership. Rank in the role hierarchy only
//! matters for role assignment (see `modules::principals`).

pub mod engine;
pub mod matrix;

pub use engine::{AuthorizationEngine, Decision};
pub use matrix::PermissionMatrix;
