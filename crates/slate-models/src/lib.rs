//! # Slate Models
//!
//! Domain models and DTOs for the Slate API.
//!
//! # Modules
//!
//! - [`ids`]: typed identifiers
//! - [`roles`]: the role hierarchy
//! - [`permissions`]: permission rule vocabulary and the [`OwnedResource`] trait
//! - [`principals`], [`students`], [`courses`], [`enrollments`]: entities and DTOs
//! - [`audit`]: audit trail records

pub mod audit;
pub mod courses;
pub mod enrollments;
pub mod ids;
pub mod permissions;
pub mod principals;
pub mod roles;
pub mod students;

pub use audit::{AuditQuery, AuditRecord, actions};
pub use courses::{Course, CourseStats, CreateCourseDto};
pub use enrollments::{
    BulkEnrollDto, BulkEnrollFailure, BulkEnrollOutcome, EnrollStudentDto, Enrollment,
    NewEnrollment,
};
pub use ids::{AuditRecordId, ClassGroupId, CourseId, EnrollmentId, PrincipalId, StudentId};
pub use permissions::{Action, OwnedResource, PermissionRule, ResourceType};
pub use principals::{ChangeRoleDto, NewPrincipal, Principal};
pub use roles::Role;
pub use students::{NewStudentProfile, StudentProfile, StudentStatus};
