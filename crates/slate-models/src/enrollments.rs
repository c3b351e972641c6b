//! Enrollment models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{CourseId, EnrollmentId, PrincipalId, StudentId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub enrolled_by: PrincipalId,
    pub created_at: DateTime<Utc>,
}

/// Input to the enrollment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEnrollment {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub enrolled_by: PrincipalId,
}

impl NewEnrollment {
    pub fn into_enrollment(self) -> Enrollment {
        Enrollment {
            id: EnrollmentId::new(),
            student_id: self.student_id,
            course_id: self.course_id,
            enrolled_by: self.enrolled_by,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrollStudentDto {
    pub student_id: StudentId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkEnrollDto {
    #[validate(length(min = 1, max = 500))]
    pub student_ids: Vec<StudentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkEnrollFailure {
    pub student_id: StudentId,
    pub code: String,
    pub reason: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkEnrollOutcome {
    pub enrolled: Vec<Enrollment>,
    pub failed: Vec<BulkEnrollFailure>,
}

impl BulkEnrollOutcome {
    pub fn enrolled_count(&self) -> usize {
        self.enrolled.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_dto_rejects_empty() {
        let dto = BulkEnrollDto {
            student_ids: vec![],
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_into_enrollment_keeps_keys() {
        let new = NewEnrollment {
            student_id: StudentId::from_u128(42),
            course_id: CourseId::from_u128(9),
            enrolled_by: PrincipalId::from_u128(7),
        };
        let enrollment = new.into_enrollment();
        assert_eq!(enrollment.student_id, new.student_id);
        assert_eq!(enrollment.course_id, new.course_id);
        assert_eq!(enrollment.enrolled_by, new.enrolled_by);
    }
}
