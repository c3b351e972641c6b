//! Store traits the service layer depends on.
//!
//! Both traits are object safe so the application state can hold them as
//! `Arc<dyn SchoolStore>` / `Arc<dyn AuditSink>` and tests can swap in
//! [`MemoryStore`](crate::MemoryStore).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use slate_core::{AppError, reasons};

pub(crate) const ROLE_CHANGED_CONCURRENTLY: &str = "principal role changed concurrently";
use slate_models::{
    AuditRecord, Course, CourseId, Enrollment, NewEnrollment, PermissionRule, Principal,
    PrincipalId, Role, StudentId, StudentProfile,
};

#[async_trait]
pub trait SchoolStore: Send + Sync {
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, AppError>;

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, AppError>;

    /// Fails with `DUPLICATE` when the email is taken.
    async fn insert_principal(&self, principal: &Principal) -> Result<(), AppError>;

    /// Sets the role only while it still equals `expected`. A principal whose
    /// role changed since it was read fails with `TRANSIENT_STORE_ERROR`.
    async fn update_principal_role(
        &self,
        id: PrincipalId,
        expected: Role,
        role: Role,
    ) -> Result<Principal, AppError>;

    async fn load_permission_rules(&self) -> Result<Vec<PermissionRule>, AppError>;

    /// Replaces the whole rule table in one transaction.
    async fn replace_permission_rules(&self, rules: &[PermissionRule]) -> Result<(), AppError>;

    /// Returns soft-deleted profiles too; callers check [`StudentProfile::is_live`].
    async fn find_student(&self, id: StudentId) -> Result<Option<StudentProfile>, AppError>;

    async fn insert_student(&self, profile: &StudentProfile) -> Result<(), AppError>;

    /// Marks a live profile deleted. Missing or already deleted is `NOT_FOUND`.
    async fn soft_delete_student(
        &self,
        id: StudentId,
        deleted_by: PrincipalId,
    ) -> Result<StudentProfile, AppError>;

    /// Returns soft-deleted courses too; callers check [`Course::is_live`].
    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, AppError>;

    /// Fails with `DUPLICATE` when the course code is taken.
    async fn insert_course(&self, course: &Course) -> Result<(), AppError>;

    /// Clears the active flag. Existing enrollments are left untouched.
    async fn deactivate_course(&self, id: CourseId) -> Result<Course, AppError>;

    /// Runs the enrollment transaction: checks the student and the course,
    /// reserves a seat, inserts the row and commits.
    ///
    /// Check order is student, course, class group, capacity, duplicate; the
    /// first failure aborts with nothing written. Cancelling `cancel` before
    /// the commit rolls everything back and yields `CANCELLED`; once the
    /// commit has been issued it runs to completion.
    async fn commit_enrollment(
        &self,
        new: NewEnrollment,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, AppError>;

    async fn find_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, AppError>;

    async fn count_enrollments(&self, course_id: CourseId) -> Result<i64, AppError>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError>;

    /// Newest first.
    async fn list(&self, target_id: Option<Uuid>, limit: i64) -> Result<Vec<AuditRecord>, AppError>;
}

pub fn ensure_student_enrollable(
    student: Option<&StudentProfile>,
) -> Result<&StudentProfile, AppError> {
    match student {
        Some(student) if student.is_live() => {
            if student.is_active() {
                Ok(student)
            } else {
                Err(AppError::validation(
                    reasons::STUDENT_INACTIVE,
                    format!("Student is not active (status: {})", student.status),
                ))
            }
        }
        _ => Err(AppError::not_found("Student not found")),
    }
}

pub fn ensure_course_open(course: Option<&Course>) -> Result<&Course, AppError> {
    match course {
        Some(course) if course.is_live() => {
            if course.is_active {
                Ok(course)
            } else {
                Err(AppError::validation(
                    reasons::COURSE_INACTIVE,
                    "Course is not active",
                ))
            }
        }
        _ => Err(AppError::not_found("Course not found")),
    }
}

/// A course bound to a class group only admits students of that group.
pub fn ensure_class_group_matches(
    student: &StudentProfile,
    course: &Course,
) -> Result<(), AppError> {
    match course.class_group_id {
        Some(group) if student.class_group_id != Some(group) => Err(AppError::validation(
            reasons::CLASS_GROUP_MISMATCH,
            "Course is restricted to another class group",
        )),
        _ => Ok(()),
    }
}

pub fn ensure_seat_available(course: &Course) -> Result<(), AppError> {
    if course.is_full() {
        return Err(AppError::validation(
            reasons::COURSE_AT_CAPACITY,
            "Course is at full capacity",
        ));
    }
    Ok(())
}

pub const ALREADY_ENROLLED: &str = "Student is already enrolled in this course";
