//! In-process store used by tests and local runs without PostgreSQL.
//!
//! Every write runs under one async mutex, so the enrollment transaction is
//! serialized exactly like the conditional update serializes it in
//! PostgreSQL. Audit records live behind their own lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use slate_core::{AppError, reasons};
use slate_models::{
    AuditRecord, Course, CourseId, Enrollment, NewEnrollment, PermissionRule, Principal,
    PrincipalId, Role, StudentId, StudentProfile,
};

use crate::store::{
    ALREADY_ENROLLED, AuditSink, ROLE_CHANGED_CONCURRENTLY, SchoolStore,
    ensure_class_group_matches, ensure_course_open, ensure_seat_available,
    ensure_student_enrollable,
};

#[derive(Default)]
struct State {
    principals: HashMap<PrincipalId, Principal>,
    rules: Vec<PermissionRule>,
    students: HashMap<StudentId, StudentProfile>,
    courses: HashMap<CourseId, Course>,
    enrollments: HashMap<(StudentId, CourseId), Enrollment>,
}

impl State {
    fn check_enrollment(&self, new: &NewEnrollment) -> Result<(), AppError> {
        let student = ensure_student_enrollable(self.students.get(&new.student_id))?;
        let course = ensure_course_open(self.courses.get(&new.course_id))?;
        ensure_class_group_matches(student, course)?;
        ensure_seat_available(course)?;
        if self
            .enrollments
            .contains_key(&(new.student_id, new.course_id))
        {
            return Err(AppError::duplicate(ALREADY_ENROLLED));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    audit: Mutex<Vec<AuditRecord>>,
    fail_audit: AtomicBool,
    transient_failures: AtomicU32,
    interleaved_role: std::sync::Mutex<Option<Role>>,
    commit_delay: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the enrollment transaction open for `delay` before committing.
    /// Lets tests cancel or race an in-flight enrollment.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Makes every subsequent audit append fail until reset.
    pub fn set_audit_failure(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// The next `count` enrollment transactions fail with a transient error
    /// before touching any state.
    pub fn inject_transient_failures(&self, count: u32) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    /// The next role update finds the principal already moved to `role`, as
    /// if another writer committed between the caller's read and its write.
    pub fn interleave_role_change(&self, role: Role) {
        if let Ok(mut slot) = self.interleaved_role.lock() {
            *slot = Some(role);
        }
    }

    fn take_interleaved_role(&self) -> Option<Role> {
        self.interleaved_role.lock().ok().and_then(|mut slot| slot.take())
    }

    fn take_transient_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.lock().await.clone()
    }

    pub async fn enrollments_for_course(&self, course_id: CourseId) -> Vec<Enrollment> {
        self.state
            .lock()
            .await
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect()
    }

    async fn lock_for_enrollment(
        &self,
        new: &NewEnrollment,
    ) -> Result<MutexGuard<'_, State>, AppError> {
        let state = self.state.lock().await;
        if !self.commit_delay.is_zero() {
            tokio::time::sleep(self.commit_delay).await;
        }
        if self.take_transient_failure() {
            return Err(AppError::transient(anyhow::anyhow!(
                "could not serialize access due to concurrent update"
            )));
        }
        state.check_enrollment(new)?;
        Ok(state)
    }
}

#[async_trait]
impl SchoolStore for MemoryStore {
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, AppError> {
        Ok(self.state.lock().await.principals.get(&id).cloned())
    }

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .principals
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn insert_principal(&self, principal: &Principal) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state
            .principals
            .values()
            .any(|p| p.email == principal.email || p.id == principal.id)
        {
            return Err(AppError::duplicate(
                "A principal with this email already exists",
            ));
        }
        state.principals.insert(principal.id, principal.clone());
        Ok(())
    }

    async fn update_principal_role(
        &self,
        id: PrincipalId,
        expected: Role,
        role: Role,
    ) -> Result<Principal, AppError> {
        let mut state = self.state.lock().await;
        let principal = state
            .principals
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Principal not found"))?;
        if let Some(interleaved) = self.take_interleaved_role() {
            principal.role = interleaved;
        }
        if principal.role != expected {
            return Err(AppError::transient(anyhow::anyhow!(
                ROLE_CHANGED_CONCURRENTLY
            )));
        }
        principal.role = role;
        principal.updated_at = Utc::now();
        Ok(principal.clone())
    }

    async fn load_permission_rules(&self) -> Result<Vec<PermissionRule>, AppError> {
        Ok(self.state.lock().await.rules.clone())
    }

    async fn replace_permission_rules(&self, rules: &[PermissionRule]) -> Result<(), AppError> {
        self.state.lock().await.rules = rules.to_vec();
        Ok(())
    }

    async fn find_student(&self, id: StudentId) -> Result<Option<StudentProfile>, AppError> {
        Ok(self.state.lock().await.students.get(&id).cloned())
    }

    async fn insert_student(&self, profile: &StudentProfile) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state
            .students
            .values()
            .any(|s| s.student_number == profile.student_number || s.id == profile.id)
        {
            return Err(AppError::duplicate("Student number already in use"));
        }
        state.students.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn soft_delete_student(
        &self,
        id: StudentId,
        deleted_by: PrincipalId,
    ) -> Result<StudentProfile, AppError> {
        let mut state = self.state.lock().await;
        let student = state
            .students
            .get_mut(&id)
            .filter(|s| s.is_live())
            .ok_or_else(|| AppError::not_found("Student not found"))?;
        let now = Utc::now();
        student.deleted_at = Some(now);
        student.deleted_by = Some(deleted_by);
        student.updated_at = now;
        Ok(student.clone())
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, AppError> {
        Ok(self.state.lock().await.courses.get(&id).cloned())
    }

    async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state
            .courses
            .values()
            .any(|c| c.code == course.code || c.id == course.id)
        {
            return Err(AppError::duplicate(
                "A course with this code already exists",
            ));
        }
        state.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn deactivate_course(&self, id: CourseId) -> Result<Course, AppError> {
        let mut state = self.state.lock().await;
        let course = state
            .courses
            .get_mut(&id)
            .filter(|c| c.is_live())
            .ok_or_else(|| AppError::not_found("Course not found"))?;
        if !course.is_active {
            return Err(AppError::validation(
                reasons::COURSE_INACTIVE,
                "Course is not active",
            ));
        }
        course.is_active = false;
        course.updated_at = Utc::now();
        Ok(course.clone())
    }

    async fn commit_enrollment(
        &self,
        new: NewEnrollment,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, AppError> {
        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AppError::cancelled("Enrollment cancelled before commit"));
            }
            locked = self.lock_for_enrollment(&new) => locked?,
        };

        // Commit: both writes happen under the same guard.
        let enrollment = new.into_enrollment();
        if let Some(course) = state.courses.get_mut(&new.course_id) {
            course.enrollment_count += 1;
            course.updated_at = enrollment.created_at;
        }
        state
            .enrollments
            .insert((new.student_id, new.course_id), enrollment.clone());
        Ok(enrollment)
    }

    async fn find_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .enrollments
            .get(&(student_id, course_id))
            .cloned())
    }

    async fn count_enrollments(&self, course_id: CourseId) -> Result<i64, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .enrollments
            .keys()
            .filter(|(_, course)| *course == course_id)
            .count() as i64)
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(AppError::transient(anyhow::anyhow!("audit store unavailable")));
        }
        self.audit.lock().await.push(record.clone());
        Ok(())
    }

    async fn list(&self, target_id: Option<Uuid>, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        let audit = self.audit.lock().await;
        Ok(audit
            .iter()
            .rev()
            .filter(|r| target_id.is_none() || r.target_id == target_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
