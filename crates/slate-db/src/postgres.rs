//! PostgreSQL implementation of the store traits.
//!
//! Queries are runtime-checked (`query_as::<_, T>`), so the crate builds
//! without a live database.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use slate_core::{AppError, reasons};
use slate_models::{
    Action, AuditRecord, Course, CourseId, Enrollment, NewEnrollment, PermissionRule, Principal,
    PrincipalId, ResourceType, Role, StudentId, StudentProfile,
};

use crate::errors::{classify, classify_duplicate};
use crate::store::{
    ALREADY_ENROLLED, AuditSink, ROLE_CHANGED_CONCURRENTLY, SchoolStore,
    ensure_class_group_matches, ensure_course_open, ensure_seat_available,
    ensure_student_enrollable,
};

const PRINCIPAL_COLUMNS: &str =
    "id, email, display_name, role, is_active, profile_id, created_at, updated_at";
const STUDENT_COLUMNS: &str = "id, student_number, principal_id, class_group_id, status, \
     deleted_at, deleted_by, created_at, updated_at";
const COURSE_COLUMNS: &str = "id, code, title, class_group_id, capacity, enrollment_count, \
     is_active, deleted_at, created_at, updated_at";
const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, enrolled_by, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Everything up to, but not including, the commit.
    async fn prepare_enrollment(
        &self,
        new: NewEnrollment,
    ) -> Result<(Transaction<'static, Postgres>, Enrollment), AppError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        // FOR SHARE keeps a concurrent soft delete out until we commit.
        let student = sqlx::query_as::<_, StudentProfile>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE id = $1 FOR SHARE"
        ))
        .bind(new.student_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;
        let student = ensure_student_enrollable(student.as_ref())?;

        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(new.course_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;
        let course = ensure_course_open(course.as_ref())?;
        ensure_class_group_matches(student, course)?;

        // Seat reservation and the capacity check are one statement, so two
        // racing transactions serialize on the course row.
        let reserved = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses \
             SET enrollment_count = enrollment_count + 1, updated_at = NOW() \
             WHERE id = $1 AND is_active AND deleted_at IS NULL \
               AND enrollment_count < capacity \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(new.course_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;

        if reserved.is_none() {
            // Lost a race: re-read under the row lock to report why.
            let current = sqlx::query_as::<_, Course>(&format!(
                "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 FOR SHARE"
            ))
            .bind(new.course_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;
            let current = ensure_course_open(current.as_ref())?;
            ensure_seat_available(current)?;
            return Err(AppError::validation(
                reasons::COURSE_AT_CAPACITY,
                "Course is at full capacity",
            ));
        }

        let enrollment = new.into_enrollment();
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "INSERT INTO enrollments (id, student_id, course_id, enrolled_by, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(enrollment.id)
        .bind(enrollment.student_id)
        .bind(enrollment.course_id)
        .bind(enrollment.enrolled_by)
        .bind(enrollment.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify_duplicate(e, ALREADY_ENROLLED))?;

        Ok((tx, enrollment))
    }
}

#[derive(FromRow)]
struct PermissionRuleRow {
    resource_type: String,
    action: String,
    allowed_roles: Vec<String>,
    requires_ownership: bool,
}

impl TryFrom<PermissionRuleRow> for PermissionRule {
    type Error = AppError;

    fn try_from(row: PermissionRuleRow) -> Result<Self, Self::Error> {
        let resource_type: ResourceType = row
            .resource_type
            .parse()
            .map_err(|e| AppError::configuration(format!("permission_rules: {e}")))?;
        let action: Action = row
            .action
            .parse()
            .map_err(|e| AppError::configuration(format!("permission_rules: {e}")))?;
        let allowed_roles = row
            .allowed_roles
            .iter()
            .map(|role| role.parse::<Role>())
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::configuration(format!("permission_rules: {e}")))?;

        Ok(PermissionRule {
            resource_type,
            action,
            allowed_roles,
            requires_ownership: row.requires_ownership,
        })
    }
}

#[async_trait]
impl SchoolStore for PgStore {
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, AppError> {
        sqlx::query_as::<_, Principal>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>, AppError> {
        sqlx::query_as::<_, Principal>(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    #[instrument(skip(self, principal), fields(principal.id = %principal.id))]
    async fn insert_principal(&self, principal: &Principal) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO principals \
             (id, email, display_name, role, is_active, profile_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(principal.id)
        .bind(&principal.email)
        .bind(&principal.display_name)
        .bind(principal.role.as_str())
        .bind(principal.is_active)
        .bind(principal.profile_id)
        .bind(principal.created_at)
        .bind(principal.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_duplicate(e, "A principal with this email already exists"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_principal_role(
        &self,
        id: PrincipalId,
        expected: Role,
        role: Role,
    ) -> Result<Principal, AppError> {
        let updated = sqlx::query_as::<_, Principal>(&format!(
            "UPDATE principals SET role = $2, updated_at = NOW() \
             WHERE id = $1 AND role = $3 RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match updated {
            Some(principal) => Ok(principal),
            None => match self.find_principal(id).await? {
                Some(_) => Err(AppError::transient(anyhow::anyhow!(
                    ROLE_CHANGED_CONCURRENTLY
                ))),
                None => Err(AppError::not_found("Principal not found")),
            },
        }
    }

    async fn load_permission_rules(&self) -> Result<Vec<PermissionRule>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRuleRow>(
            "SELECT resource_type, action, allowed_roles, requires_ownership \
             FROM permission_rules ORDER BY resource_type, action",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.into_iter().map(PermissionRule::try_from).collect()
    }

    #[instrument(skip(self, rules), fields(rules = rules.len()))]
    async fn replace_permission_rules(&self, rules: &[PermissionRule]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        sqlx::query("DELETE FROM permission_rules")
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

        for rule in rules {
            let roles: Vec<String> = rule
                .allowed_roles
                .iter()
                .map(|r| r.as_str().to_string())
                .collect();
            sqlx::query(
                "INSERT INTO permission_rules \
                 (resource_type, action, allowed_roles, requires_ownership) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(rule.resource_type.as_str())
            .bind(rule.action.as_str())
            .bind(roles)
            .bind(rule.requires_ownership)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify_duplicate(e, "Duplicate permission rule"))?;
        }

        tx.commit().await.map_err(classify)
    }

    async fn find_student(&self, id: StudentId) -> Result<Option<StudentProfile>, AppError> {
        sqlx::query_as::<_, StudentProfile>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn insert_student(&self, profile: &StudentProfile) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO student_profiles \
             (id, student_number, principal_id, class_group_id, status, \
              deleted_at, deleted_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(profile.id)
        .bind(&profile.student_number)
        .bind(profile.principal_id)
        .bind(profile.class_group_id)
        .bind(profile.status.as_str())
        .bind(profile.deleted_at)
        .bind(profile.deleted_by)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_duplicate(e, "Student number already in use"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn soft_delete_student(
        &self,
        id: StudentId,
        deleted_by: PrincipalId,
    ) -> Result<StudentProfile, AppError> {
        sqlx::query_as::<_, StudentProfile>(&format!(
            "UPDATE student_profiles \
             SET deleted_at = NOW(), deleted_by = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(deleted_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?
        .ok_or_else(|| AppError::not_found("Student not found"))
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, AppError> {
        sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    #[instrument(skip(self, course), fields(course.code = %course.code))]
    async fn insert_course(&self, course: &Course) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO courses \
             (id, code, title, class_group_id, capacity, enrollment_count, is_active, \
              deleted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(course.id)
        .bind(&course.code)
        .bind(&course.title)
        .bind(course.class_group_id)
        .bind(course.capacity)
        .bind(course.enrollment_count)
        .bind(course.is_active)
        .bind(course.deleted_at)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_duplicate(e, "A course with this code already exists"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn deactivate_course(&self, id: CourseId) -> Result<Course, AppError> {
        let updated = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL AND is_active \
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match updated {
            Some(course) => Ok(course),
            None => {
                // Either missing or already inactive; the helper reports which.
                let current = self.find_course(id).await?;
                ensure_course_open(current.as_ref())?;
                Err(AppError::validation(
                    reasons::COURSE_INACTIVE,
                    "Course is not active",
                ))
            }
        }
    }

    #[instrument(skip(self, cancel), fields(student_id = %new.student_id, course_id = %new.course_id))]
    async fn commit_enrollment(
        &self,
        new: NewEnrollment,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, AppError> {
        // Dropping the transaction on cancel rolls it back.
        let (tx, enrollment) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AppError::cancelled("Enrollment cancelled before commit"));
            }
            prepared = self.prepare_enrollment(new) => prepared?,
        };

        tx.commit().await.map_err(classify)?;
        Ok(enrollment)
    }

    async fn find_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, AppError> {
        sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
             WHERE student_id = $1 AND course_id = $2"
        ))
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn count_enrollments(&self, course_id: CourseId) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl AuditSink for PgStore {
    async fn append(&self, record: &AuditRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_records (id, action, actor_id, target_id, detail, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(&record.action)
        .bind(record.actor_id)
        .bind(record.target_id)
        .bind(&record.detail)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn list(&self, target_id: Option<Uuid>, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        sqlx::query_as::<_, AuditRecord>(
            "SELECT id, action, actor_id, target_id, detail, created_at \
             FROM audit_records \
             WHERE ($1::uuid IS NULL OR target_id = $1) \
             ORDER BY created_at DESC \
             LIMIT $2",
        )
        .bind(target_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)
    }
}
