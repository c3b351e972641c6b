//! Background notification jobs.
//!
//! The enrollment workflow submits [`ENROLLMENT_NOTICE`] after a commit; the
//! task worker hands the decoded [`EnrollmentNotice`] to a [`Notifier`].

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use slate_models::{CourseId, Enrollment, EnrollmentId, PrincipalId, StudentId};
use slate_tasks::{Job, JobHandler};

pub const ENROLLMENT_NOTICE: &str = "notifications.enrollment_notice";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentNotice {
    pub enrollment_id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub enrolled_by: PrincipalId,
    pub enrolled_at: DateTime<Utc>,
}

impl From<&Enrollment> for EnrollmentNotice {
    fn from(enrollment: &Enrollment) -> Self {
        Self {
            enrollment_id: enrollment.id,
            student_id: enrollment.student_id,
            course_id: enrollment.course_id,
            enrolled_by: enrollment.enrolled_by,
            enrolled_at: enrollment.created_at,
        }
    }
}

/// Delivery channel for notices (email, SMS, push, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn enrollment_notice(&self, notice: &EnrollmentNotice) -> anyhow::Result<()>;
}

/// Writes each notice as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn enrollment_notice(&self, notice: &EnrollmentNotice) -> anyhow::Result<()> {
        info!(
            enrollment_id = %notice.enrollment_id,
            student_id = %notice.student_id,
            course_id = %notice.course_id,
            "Enrollment notice"
        );
        Ok(())
    }
}

pub struct EnrollmentNoticeHandler {
    notifier: Arc<dyn Notifier>,
}

impl EnrollmentNoticeHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl JobHandler for EnrollmentNoticeHandler {
    async fn handle(&self, job: &Job) -> anyhow::Result<()> {
        let notice: EnrollmentNotice = serde_json::from_value(job.payload.clone())
            .with_context(|| format!("malformed payload for job {}", job.id))?;
        self.notifier.enrollment_notice(&notice).await
    }
}
