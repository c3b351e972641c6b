use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, instrument, warn};

use slate_cache::{invalidate, keys::course_stats};
use slate_core::{AppError, ErrorCode};
use slate_models::{
    Action, AuditRecord, BulkEnrollFailure, BulkEnrollOutcome, CourseId, CourseStats, Enrollment,
    NewEnrollment, Principal, ResourceType, StudentId, actions,
};
use slate_observability::{track_enrollment, track_task_submit_failure};
use slate_tasks::TaskSink;

use crate::modules::audit::service::AuditService;
use crate::notifications::{ENROLLMENT_NOTICE, EnrollmentNotice};
use crate::state::AppState;

pub struct EnrollmentService;

fn outcome_label(result: &Result<Enrollment, AppError>) -> &'static str {
    match result {
        Ok(_) => "committed",
        Err(e) => match e.code {
            ErrorCode::PermissionDenied => "denied",
            ErrorCode::NotFound => "not_found",
            ErrorCode::ValidationError => "rejected",
            ErrorCode::Duplicate => "duplicate",
            ErrorCode::Cancelled => "cancelled",
            ErrorCode::TransientStoreError => "transient",
            _ => "error",
        },
    }
}

impl EnrollmentService {
    /// Enrolls one student in one course on behalf of `principal`.
    ///
    /// Authorization runs first; the student, course, capacity and duplicate
    /// checks, the insert and the seat counter update then run in a single
    /// store transaction. Only a committed enrollment is audited and
    /// announced.
    #[instrument(
        skip(state, principal),
        fields(principal_id = %principal.id, student_id = %student_id, course_id = %course_id)
    )]
    pub async fn enroll(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Enrollment, AppError> {
        Self::enroll_cancellable(state, principal, student_id, course_id, &CancellationToken::new())
            .await
    }

    /// [`enroll`](Self::enroll) with a cancellation signal. Cancelling before
    /// the commit rolls back and returns `CANCELLED`; after the commit the
    /// enrollment stands and the post-commit steps still run.
    pub async fn enroll_cancellable(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
        course_id: CourseId,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, AppError> {
        let result: Result<Enrollment, AppError> = async {
            Self::authorize(state, principal).await?;
            Self::commit(state, principal, student_id, course_id, cancel).await
        }
        .await;

        track_enrollment(outcome_label(&result));
        result
    }

    /// [`enroll`](Self::enroll) that retries `TRANSIENT_STORE_ERROR` with
    /// backoff. Every other failure, `DUPLICATE` included, returns at once.
    #[instrument(
        skip(state, principal),
        fields(principal_id = %principal.id, student_id = %student_id, course_id = %course_id)
    )]
    pub async fn enroll_with_retry(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Enrollment, AppError> {
        let cancel = CancellationToken::new();
        let result: Result<Enrollment, AppError> = async {
            Self::authorize(state, principal).await?;
            Self::commit_with_retry(state, principal, student_id, course_id, &cancel).await
        }
        .await;

        track_enrollment(outcome_label(&result));
        result
    }

    /// Authorizes once, then enrolls each student on its own. A failure for
    /// one student is collected and does not affect the others.
    #[instrument(
        skip(state, principal, student_ids),
        fields(principal_id = %principal.id, course_id = %course_id, students = student_ids.len())
    )]
    pub async fn bulk_enroll(
        state: &AppState,
        principal: &Principal,
        course_id: CourseId,
        student_ids: &[StudentId],
    ) -> Result<BulkEnrollOutcome, AppError> {
        Self::authorize(state, principal).await?;

        let cancel = CancellationToken::new();
        let mut outcome = BulkEnrollOutcome::default();
        for &student_id in student_ids {
            let result =
                Self::commit_with_retry(state, principal, student_id, course_id, &cancel).await;
            track_enrollment(outcome_label(&result));

            match result {
                Ok(enrollment) => outcome.enrolled.push(enrollment),
                Err(e) => {
                    debug!(student_id = %student_id, error = %e, "Bulk enrollment entry failed");
                    outcome.failed.push(BulkEnrollFailure {
                        student_id,
                        code: e.code.as_str().to_string(),
                        reason: e.reason.map(str::to_string),
                        message: e.public_message(),
                    });
                }
            }
        }

        info!(
            enrolled = outcome.enrolled_count(),
            failed = outcome.failed_count(),
            "Bulk enrollment finished"
        );
        Ok(outcome)
    }

    /// Seat statistics for a course, cached per course.
    #[instrument(skip(state, principal), fields(principal_id = %principal.id, course_id = %course_id))]
    pub async fn enrollment_stats(
        state: &AppState,
        principal: &Principal,
        course_id: CourseId,
    ) -> Result<CourseStats, AppError> {
        state
            .authz
            .require(principal, ResourceType::Course, Action::Read, None)
            .await?;

        let cache_key = course_stats::by_id(course_id.into_inner());
        if let Some(cache) = &state.cache
            && let Some(stats) = cache.get::<CourseStats>(&cache_key).await
        {
            debug!("Course stats found in cache");
            return Ok(stats);
        }

        let course = state
            .store
            .find_course(course_id)
            .await?
            .filter(|course| course.is_live())
            .ok_or_else(|| AppError::not_found("Course not found"))?;
        let stats = course.stats();

        if let Some(cache) = &state.cache
            && let Err(e) = cache.set_with_ttl(&cache_key, &stats, course_stats::TTL).await
        {
            warn!(error = %e, "Failed to cache course stats");
        }

        Ok(stats)
    }

    async fn authorize(state: &AppState, principal: &Principal) -> Result<(), AppError> {
        state
            .authz
            .require(principal, ResourceType::Enrollment, Action::Create, None)
            .await
    }

    async fn commit_with_retry(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
        course_id: CourseId,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, AppError> {
        state
            .enroll_retry
            .run(move |_| Self::commit(state, principal, student_id, course_id, cancel))
            .await
    }

    async fn commit(
        state: &AppState,
        principal: &Principal,
        student_id: StudentId,
        course_id: CourseId,
        cancel: &CancellationToken,
    ) -> Result<Enrollment, AppError> {
        let new = NewEnrollment {
            student_id,
            course_id,
            enrolled_by: principal.id,
        };
        let enrollment = state.store.commit_enrollment(new, cancel).await?;
        info!(enrollment_id = %enrollment.id, "Enrollment committed");

        // Detached so the audit record and notice survive a dropped caller.
        let post_commit = Self::spawn_post_commit(state, &enrollment);
        if let Err(e) = post_commit.await {
            error!(error = %e, enrollment_id = %enrollment.id, "Post-commit task failed");
        }

        Ok(enrollment)
    }

    fn spawn_post_commit(state: &AppState, enrollment: &Enrollment) -> JoinHandle<()> {
        let audit = state.audit.clone();
        let tasks = state.tasks.clone();
        let cache = state.cache.clone();
        let enrollment = enrollment.clone();

        tokio::spawn(
            async move {
                let record = AuditRecord::new(
                    actions::STUDENT_ENROLLED,
                    Some(enrollment.enrolled_by),
                    Some(enrollment.id.into_inner()),
                    json!({
                        "student_id": enrollment.student_id,
                        "course_id": enrollment.course_id,
                    }),
                );
                AuditService::record(audit.as_ref(), &record).await;

                Self::submit_notice(tasks.as_ref(), &enrollment);

                invalidate::course_stats(cache.as_ref(), enrollment.course_id.into_inner()).await;
            }
            .instrument(Span::current()),
        )
    }

    /// Best-effort: a rejected submission is logged and counted.
    fn submit_notice(tasks: &dyn TaskSink, enrollment: &Enrollment) {
        let payload = match serde_json::to_value(EnrollmentNotice::from(enrollment)) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode enrollment notice");
                track_task_submit_failure(ENROLLMENT_NOTICE);
                return;
            }
        };

        match tasks.submit(ENROLLMENT_NOTICE, payload) {
            Ok(job_id) => debug!(job_id = %job_id, "Enrollment notice queued"),
            Err(e) => {
                warn!(error = %e, enrollment_id = %enrollment.id, "Failed to queue enrollment notice");
                track_task_submit_failure(ENROLLMENT_NOTICE);
            }
        }
    }
}
