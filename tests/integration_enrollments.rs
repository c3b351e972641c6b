mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use slate::modules::enrollments::service::EnrollmentService;
use slate::notifications::ENROLLMENT_NOTICE;
use slate_core::{ErrorCode, reasons};
use slate_db::{MemoryStore, SchoolStore};
use slate_models::{ClassGroupId, CourseId, Role, StudentId, StudentStatus, actions};

use common::TestApp;

#[tokio::test]
async fn test_teacher_cannot_enroll() {
    let app = TestApp::new();
    let teacher = app.principal_with_id(7, Role::Teacher).await;
    let student = app.student_with_id(42).await;
    let course = app.course_with(9, 30, 29).await;

    let err = EnrollmentService::enroll(&app.state, &teacher, student.id, course.id)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(err.reason, Some(reasons::ROLE_NOT_PERMITTED));
    assert!(app.store.enrollments_for_course(course.id).await.is_empty());
    let course = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(course.enrollment_count, 29);
    assert!(app.tasks.jobs().is_empty());

    let records = app.store.audit_records().await;
    assert!(records.iter().all(|r| r.action != actions::STUDENT_ENROLLED));
}

#[tokio::test]
async fn test_staff_fills_last_seat() {
    let app = TestApp::new();
    let staff = app.principal_with_id(7, Role::Staff).await;
    let student = app.student_with_id(42).await;
    let course = app.course_with(9, 30, 29).await;

    let enrollment = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap();

    assert_eq!(enrollment.student_id, StudentId::from_u128(42));
    assert_eq!(enrollment.course_id, CourseId::from_u128(9));
    assert_eq!(enrollment.enrolled_by, staff.id);

    let stored = app.store.find_enrollment(student.id, course.id).await.unwrap();
    assert_eq!(stored, Some(enrollment.clone()));
    let course = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(course.enrollment_count, 30);

    let records = app.store.audit_records().await;
    let enrolled: Vec<_> = records
        .iter()
        .filter(|r| r.action == actions::STUDENT_ENROLLED)
        .collect();
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].target_id, Some(enrollment.id.into_inner()));
    assert_eq!(enrolled[0].actor_id, Some(staff.id));

    let jobs = app.tasks.jobs_named(ENROLLMENT_NOTICE);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].payload["student_id"], student.id.to_string());
}

#[tokio::test]
async fn test_full_course_rejects_next_student() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let student = app.student_with_id(43).await;
    let course = app.course_with(9, 30, 30).await;

    let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.reason, Some(reasons::COURSE_AT_CAPACITY));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_commits_once() {
    let app = Arc::new(TestApp::new());
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(10).await;
    let (student_id, course_id) = (student.id, course.id);

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            let staff = staff.clone();
            tokio::spawn(async move {
                EnrollmentService::enroll(&app.state, &staff, student_id, course_id).await
            })
        })
        .collect();

    let mut committed = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert_eq!(e.code, ErrorCode::Duplicate),
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 1);
    let course = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(course.enrollment_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_seat_race() {
    let app = Arc::new(TestApp::new());
    let staff = app.principal(Role::Staff).await;
    let (_, first) = app.student().await;
    let (_, second) = app.student().await;
    let course = app.course(1).await;
    let course_id = course.id;

    let handles: Vec<_> = [first.id, second.id]
        .into_iter()
        .map(|student_id| {
            let app = app.clone();
            let staff = staff.clone();
            tokio::spawn(async move {
                EnrollmentService::enroll(&app.state, &staff, student_id, course_id).await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.into_iter().find_map(Result::err).unwrap();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.reason, Some(reasons::COURSE_AT_CAPACITY));

    let course = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(course.enrollment_count, 1);
}

#[tokio::test]
async fn test_notification_failure_keeps_enrollment() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    app.tasks.set_rejecting(true);

    let enrollment = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap();

    assert!(
        app.store
            .find_enrollment(student.id, course.id)
            .await
            .unwrap()
            .is_some()
    );
    assert!(app.tasks.jobs().is_empty());
    let records = app.store.audit_records().await;
    assert!(
        records
            .iter()
            .any(|r| r.target_id == Some(enrollment.id.into_inner()))
    );
}

#[tokio::test]
async fn test_audit_failure_keeps_enrollment() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    app.store.set_audit_failure(true);

    EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap();

    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 1);
    // The notice still goes out after a failed audit write.
    assert_eq!(app.tasks.jobs_named(ENROLLMENT_NOTICE).len(), 1);
}

#[tokio::test]
async fn test_soft_deleted_student_not_found() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let admin = app.principal(Role::Admin).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    app.store.soft_delete_student(student.id, admin.id).await.unwrap();

    let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_graduated_student_rejected() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let mut student = app.student_with_id(77).await;
    student.id = StudentId::from_u128(78);
    student.student_number = "S78".to_string();
    student.status = StudentStatus::Graduated;
    app.store.insert_student(&student).await.unwrap();
    let course = app.course(5).await;

    let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.reason, Some(reasons::STUDENT_INACTIVE));
}

#[tokio::test]
async fn test_group_course_admits_only_its_class_group() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let group = ClassGroupId::new();
    let course = app.course_for_group(5, group).await;
    let (_, outsider) = app.student_in_group(Some(ClassGroupId::new())).await;
    let (_, ungrouped) = app.student().await;
    let (_, member) = app.student_in_group(Some(group)).await;

    for student in [&outsider, &ungrouped] {
        let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.reason, Some(reasons::CLASS_GROUP_MISMATCH));
    }
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 0);

    EnrollmentService::enroll(&app.state, &staff, member.id, course.id)
        .await
        .unwrap();
    let stored = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(stored.enrollment_count, 1);
}

#[tokio::test]
async fn test_class_group_checked_before_capacity() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let course = app.course_for_group(0, ClassGroupId::new()).await;
    let (_, student) = app.student().await;

    let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason, Some(reasons::CLASS_GROUP_MISMATCH));
}

#[tokio::test]
async fn test_unknown_course_not_found() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;

    let err = EnrollmentService::enroll(&app.state, &staff, student.id, CourseId::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_duplicate_enrollment() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;

    EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap();
    let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Duplicate);
    let course = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(course.enrollment_count, 1);
    assert_eq!(app.tasks.jobs().len(), 1);
}

#[tokio::test]
async fn test_retry_recovers_from_transient_errors() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    app.store.inject_transient_failures(2);

    let enrollment =
        EnrollmentService::enroll_with_retry(&app.state, &staff, student.id, course.id)
            .await
            .unwrap();

    assert_eq!(enrollment.course_id, course.id);
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_retry_budget_exhausted() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    app.store.inject_transient_failures(10);

    let err = EnrollmentService::enroll_with_retry(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::TransientStoreError);
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_plain_enroll_does_not_retry() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    app.store.inject_transient_failures(1);

    let err = EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_retry_stops_on_duplicate() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;

    EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap();
    let err = EnrollmentService::enroll_with_retry(&app.state, &staff, student.id, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Duplicate);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_commit_leaves_no_trace() {
    let app = TestApp::with_store(MemoryStore::new().with_commit_delay(Duration::from_secs(5)));
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        })
    };

    let err = EnrollmentService::enroll_cancellable(
        &app.state,
        &staff,
        student.id,
        course.id,
        &cancel,
    )
    .await
    .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err.code, ErrorCode::Cancelled);
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 0);
    let course = app.store.find_course(course.id).await.unwrap().unwrap();
    assert_eq!(course.enrollment_count, 0);
    assert!(app.tasks.jobs().is_empty());
}

#[tokio::test]
async fn test_cancel_after_commit_keeps_enrollment() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(5).await;
    let cancel = CancellationToken::new();

    EnrollmentService::enroll_cancellable(&app.state, &staff, student.id, course.id, &cancel)
        .await
        .unwrap();
    cancel.cancel();

    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 1);
    assert_eq!(app.tasks.jobs_named(ENROLLMENT_NOTICE).len(), 1);
}

#[tokio::test]
async fn test_bulk_enroll_collects_failures() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, first) = app.student().await;
    let (_, second) = app.student().await;
    let (_, third) = app.student().await;
    let course = app.course(2).await;

    EnrollmentService::enroll(&app.state, &staff, first.id, course.id)
        .await
        .unwrap();

    let missing = StudentId::new();
    let outcome = EnrollmentService::bulk_enroll(
        &app.state,
        &staff,
        course.id,
        &[first.id, second.id, missing, third.id],
    )
    .await
    .unwrap();

    assert_eq!(outcome.enrolled_count(), 1);
    assert_eq!(outcome.enrolled[0].student_id, second.id);

    let codes: Vec<_> = outcome
        .failed
        .iter()
        .map(|f| (f.student_id, f.code.as_str(), f.reason.as_deref()))
        .collect();
    assert_eq!(
        codes,
        vec![
            (first.id, "DUPLICATE", None),
            (missing, "NOT_FOUND", None),
            (third.id, "VALIDATION_ERROR", Some("course_at_capacity")),
        ]
    );
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_bulk_enroll_requires_permission() {
    let app = TestApp::new();
    let teacher = app.principal(Role::Teacher).await;
    let (_, student) = app.student().await;
    let course = app.course(2).await;

    let err = EnrollmentService::bulk_enroll(&app.state, &teacher, course.id, &[student.id])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(app.store.count_enrollments(course.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_enrollment_stats() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;
    let course = app.course(3).await;

    EnrollmentService::enroll(&app.state, &staff, student.id, course.id)
        .await
        .unwrap();

    let stats = EnrollmentService::enrollment_stats(&app.state, &staff, course.id)
        .await
        .unwrap();
    assert_eq!(stats.capacity, 3);
    assert_eq!(stats.enrollment_count, 1);
    assert_eq!(stats.available_seats, 2);
    assert!(!stats.is_full);

    let (student_principal, _) = app.student().await;
    let err = EnrollmentService::enrollment_stats(&app.state, &student_principal, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
}
