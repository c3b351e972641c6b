mod common;

use slate::modules::audit::service::AuditService;
use slate::modules::courses::service::CourseService;
use slate::modules::enrollments::service::EnrollmentService;
use slate::modules::principals::service::PrincipalService;
use slate::modules::students::service::StudentService;
use slate_core::{ErrorCode, reasons};
use slate_db::SchoolStore;
use slate_models::{AuditQuery, CreateCourseDto, PrincipalId, Role, StudentId, actions};

use common::TestApp;

fn course_dto(code: &str, capacity: i32) -> CreateCourseDto {
    CreateCourseDto {
        code: code.to_string(),
        title: "World History".to_string(),
        capacity,
        class_group_id: None,
    }
}

#[tokio::test]
async fn test_soft_delete_hides_student() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let (_, student) = app.student().await;

    StudentService::soft_delete_student(&app.state, &admin, student.id)
        .await
        .unwrap();

    let stored = app.store.find_student(student.id).await.unwrap().unwrap();
    assert!(stored.deleted_at.is_some());
    assert_eq!(stored.deleted_by, Some(admin.id));

    let err = StudentService::get_student(&app.state, &admin, student.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = StudentService::soft_delete_student(&app.state, &admin, student.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);

    let deletions: Vec<_> = app
        .store
        .audit_records()
        .await
        .into_iter()
        .filter(|r| r.action == actions::STUDENT_SOFT_DELETED)
        .collect();
    assert_eq!(deletions.len(), 1);
    assert_eq!(deletions[0].target_id, Some(student.id.into_inner()));
}

#[tokio::test]
async fn test_soft_delete_requires_admin() {
    let app = TestApp::new();
    let staff = app.principal(Role::Staff).await;
    let (_, student) = app.student().await;

    let err = StudentService::soft_delete_student(&app.state, &staff, student.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let stored = app.store.find_student(student.id).await.unwrap().unwrap();
    assert!(stored.is_live());
}

#[tokio::test]
async fn test_student_reads_own_profile_only() {
    let app = TestApp::new();
    let (owner, profile) = app.student().await;
    let (_, other) = app.student().await;

    let fetched = StudentService::get_student(&app.state, &owner, profile.id)
        .await
        .unwrap();
    assert_eq!(fetched.id, profile.id);

    let err = StudentService::get_student(&app.state, &owner, other.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(err.reason, Some(reasons::NOT_OWNER));
}

#[tokio::test]
async fn test_unpermitted_role_cannot_tell_which_students_exist() {
    let app = TestApp::new();
    let teacher = app.principal(Role::Teacher).await;
    let (_, existing) = app.student().await;

    for student_id in [existing.id, StudentId::new()] {
        let err = StudentService::get_student(&app.state, &teacher, student_id)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.reason, Some(reasons::ROLE_NOT_PERMITTED));
    }
    let denials = app
        .store
        .audit_records()
        .await
        .into_iter()
        .filter(|r| r.action == actions::AUTHZ_DENIED)
        .count();
    assert_eq!(denials, 2);

    let admin = app.principal(Role::Admin).await;
    let err = StudentService::get_student(&app.state, &admin, StudentId::new())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_admin_promotes_teacher() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let teacher = app.principal(Role::Teacher).await;

    let updated = PrincipalService::change_role(&app.state, &admin, teacher.id, Role::Principal)
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Principal);

    let stored = app.store.find_principal(teacher.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Principal);

    let records = app.store.audit_records().await;
    let change = records
        .iter()
        .find(|r| r.action == actions::ROLE_CHANGED)
        .unwrap();
    assert_eq!(change.actor_id, Some(admin.id));
    assert_eq!(change.detail["from"], "teacher");
    assert_eq!(change.detail["to"], "principal");
}

#[tokio::test]
async fn test_admin_cannot_mint_super_admin() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let staff = app.principal(Role::Staff).await;

    let err = PrincipalService::change_role(&app.state, &admin, staff.id, Role::SuperAdmin)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(err.reason, Some(reasons::ROLE_CEILING));

    let stored = app.store.find_principal(staff.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Staff);
}

#[tokio::test]
async fn test_admin_cannot_demote_super_admin() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let root = app.principal(Role::SuperAdmin).await;

    let err = PrincipalService::change_role(&app.state, &admin, root.id, Role::Staff)
        .await
        .unwrap_err();
    assert_eq!(err.reason, Some(reasons::ROLE_CEILING));
}

#[tokio::test]
async fn test_super_admin_changes_any_role() {
    let app = TestApp::new();
    let root = app.principal(Role::SuperAdmin).await;
    let admin = app.principal(Role::Admin).await;

    let updated = PrincipalService::change_role(&app.state, &root, admin.id, Role::SuperAdmin)
        .await
        .unwrap();
    assert_eq!(updated.role, Role::SuperAdmin);
}

#[tokio::test]
async fn test_role_change_loses_to_concurrent_promotion() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let staff = app.principal(Role::Staff).await;

    // Promoted to SuperAdmin after the ceiling check read Staff.
    app.store.interleave_role_change(Role::SuperAdmin);
    let err = PrincipalService::change_role(&app.state, &admin, staff.id, Role::Teacher)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TransientStoreError);

    let stored = app.store.find_principal(staff.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::SuperAdmin);
    let records = app.store.audit_records().await;
    assert!(!records.iter().any(|r| r.action == actions::ROLE_CHANGED));
}

#[tokio::test]
async fn test_change_role_unknown_principal() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;

    let err = PrincipalService::change_role(&app.state, &admin, PrincipalId::new(), Role::Staff)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn test_create_course_and_duplicate_code() {
    let app = TestApp::new();
    let principal = app.principal(Role::Principal).await;

    let course = CourseService::create_course(&app.state, &principal, course_dto("ALG-101", 25))
        .await
        .unwrap();
    assert_eq!(course.capacity, 25);
    assert_eq!(course.enrollment_count, 0);
    assert!(course.is_active);

    let err = CourseService::create_course(&app.state, &principal, course_dto("ALG-101", 10))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Duplicate);

    let created = app
        .store
        .audit_records()
        .await
        .into_iter()
        .filter(|r| r.action == actions::COURSE_CREATED)
        .count();
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_teacher_cannot_create_course() {
    let app = TestApp::new();
    let teacher = app.principal(Role::Teacher).await;

    let err = CourseService::create_course(&app.state, &teacher, course_dto("BIO-200", 25))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
}

#[tokio::test]
async fn test_deactivation_keeps_enrollments() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let staff = app.principal(Role::Staff).await;
    let (_, first) = app.student().await;
    let (_, second) = app.student().await;
    let course = app.course(10).await;

    EnrollmentService::enroll(&app.state, &staff, first.id, course.id)
        .await
        .unwrap();

    let deactivated = CourseService::deactivate_course(&app.state, &admin, course.id)
        .await
        .unwrap();
    assert!(!deactivated.is_active);
    assert_eq!(deactivated.enrollment_count, 1);
    assert!(
        app.store
            .find_enrollment(first.id, course.id)
            .await
            .unwrap()
            .is_some()
    );

    let err = EnrollmentService::enroll(&app.state, &staff, second.id, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.reason, Some(reasons::COURSE_INACTIVE));

    let err = CourseService::deactivate_course(&app.state, &admin, course.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason, Some(reasons::COURSE_INACTIVE));
}

#[tokio::test]
async fn test_list_audit_is_gated_and_limited() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let teacher = app.principal(Role::Teacher).await;
    for code in ["A-1", "A-2", "A-3"] {
        CourseService::create_course(&app.state, &admin, course_dto(code, 5))
            .await
            .unwrap();
    }

    let err = AuditService::list_audit(&app.state, &teacher, AuditQuery::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);

    let query = AuditQuery {
        target_id: None,
        limit: Some(2),
    };
    let records = AuditService::list_audit(&app.state, &admin, query)
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].created_at >= records[1].created_at);
}

#[tokio::test]
async fn test_list_audit_by_target() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let course = CourseService::create_course(&app.state, &admin, course_dto("CHEM-1", 5))
        .await
        .unwrap();
    CourseService::create_course(&app.state, &admin, course_dto("CHEM-2", 5))
        .await
        .unwrap();
    CourseService::deactivate_course(&app.state, &admin, course.id)
        .await
        .unwrap();

    let query = AuditQuery {
        target_id: Some(course.id.into_inner()),
        limit: None,
    };
    let records = AuditService::list_audit(&app.state, &admin, query)
        .await
        .unwrap();
    let mut names: Vec<_> = records.iter().map(|r| r.action.as_str()).collect();
    names.sort();
    assert_eq!(names, vec![actions::COURSE_CREATED, actions::COURSE_DEACTIVATED]);
}
