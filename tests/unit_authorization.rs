mod common;

use slate::authz::{Decision, PermissionMatrix};
use slate::state::load_permission_matrix;
use slate_core::{ErrorCode, reasons};
use slate_db::SchoolStore;
use slate_models::{Action, PermissionRule, ResourceType, Role, actions};

use common::TestApp;

#[tokio::test]
async fn test_missing_rule_is_configuration_error_for_everyone() {
    let app = TestApp::new();
    for role in Role::ALL {
        let principal = app.principal(role).await;
        let err = app
            .state
            .authz
            .authorize(&principal, ResourceType::Invoice, Action::Special, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigurationError, "role {role}");
    }
    // Configuration errors are not decisions and are never audited.
    assert!(app.store.audit_records().await.is_empty());
}

#[tokio::test]
async fn test_role_outside_rule_is_denied_and_audited_once() {
    let app = TestApp::new();
    let teacher = app.principal(Role::Teacher).await;

    let decision = app
        .state
        .authz
        .authorize(&teacher, ResourceType::Enrollment, Action::Create, None)
        .await
        .unwrap();

    assert_eq!(
        decision,
        Decision::Deny {
            reason: reasons::ROLE_NOT_PERMITTED
        }
    );
    let records = app.store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, actions::AUTHZ_DENIED);
    assert_eq!(records[0].detail["outcome"], "denied");
    assert_eq!(records[0].detail["action"], "create");
}

#[tokio::test]
async fn test_listed_roles_only() {
    let app = TestApp::new();
    let rule = PermissionMatrix::school_defaults()
        .rule(ResourceType::Enrollment, Action::Create)
        .unwrap()
        .clone();

    for role in Role::ALL.into_iter().filter(|r| !r.is_super_admin()) {
        let principal = app.principal(role).await;
        let decision = app
            .state
            .authz
            .evaluate(&principal, ResourceType::Enrollment, Action::Create, None)
            .unwrap();
        assert_eq!(decision.is_allowed(), rule.allows(role), "role {role}");
    }
}

#[tokio::test]
async fn test_super_admin_bypass_is_audited() {
    let app = TestApp::new();
    let root = app.principal(Role::SuperAdmin).await;

    // SuperAdmin is not listed on the rule.
    let decision = app
        .state
        .authz
        .authorize(&root, ResourceType::Student, Action::Delete, None)
        .await
        .unwrap();

    assert_eq!(decision, Decision::Allow { bypass: true });
    let records = app.store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, actions::AUTHZ_BYPASS);
    assert_eq!(records[0].actor_id, Some(root.id));
}

#[tokio::test]
async fn test_student_reads_only_own_profile() {
    let app = TestApp::new();
    let (owner, profile) = app.student().await;
    let (other, _) = app.student().await;

    let own = app
        .state
        .authz
        .authorize(&owner, ResourceType::Student, Action::Read, Some(&profile))
        .await
        .unwrap();
    assert_eq!(own, Decision::Allow { bypass: false });

    let foreign = app
        .state
        .authz
        .authorize(&other, ResourceType::Student, Action::Read, Some(&profile))
        .await
        .unwrap();
    assert_eq!(
        foreign,
        Decision::Deny {
            reason: reasons::NOT_OWNER
        }
    );

    let records = app.store.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].target_id, Some(profile.id.into_inner()));
}

#[tokio::test]
async fn test_admin_overrides_ownership() {
    let app = TestApp::new();
    let admin = app.principal(Role::Admin).await;
    let (_, profile) = app.student().await;

    let decision = app
        .state
        .authz
        .authorize(&admin, ResourceType::Student, Action::Read, Some(&profile))
        .await
        .unwrap();
    assert_eq!(decision, Decision::Allow { bypass: false });
}

#[tokio::test]
async fn test_ownership_rule_without_target() {
    let app = TestApp::new();
    let (owner, _) = app.student().await;

    let err = app
        .state
        .authz
        .authorize(&owner, ResourceType::Student, Action::Read, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);
}

#[tokio::test]
async fn test_principal_owns_itself() {
    let matrix = PermissionMatrix::from_rules([PermissionRule::new(
        ResourceType::Principal,
        Action::Read,
        Role::ALL,
    )
    .owned()])
    .unwrap();
    let app = TestApp::with_matrix(matrix);
    let teacher = app.principal(Role::Teacher).await;
    let staff = app.principal(Role::Staff).await;

    let authz = &app.state.authz;
    assert!(
        authz
            .evaluate(&teacher, ResourceType::Principal, Action::Read, Some(&teacher))
            .unwrap()
            .is_allowed()
    );
    assert!(
        !authz
            .evaluate(&staff, ResourceType::Principal, Action::Read, Some(&teacher))
            .unwrap()
            .is_allowed()
    );
}

#[tokio::test]
async fn test_inactive_principal_denied() {
    let app = TestApp::new();
    let mut admin = app.principal(Role::Admin).await;
    admin.is_active = false;

    let err = app
        .state
        .authz
        .require(&admin, ResourceType::Course, Action::Create, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionDenied);
    assert_eq!(err.reason, Some(reasons::PRINCIPAL_INACTIVE));
}

#[tokio::test]
async fn test_empty_rule_table_loads_defaults() {
    let app = TestApp::new();
    let matrix = load_permission_matrix(app.store.as_ref()).await.unwrap();
    assert_eq!(matrix.len(), PermissionMatrix::school_defaults().len());
}

#[tokio::test]
async fn test_stored_rules_replace_defaults() {
    let app = TestApp::new();
    let mut rules: Vec<PermissionRule> = PermissionMatrix::school_defaults()
        .rules()
        .into_iter()
        .filter(|rule| rule.resource_type != ResourceType::Enrollment)
        .cloned()
        .collect();
    rules.push(PermissionRule::new(
        ResourceType::Enrollment,
        Action::Create,
        [Role::Teacher],
    ));
    rules.push(PermissionRule::new(
        ResourceType::Grade,
        Action::Update,
        [Role::Teacher],
    ));
    app.store.replace_permission_rules(&rules).await.unwrap();

    let matrix = load_permission_matrix(app.store.as_ref()).await.unwrap();
    assert_eq!(matrix.len(), PermissionMatrix::school_defaults().len() + 1);
    let enroll = matrix.rule(ResourceType::Enrollment, Action::Create).unwrap();
    assert!(enroll.allows(Role::Teacher));
    assert!(!enroll.allows(Role::Staff));
}

#[tokio::test]
async fn test_stored_rules_missing_a_used_pair_fail_startup() {
    let app = TestApp::new();
    app.store
        .replace_permission_rules(&[PermissionRule::new(
            ResourceType::Enrollment,
            Action::Create,
            [Role::Teacher],
        )])
        .await
        .unwrap();

    let err = load_permission_matrix(app.store.as_ref()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigurationError);
    assert!(err.error.to_string().contains("(principal, update)"));
}

#[tokio::test]
async fn test_ambiguous_stored_rules_rejected() {
    let app = TestApp::new();
    let rule = PermissionRule::new(ResourceType::Grade, Action::Update, [Role::Teacher]);
    app.store
        .replace_permission_rules(&[rule.clone(), rule])
        .await
        .unwrap();

    let err = load_permission_matrix(app.store.as_ref()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ConfigurationError);
}
