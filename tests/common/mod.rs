#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use slate::authz::PermissionMatrix;
use slate::router::init_router;
use slate::state::AppState;
use slate_auth::create_access_token;
use slate_config::{JwtConfig, RateLimitConfig};
use slate_core::RetryPolicy;
use slate_db::{MemoryStore, SchoolStore};
use slate_models::{
    ClassGroupId, Course, CourseId, CreateCourseDto, NewPrincipal, NewStudentProfile, Principal,
    PrincipalId, Role, StudentId, StudentProfile,
};
use slate_tasks::RecordingSink;

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-at-least-32-characters-long".to_string(),
        access_token_expiry: 3600,
    }
}

/// Retry policy with millisecond delays so retry tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5))
}

/// Application state over an in-memory store and a recording task sink.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub tasks: Arc<RecordingSink>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(MemoryStore::new(), PermissionMatrix::school_defaults())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self::build(store, PermissionMatrix::school_defaults())
    }

    pub fn with_matrix(matrix: PermissionMatrix) -> Self {
        Self::build(MemoryStore::new(), matrix)
    }

    fn build(store: MemoryStore, matrix: PermissionMatrix) -> Self {
        let store = Arc::new(store);
        let tasks = Arc::new(RecordingSink::new());
        let state = AppState::new(
            store.clone(),
            store.clone(),
            tasks.clone(),
            matrix,
            jwt_config(),
        )
        .with_enroll_retry(fast_retry());

        Self {
            store,
            tasks,
            state,
        }
    }

    /// Every router built afterwards shares one limiter.
    pub fn with_rate_limit(mut self, config: &RateLimitConfig) -> Self {
        self.state = self.state.with_rate_limit(config).unwrap();
        self
    }

    pub fn router(&self) -> Router {
        init_router(self.state.clone())
    }

    pub fn token(&self, principal: &Principal) -> String {
        create_access_token(principal, &self.state.jwt_config).unwrap()
    }

    pub async fn principal(&self, role: Role) -> Principal {
        let principal = new_principal(role);
        self.store.insert_principal(&principal).await.unwrap();
        principal
    }

    pub async fn principal_with_id(&self, id: u128, role: Role) -> Principal {
        let mut principal = new_principal(role);
        principal.id = PrincipalId::from_u128(id);
        self.store.insert_principal(&principal).await.unwrap();
        principal
    }

    /// A live, active student profile linked to a new Student principal.
    pub async fn student(&self) -> (Principal, StudentProfile) {
        self.student_in_group(None).await
    }

    pub async fn student_in_group(
        &self,
        class_group_id: Option<ClassGroupId>,
    ) -> (Principal, StudentProfile) {
        let owner = self.principal(Role::Student).await;
        let profile = NewStudentProfile {
            student_number: unique("S"),
            principal_id: owner.id,
            class_group_id,
        }
        .into_profile();
        self.store.insert_student(&profile).await.unwrap();
        (owner, profile)
    }

    pub async fn student_with_id(&self, id: u128) -> StudentProfile {
        let owner = self.principal(Role::Student).await;
        let mut profile = NewStudentProfile {
            student_number: format!("S{id}"),
            principal_id: owner.id,
            class_group_id: None,
        }
        .into_profile();
        profile.id = StudentId::from_u128(id);
        self.store.insert_student(&profile).await.unwrap();
        profile
    }

    pub async fn course(&self, capacity: i32) -> Course {
        let course = new_course(capacity);
        self.store.insert_course(&course).await.unwrap();
        course
    }

    pub async fn course_for_group(&self, capacity: i32, group: ClassGroupId) -> Course {
        let mut course = new_course(capacity);
        course.class_group_id = Some(group);
        self.store.insert_course(&course).await.unwrap();
        course
    }

    /// Inserts a course whose counter already reflects `enrolled` seats taken.
    pub async fn course_with(&self, id: u128, capacity: i32, enrolled: i32) -> Course {
        let mut course = new_course(capacity);
        course.id = CourseId::from_u128(id);
        course.enrollment_count = enrolled;
        self.store.insert_course(&course).await.unwrap();
        course
    }
}

fn unique(prefix: &str) -> String {
    format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..8])
}

pub fn new_principal(role: Role) -> Principal {
    let email: String = SafeEmail().fake();
    NewPrincipal {
        email: format!("{}.{email}", unique("p")),
        display_name: Name().fake(),
        role,
        profile_id: None,
    }
    .into_principal()
}

pub fn new_course(capacity: i32) -> Course {
    CreateCourseDto {
        code: unique("C"),
        title: "Introduction to Algebra".to_string(),
        capacity,
        class_group_id: None,
    }
    .into_course()
}

pub async fn send(app: Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
