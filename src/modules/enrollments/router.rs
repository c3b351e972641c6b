use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::enrollments::controller::{bulk_enroll, course_stats, enroll_student};
use crate::state::AppState;

pub fn init_enrollments_router() -> Router<AppState> {
    Router::new().route("/", post(enroll_student))
}

/// Routes nested under `/courses/{course_id}`.
pub fn init_course_enrollments_router() -> Router<AppState> {
    Router::new()
        .route("/enrollments/bulk", post(bulk_enroll))
        .route("/stats", get(course_stats))
}
