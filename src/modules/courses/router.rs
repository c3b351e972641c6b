use axum::{
    Router,
    routing::{patch, post},
};

use crate::modules::courses::controller::{create_course, deactivate_course};
use crate::modules::enrollments::router::init_course_enrollments_router;
use crate::state::AppState;

pub fn init_courses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course))
        .route("/{course_id}/deactivate", patch(deactivate_course))
        .nest("/{course_id}", init_course_enrollments_router())
}
