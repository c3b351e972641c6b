use axum::{Router, routing::get};

use crate::modules::students::controller::{delete_student, get_student};
use crate::state::AppState;

pub fn init_students_router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_student).delete(delete_student))
}
