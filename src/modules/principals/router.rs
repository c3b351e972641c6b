use axum::{Router, routing::patch};

use crate::modules::principals::controller::change_role;
use crate::state::AppState;

pub fn init_principals_router() -> Router<AppState> {
    Router::new().route("/{id}/role", patch(change_role))
}
