use axum::{Router, routing::get};

use crate::modules::audit::controller::list_audit;
use crate::state::AppState;

pub fn init_audit_router() -> Router<AppState> {
    Router::new().route("/", get(list_audit))
}
