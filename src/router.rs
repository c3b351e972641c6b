use axum::http::{HeaderValue, Method};
use axum::{Json, Router, middleware, routing::get};
use serde_json::{Value, json};
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use slate_observability::{logging_middleware, metrics_middleware};

use crate::docs::ApiDoc;
use crate::middleware::rate_limit::rate_limit_envelope;
use crate::modules::audit::router::init_audit_router;
use crate::modules::courses::router::init_courses_router;
use crate::modules::enrollments::router::init_enrollments_router;
use crate::modules::principals::router::init_principals_router;
use crate::modules::students::router::init_students_router;
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn init_router(state: AppState) -> Router {
    let mut api = Router::new()
        .nest("/enrollments", init_enrollments_router())
        .nest("/courses", init_courses_router())
        .nest("/students", init_students_router())
        .nest("/principals", init_principals_router())
        .nest("/audit", init_audit_router());
    if let Some(limit) = state.rate_limit.clone() {
        api = api
            .layer(GovernorLayer::new(limit))
            .layer(middleware::map_response(rate_limit_envelope));
    }

    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api)
        .with_state(state.clone())
        .layer({
            let allowed_origins: Vec<HeaderValue> = state
                .cors_config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true)
        })
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
