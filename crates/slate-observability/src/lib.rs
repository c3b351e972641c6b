//! Slate Observability
//!
//! - structured logging to the console and daily-rolling files
//! - distributed tracing through OpenTelemetry (OTLP)
//! - Prometheus metrics, HTTP middleware and business counters
//!
//! Compiled in through the `observability` feature (on by default) and
//! switched off at runtime with `OBSERVABILITY_ENABLED=false`. With either
//! off, [`init_tracing`] still installs a console logger and every
//! `track_*` helper is a no-op.
//!
//! ```no_run
//! use slate_observability::{init_tracing, shutdown_tracer};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing();
//!     // ... application code ...
//!     shutdown_tracer().await;
//! }
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

use std::sync::OnceLock;

pub use basic_logging::init_basic_console_logging;

#[cfg(feature = "observability")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, logging_middleware, shutdown_tracer};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, metrics_middleware, metrics_router, track_audit_write_failure,
    track_authorization_check, track_enrollment, track_task_submit_failure,
};

/// Installs the Prometheus recorder and returns the `GET /metrics` router,
/// or `None` when metrics are disabled.
#[cfg(feature = "observability")]
pub fn init_metrics_routes() -> Option<axum::Router> {
    init_metrics().map(metrics_router)
}

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Reads `OBSERVABILITY_ENABLED` once; anything but `false`/`0` enables it.
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        cfg!(feature = "observability")
            && std::env::var("OBSERVABILITY_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true)
    })
}

#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{extract::Request, middleware::Next, response::Response};

    pub async fn logging_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub fn init_tracing() {
        super::init_basic_console_logging();
    }

    pub async fn shutdown_tracer() {}

    pub fn init_metrics() -> Option<()> {
        None
    }

    pub fn init_metrics_routes() -> Option<axum::Router> {
        None
    }

    pub fn track_authorization_check(_role: &str, _outcome: &str) {}
    pub fn track_enrollment(_outcome: &str) {}
    pub fn track_audit_write_failure(_action: &str) {}
    pub fn track_task_submit_failure(_job: &str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
