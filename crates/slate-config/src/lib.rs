//! # Slate Config
//!
//! Configuration types for the Slate API, loaded from environment variables.
//!
//! - [`jwt`]: JWT authentication configuration
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`retry`]: enrollment retry policy
//! - [`tasks`]: background task queue sizing and retry policy
//! - [`server`]: listen port
//! - [`rate_limit`]: per-client request rate limit on `/api`
//!
//! # Example
//!
//! ```ignore
//! use slate_config::{CorsConfig, JwtConfig, RetryConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let enroll_retry = RetryConfig::from_env().policy();
//! ```

pub mod cors;
pub mod jwt;
pub mod rate_limit;
pub mod retry;
pub mod server;
pub mod tasks;

pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use rate_limit::{IpRateLimit, RateLimitConfig};
pub use retry::RetryConfig;
pub use server::ServerConfig;
pub use tasks::TaskQueueConfig;

/// Reads and parses an environment variable, falling back to `default` when
/// the variable is unset or malformed.
pub(crate) fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
