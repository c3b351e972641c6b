//! Redis cache configuration.

use std::env;
use std::time::Duration;

/// # Environment Variables
///
/// - `REDIS_URL`: Redis connection URL (default: `redis://127.0.0.1:6379`)
/// - `CACHE_TTL_SECONDS`: TTL for keys outside a namespace (default: `300`)
/// - `CACHE_ENABLED`: set to `false` to run without Redis (default: `true`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub redis_url: String,
    pub default_ttl_seconds: u64,
    pub enabled: bool,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            default_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_seconds),
            enabled: env::var("CACHE_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.enabled),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            default_ttl_seconds: 300,
            enabled: true,
        }
    }
}
