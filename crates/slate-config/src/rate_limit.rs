//! Per-client rate limit for the `/api` routes.
//!
//! Token bucket keyed by client IP: one token is replenished every
//! `period_ms`, at most `burst_size` accumulate, and a request with no token
//! left is rejected with `429 RATE_LIMIT_EXCEEDED`. The client IP comes from
//! `X-Forwarded-For`, `X-Real-IP` or `Forwarded`, falling back to the peer
//! address.
//!
//! - `RATE_LIMIT_ENABLED` (default true)
//! - `RATE_LIMIT_PERIOD_MS` (default 500)
//! - `RATE_LIMIT_BURST_SIZE` (default 30)

use governor::middleware::NoOpMiddleware;
use slate_core::AppError;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;

use crate::env_or;

pub type IpRateLimit = GovernorConfig<SmartIpKeyExtractor, NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Interval after which one request token is replenished.
    pub period_ms: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period_ms: 500,
            burst_size: 30,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("RATE_LIMIT_ENABLED", defaults.enabled),
            period_ms: env_or("RATE_LIMIT_PERIOD_MS", defaults.period_ms),
            burst_size: env_or("RATE_LIMIT_BURST_SIZE", defaults.burst_size),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Builds the limiter. A zero period or burst size is a configuration error.
    pub fn governor_config(&self) -> Result<IpRateLimit, AppError> {
        GovernorConfigBuilder::default()
            .per_millisecond(self.period_ms)
            .burst_size(self.burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "invalid rate limit: period {}ms, burst {}",
                    self.period_ms, self.burst_size
                ))
            })
    }
}
