//! Retry settings for the enrollment workflow.
//!
//! - `ENROLL_RETRY_MAX_ATTEMPTS` (default 3)
//! - `ENROLL_RETRY_BASE_DELAY_MS` (default 50)
//! - `ENROLL_RETRY_MAX_DELAY_MS` (default 2000)

use std::time::Duration;

use slate_core::RetryPolicy;

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 50,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_or("ENROLL_RETRY_MAX_ATTEMPTS", defaults.max_attempts),
            base_delay_ms: env_or("ENROLL_RETRY_BASE_DELAY_MS", defaults.base_delay_ms),
            max_delay_ms: env_or("ENROLL_RETRY_MAX_DELAY_MS", defaults.max_delay_ms),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}
