//! Background task queue settings.
//!
//! A failed job is retried up to `TASK_MAX_ATTEMPTS` times in total with
//! exponential backoff starting at `TASK_RETRY_BASE_DELAY_MS`, capped at
//! `TASK_RETRY_MAX_DELAY_MS`.

use std::time::Duration;

use slate_core::RetryPolicy;

use crate::env_or;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskQueueConfig {
    pub capacity: usize,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
        }
    }
}

impl TaskQueueConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_or("TASK_QUEUE_CAPACITY", defaults.capacity).max(1),
            max_attempts: env_or("TASK_MAX_ATTEMPTS", defaults.max_attempts),
            base_delay_ms: env_or("TASK_RETRY_BASE_DELAY_MS", defaults.base_delay_ms),
            max_delay_ms: env_or("TASK_RETRY_MAX_DELAY_MS", defaults.max_delay_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff() {
        let policy = TaskQueueConfig::default().retry_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
    }
}
