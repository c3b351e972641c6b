//! Cache key namespaces.
//!
//! Every namespace owns its key format and its TTL; callers never pick a TTL
//! ad hoc.

use std::time::Duration;

use tracing::warn;
use uuid::Uuid;

use crate::RedisCache;

const CACHE_PREFIX: &str = "slate";

fn build_key(parts: &[&str]) -> String {
    format!("{}:{}", CACHE_PREFIX, parts.join(":"))
}

/// Per-course enrollment statistics.
pub mod course_stats {
    use super::*;

    pub const NAMESPACE: &str = "course-stats";
    pub const TTL: Duration = Duration::from_secs(60);

    pub fn by_id(course_id: Uuid) -> String {
        build_key(&[NAMESPACE, &course_id.to_string()])
    }
}

/// Principals loaded by the auth extractor.
pub mod principals {
    use super::*;

    pub const NAMESPACE: &str = "principal";
    pub const TTL: Duration = Duration::from_secs(300);

    pub fn by_id(principal_id: Uuid) -> String {
        build_key(&[NAMESPACE, &principal_id.to_string()])
    }
}

/// Invalidation helpers. Failures are logged and swallowed: a stale entry
/// expires on its own TTL.
pub mod invalidate {
    use super::*;

    /// Call after any change to a course's seats or active flag.
    pub async fn course_stats(cache: Option<&RedisCache>, course_id: Uuid) {
        let Some(cache) = cache else { return };

        if let Err(e) = cache.invalidate(&course_stats::by_id(course_id)).await {
            warn!(error = %e, course_id = %course_id, "Failed to invalidate course stats cache");
        }
    }

    /// Call after a principal's role or active flag changes.
    pub async fn principal(cache: Option<&RedisCache>, principal_id: Uuid) {
        let Some(cache) = cache else { return };

        if let Err(e) = cache.invalidate(&principals::by_id(principal_id)).await {
            warn!(error = %e, principal_id = %principal_id, "Failed to invalidate principal cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_stats_key() {
        let id = Uuid::nil();
        let key = course_stats::by_id(id);
        assert_eq!(key, format!("slate:course-stats:{id}"));
    }

    #[test]
    fn test_namespace_ttls() {
        assert_eq!(course_stats::TTL, Duration::from_secs(60));
        assert_eq!(principals::TTL, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_invalidate_without_cache_is_noop() {
        invalidate::course_stats(None, Uuid::nil()).await;
        invalidate::principal(None, Uuid::nil()).await;
    }
}
