//! # Slate Cache
//!
//! Redis-based caching for the Slate API.
//!
//! - [`RedisCache`]: connection-managed client with JSON values
//! - [`CacheConfig`]: connection settings from the environment
//! - [`keys`]: key namespaces, each with its own TTL, plus invalidation helpers
//!
//! The cache is always optional: services take `Option<&RedisCache>` and
//! behave identically (minus the speedup) when it is `None`.
//!
//! # Example
//!
//! ```ignore
//! use slate_cache::{CacheConfig, RedisCache, keys::course_stats};
//!
//! let config = CacheConfig::from_env();
//! let cache = RedisCache::new(&config.redis_url, config.default_ttl()).await?;
//! cache.set_with_ttl(&course_stats::by_id(course_id), &stats, course_stats::TTL).await?;
//! ```

pub mod config;
pub mod keys;
pub mod redis;

pub use config::CacheConfig;
pub use keys::invalidate;
pub use redis::{CacheError, RedisCache};
