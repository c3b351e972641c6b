//! Redis cache client.
//!
//! Values are stored as JSON strings. Read failures degrade to a miss; write
//! failures are returned so callers can log them.

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RedisCache {
    pub async fn new(redis_url: &str, default_ttl: Duration) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self { conn, default_ttl })
    }

    /// Returns `None` on a miss, a Redis error, or an undecodable value.
    #[instrument(skip(self), fields(cache.operation = "GET"))]
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!(cache.key = %key, "Cache hit");
                serde_json::from_str(&value)
                    .inspect_err(|e| {
                        error!(cache.key = %key, error = %e, "Failed to deserialize cached value");
                    })
                    .ok()
            }
            Ok(None) => {
                debug!(cache.key = %key, "Cache miss");
                None
            }
            Err(e) => {
                error!(cache.key = %key, error = %e, "Redis GET error");
                None
            }
        }
    }

    #[instrument(skip(self, value), fields(cache.operation = "SET"))]
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    #[instrument(skip(self, value), fields(cache.operation = "SETEX"))]
    pub async fn set_with_ttl<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(value)?;

        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs().max(1))
            .await?;

        debug!(cache.key = %key, cache.ttl_secs = %ttl.as_secs(), "Cache set");

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();

        conn.del::<_, ()>(key).await?;

        debug!(cache.key = %key, "Cache invalidated");

        Ok(())
    }
}
