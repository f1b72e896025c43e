use std::fmt::Display;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use redis::{AsyncCommands, Client};

use crate::error::{AppError, AppResult};
use crate::models::RecommendationResponse;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Cached recommendation response for one user
    Recommendations(i64),
    /// Hash of per-attraction feedback flags for one user
    Feedback(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations(user_id) => write!(f, "recommendations:{}", user_id),
            CacheKey::Feedback(user_id) => write!(f, "recommendation_feedback:{}", user_id),
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Time-expiring store for computed recommendation responses.
///
/// The cache is an optimization, never a source of truth: callers treat any
/// error from these methods as a miss and fall through to full computation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RecommendationCache: Send + Sync {
    /// Returns the cached response for a user, or `None` on a miss
    async fn get(&self, user_id: i64) -> AppResult<Option<RecommendationResponse>>;

    /// Stores a response with an expiry, overwriting any prior entry
    async fn put(
        &self,
        user_id: i64,
        response: &RecommendationResponse,
        ttl_secs: u64,
    ) -> AppResult<()>;

    /// Removes the user's entry immediately
    async fn invalidate(&self, user_id: i64) -> AppResult<()>;

    /// Records a per-attraction helpful/unhelpful flag for the user
    async fn record_feedback(
        &self,
        user_id: i64,
        attraction_id: i64,
        is_helpful: bool,
    ) -> AppResult<()>;
}

/// Redis-backed recommendation cache
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecommendationCache for RedisCache {
    async fn get(&self, user_id: i64) -> AppResult<Option<RecommendationResponse>> {
        let key = CacheKey::Recommendations(user_id).to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let cached: Option<String> = conn.get(&key).await?;

        match cached {
            Some(json) => {
                let response = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(response))
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        user_id: i64,
        response: &RecommendationResponse,
        ttl_secs: u64,
    ) -> AppResult<()> {
        let key = CacheKey::Recommendations(user_id).to_string();
        let json = serde_json::to_string(response)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(&key, json, ttl_secs).await?;

        tracing::debug!(user_id, ttl_secs, "Cached recommendations");

        Ok(())
    }

    async fn invalidate(&self, user_id: i64) -> AppResult<()> {
        let key = CacheKey::Recommendations(user_id).to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(&key).await?;

        tracing::debug!(user_id, "Invalidated cached recommendations");

        Ok(())
    }

    async fn record_feedback(
        &self,
        user_id: i64,
        attraction_id: i64,
        is_helpful: bool,
    ) -> AppResult<()> {
        let key = CacheKey::Feedback(user_id).to_string();
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let flag = if is_helpful { "1" } else { "0" };
        let _: () = conn.hset(&key, attraction_id, flag).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_recommendations() {
        let key = CacheKey::Recommendations(42);
        assert_eq!(format!("{}", key), "recommendations:42");
    }

    #[test]
    fn test_cache_key_display_feedback() {
        let key = CacheKey::Feedback(42);
        assert_eq!(format!("{}", key), "recommendation_feedback:42");
    }
}
