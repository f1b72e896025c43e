mod cache;

pub use cache::{create_redis_client, CacheKey, RecommendationCache, RedisCache};

#[cfg(test)]
pub use cache::MockRecommendationCache;
