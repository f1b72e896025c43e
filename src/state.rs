use std::sync::Arc;

use sqlx::PgPool;

use crate::db::attractions::PgAttractionRepo;
use crate::db::ratings::PgRatingRepo;
use crate::db::redis::RedisCache;
use crate::services::recommendations::RecommendationService;

/// Concrete recommendation service wired to Postgres and Redis
pub type Recommender = RecommendationService<PgRatingRepo, PgAttractionRepo, RedisCache>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

impl AppState {
    pub fn new(pool: PgPool, cache: RedisCache, recommendation_ttl_secs: u64) -> Self {
        let recommender = RecommendationService::new(
            PgRatingRepo::new(pool.clone()),
            PgAttractionRepo::new(pool),
            cache,
            recommendation_ttl_secs,
        );

        Self {
            recommender: Arc::new(recommender),
        }
    }
}
