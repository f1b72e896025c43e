use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::{Rating, UserRating};

/// Read access to the rating store. The recommender never writes ratings;
/// the one-rating-per-user-per-attraction invariant is enforced upstream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RatingRepo: Send + Sync {
    /// All ratings submitted by one user
    async fn find_by_user(&self, user_id: i64) -> AppResult<Vec<UserRating>>;

    /// Every rating in the system except the given user's own
    async fn find_all_except(&self, user_id: i64) -> AppResult<Vec<Rating>>;

    /// Ratings at or above `min_score` made by any of the given users
    async fn find_for_users(&self, user_ids: &[i64], min_score: f64) -> AppResult<Vec<Rating>>;
}

/// Postgres-backed rating reader
#[derive(Clone)]
pub struct PgRatingRepo {
    pool: PgPool,
}

impl PgRatingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RatingRepo for PgRatingRepo {
    async fn find_by_user(&self, user_id: i64) -> AppResult<Vec<UserRating>> {
        let ratings = sqlx::query_as::<_, UserRating>(
            "SELECT attraction_id, score FROM ratings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }

    async fn find_all_except(&self, user_id: i64) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT user_id, attraction_id, score, comment, created_at \
             FROM ratings WHERE user_id <> $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }

    async fn find_for_users(&self, user_ids: &[i64], min_score: f64) -> AppResult<Vec<Rating>> {
        let ratings = sqlx::query_as::<_, Rating>(
            "SELECT user_id, attraction_id, score, comment, created_at \
             FROM ratings WHERE user_id = ANY($1) AND score >= $2",
        )
        .bind(user_ids.to_vec())
        .bind(min_score)
        .fetch_all(&self.pool)
        .await?;

        Ok(ratings)
    }
}
