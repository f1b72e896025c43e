use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::Attraction;

const ATTRACTION_COLUMNS: &str =
    "id, name, description, city, tags, average_rating, visit_count, status";

/// Read access to the attraction catalog
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AttractionRepo: Send + Sync {
    /// Looks up a single attraction regardless of status
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Attraction>>;

    /// Fetches the active attractions among the given ids
    async fn find_active_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Attraction>>;

    /// Most popular active attractions, optionally restricted to one city,
    /// ordered by average rating then visit count
    async fn find_popular(&self, city: Option<String>, limit: i64) -> AppResult<Vec<Attraction>>;

    /// Active attractions sharing any of the given tags or cities, excluding
    /// the given ids, ordered by average rating
    async fn find_by_tags_or_city(
        &self,
        tags: &[String],
        cities: &[String],
        exclude_ids: &[i64],
        limit: i64,
    ) -> AppResult<Vec<Attraction>>;
}

/// Postgres-backed attraction reader
#[derive(Clone)]
pub struct PgAttractionRepo {
    pool: PgPool,
}

impl PgAttractionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttractionRepo for PgAttractionRepo {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Attraction>> {
        let attraction = sqlx::query_as::<_, Attraction>(&format!(
            "SELECT {ATTRACTION_COLUMNS} FROM attractions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(attraction)
    }

    async fn find_active_by_ids(&self, ids: &[i64]) -> AppResult<Vec<Attraction>> {
        let attractions = sqlx::query_as::<_, Attraction>(&format!(
            "SELECT {ATTRACTION_COLUMNS} FROM attractions \
             WHERE id = ANY($1) AND status = 'active'"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(attractions)
    }

    async fn find_popular(&self, city: Option<String>, limit: i64) -> AppResult<Vec<Attraction>> {
        let attractions = sqlx::query_as::<_, Attraction>(&format!(
            "SELECT {ATTRACTION_COLUMNS} FROM attractions \
             WHERE status = 'active' AND ($1::text IS NULL OR city = $1) \
             ORDER BY average_rating DESC, visit_count DESC \
             LIMIT $2"
        ))
        .bind(city)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(attractions)
    }

    async fn find_by_tags_or_city(
        &self,
        tags: &[String],
        cities: &[String],
        exclude_ids: &[i64],
        limit: i64,
    ) -> AppResult<Vec<Attraction>> {
        let attractions = sqlx::query_as::<_, Attraction>(&format!(
            "SELECT {ATTRACTION_COLUMNS} FROM attractions \
             WHERE status = 'active' \
               AND NOT (id = ANY($3)) \
               AND (tags && $1 OR city = ANY($2)) \
             ORDER BY average_rating DESC \
             LIMIT $4"
        ))
        .bind(tags.to_vec())
        .bind(cities.to_vec())
        .bind(exclude_ids.to_vec())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(attractions)
    }
}
