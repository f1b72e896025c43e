use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::db::attractions::AttractionRepo;
use crate::db::ratings::RatingRepo;
use crate::db::redis::RecommendationCache;
use crate::error::{AppError, AppResult};
use crate::models::{
    Attraction, RecommendationCandidate, RecommendationResponse, RecommendationType,
    RecommendedAttraction, SimilarUser,
};
use crate::services::similarity::{group_ratings_by_user, rank_similar_users};

/// A rating at or above this counts as "liked" for the collaborative path
const LIKED_SCORE_THRESHOLD: f64 = 4.0;
/// Collaborative candidates need at least this many distinct contributors
const MIN_CONTRIBUTORS: usize = 2;
/// Cap for the collaborative result list
const PERSONALIZED_LIMIT: usize = 20;
/// Page size for popularity and content-based results
const POPULAR_LIMIT: i64 = 10;
/// Cap for the similar-to-one-attraction list
const SIMILAR_LIMIT: i64 = 6;
/// How many of the user's most frequent tags feed the content fallback
const TOP_TAGS: usize = 5;
/// How many of the user's most frequent cities feed the content fallback
const TOP_CITIES: usize = 3;
/// Upper bound for client-supplied page sizes
const MAX_PAGE_SIZE: i64 = 50;

/// Layered recommendation strategy over the rating store and attraction
/// catalog, with a write-through cache in front.
///
/// Strategy per user, in priority order: cached response, collaborative
/// filtering over similar users, tag/city content fallback, global
/// popularity. Computation reads only; concurrent requests for the same user
/// may recompute redundantly and overwrite each other's cache entry, which is
/// harmless because every write is derived from the same store state.
pub struct RecommendationService<R, A, C> {
    ratings: R,
    attractions: A,
    cache: C,
    ttl_secs: u64,
}

impl<R, A, C> RecommendationService<R, A, C>
where
    R: RatingRepo,
    A: AttractionRepo,
    C: RecommendationCache,
{
    pub fn new(ratings: R, attractions: A, cache: C, ttl_secs: u64) -> Self {
        Self {
            ratings,
            attractions,
            cache,
            ttl_secs,
        }
    }

    /// Personalized recommendations for one user, cached for `ttl_secs`.
    ///
    /// Cache failures are logged and treated as misses; only the primary
    /// store can fail this request.
    pub async fn personalized(&self, user_id: i64) -> AppResult<RecommendationResponse> {
        validate_id(user_id, "user id")?;

        match self.cache.get(user_id).await {
            Ok(Some(cached)) => {
                tracing::debug!(user_id, "Recommendation cache hit");
                return Ok(cached);
            }
            Ok(None) => {
                tracing::debug!(user_id, "Recommendation cache miss");
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Cache read failed, treating as miss");
            }
        }

        let response = self.compute(user_id).await?;

        if let Err(e) = self.cache.put(user_id, &response, self.ttl_secs).await {
            tracing::warn!(user_id, error = %e, "Cache write failed, serving uncached");
        }

        Ok(response)
    }

    /// Full recommendation computation, pure with respect to store state
    async fn compute(&self, user_id: i64) -> AppResult<RecommendationResponse> {
        let user_ratings = self.ratings.find_by_user(user_id).await?;

        // Cold start: no history to personalize on
        if user_ratings.is_empty() {
            tracing::info!(user_id, "No rating history, falling back to popular");
            let recommendations = self.popular_entries().await?;
            return Ok(RecommendationResponse {
                kind: RecommendationType::Popular,
                recommendations,
                generated_at: Utc::now(),
            });
        }

        let rated: HashSet<i64> = user_ratings.iter().map(|r| r.attraction_id).collect();

        let others = self.ratings.find_all_except(user_id).await?;
        let by_user = group_ratings_by_user(&others);
        let similar_users = rank_similar_users(&user_ratings, &by_user);

        let mut recommendations = if similar_users.is_empty() {
            vec![]
        } else {
            self.collaborative_entries(&similar_users, &rated).await?
        };

        // No collaborative signal: recommend from the user's own tag/city profile
        if recommendations.is_empty() {
            tracing::info!(
                user_id,
                similar_users = similar_users.len(),
                "No collaborative candidates, using content fallback"
            );
            recommendations = self.content_entries(&rated).await?;
        } else {
            tracing::info!(
                user_id,
                similar_users = similar_users.len(),
                candidates = recommendations.len(),
                "Collaborative recommendations computed"
            );
        }

        Ok(RecommendationResponse {
            kind: RecommendationType::Personalized,
            recommendations,
            generated_at: Utc::now(),
        })
    }

    /// Globally most popular active attractions, optionally filtered by city
    pub async fn popular(
        &self,
        city: Option<String>,
        limit: Option<i64>,
    ) -> AppResult<Vec<Attraction>> {
        if let Some(requested) = limit {
            if requested <= 0 {
                return Err(AppError::InvalidInput(format!(
                    "limit must be a positive integer, got {}",
                    requested
                )));
            }
        }

        let limit = limit.unwrap_or(POPULAR_LIMIT).min(MAX_PAGE_SIZE);
        self.attractions.find_popular(city, limit).await
    }

    /// Active attractions sharing a tag or the city with the given one
    pub async fn similar_attractions(&self, attraction_id: i64) -> AppResult<Vec<Attraction>> {
        validate_id(attraction_id, "attraction id")?;

        let attraction = self
            .attractions
            .find_by_id(attraction_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Attraction {} does not exist", attraction_id))
            })?;

        let cities = vec![attraction.city.clone()];
        self.attractions
            .find_by_tags_or_city(&attraction.tags, &cities, &[attraction_id], SIMILAR_LIMIT)
            .await
    }

    /// Records like/dislike feedback and drops the user's cached response so
    /// the next request recomputes. Cache failures never fail the request; a
    /// lost invalidation only costs one stale read within the TTL window.
    pub async fn submit_feedback(
        &self,
        user_id: i64,
        attraction_id: i64,
        is_helpful: bool,
    ) -> AppResult<()> {
        validate_id(user_id, "user id")?;
        validate_id(attraction_id, "attraction id")?;

        if let Err(e) = self
            .cache
            .record_feedback(user_id, attraction_id, is_helpful)
            .await
        {
            tracing::warn!(user_id, attraction_id, error = %e, "Failed to record feedback");
        }

        if let Err(e) = self.cache.invalidate(user_id).await {
            tracing::warn!(user_id, error = %e, "Failed to invalidate recommendation cache");
        }

        tracing::info!(user_id, attraction_id, is_helpful, "Recommendation feedback received");

        Ok(())
    }

    async fn popular_entries(&self) -> AppResult<Vec<RecommendedAttraction>> {
        let attractions = self.attractions.find_popular(None, POPULAR_LIMIT).await?;

        Ok(attractions
            .into_iter()
            .map(|attraction| RecommendedAttraction {
                reason: format!(
                    "Popular with travelers ({:.1} average rating)",
                    attraction.average_rating
                ),
                score: None,
                contributing_users: None,
                attraction,
            })
            .collect())
    }

    async fn collaborative_entries(
        &self,
        similar_users: &[SimilarUser],
        rated: &HashSet<i64>,
    ) -> AppResult<Vec<RecommendedAttraction>> {
        let user_ids: Vec<i64> = similar_users.iter().map(|s| s.user_id).collect();
        let liked = self
            .ratings
            .find_for_users(&user_ids, LIKED_SCORE_THRESHOLD)
            .await?;

        let candidates = score_candidates(similar_users, &liked, rated);
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<i64> = candidates.iter().map(|c| c.attraction_id).collect();
        let attractions = self.attractions.find_active_by_ids(&ids).await?;
        let by_id: HashMap<i64, Attraction> =
            attractions.into_iter().map(|a| (a.id, a)).collect();

        // Candidates are already sorted by aggregated score; inactive ones
        // simply drop out of the join
        Ok(candidates
            .iter()
            .filter_map(|c| {
                by_id.get(&c.attraction_id).map(|attraction| RecommendedAttraction {
                    attraction: attraction.clone(),
                    reason: format!(
                        "Liked by {} travelers with taste similar to yours",
                        c.contributing_users
                    ),
                    score: Some(c.aggregated_score),
                    contributing_users: Some(c.contributing_users),
                })
            })
            .take(PERSONALIZED_LIMIT)
            .collect())
    }

    async fn content_entries(
        &self,
        rated: &HashSet<i64>,
    ) -> AppResult<Vec<RecommendedAttraction>> {
        let rated_ids: Vec<i64> = rated.iter().copied().collect();
        let rated_attractions = self.attractions.find_active_by_ids(&rated_ids).await?;

        let (tags, cities) = preference_profile(&rated_attractions);
        if tags.is_empty() && cities.is_empty() {
            return Ok(vec![]);
        }

        let matches = self
            .attractions
            .find_by_tags_or_city(&tags, &cities, &rated_ids, POPULAR_LIMIT)
            .await?;

        Ok(matches
            .into_iter()
            .map(|attraction| RecommendedAttraction {
                reason: content_reason(&attraction, &tags, &cities),
                score: Some(attraction.average_rating),
                contributing_users: None,
                attraction,
            })
            .collect())
    }
}

fn validate_id(id: i64, what: &str) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::InvalidInput(format!(
            "{} must be a positive integer, got {}",
            what, id
        )));
    }
    Ok(())
}

/// Aggregates the similar users' liked ratings into scored candidates.
///
/// Attractions the requester already rated are skipped, each contributor
/// counts once per attraction, and candidates backed by fewer than
/// [`MIN_CONTRIBUTORS`] distinct users are dropped. The aggregated score of a
/// survivor is the sum of its contributors' similarity weights. Output is
/// sorted by descending score (ties on ascending attraction id) and capped at
/// [`PERSONALIZED_LIMIT`].
fn score_candidates(
    similar_users: &[SimilarUser],
    liked: &[crate::models::Rating],
    already_rated: &HashSet<i64>,
) -> Vec<RecommendationCandidate> {
    let weights: HashMap<i64, f64> = similar_users
        .iter()
        .map(|s| (s.user_id, s.similarity))
        .collect();

    let mut grouped: HashMap<i64, (f64, HashSet<i64>)> = HashMap::new();
    for rating in liked {
        if already_rated.contains(&rating.attraction_id) {
            continue;
        }
        let Some(&weight) = weights.get(&rating.user_id) else {
            continue;
        };
        let entry = grouped.entry(rating.attraction_id).or_default();
        if entry.1.insert(rating.user_id) {
            entry.0 += weight;
        }
    }

    let mut candidates: Vec<RecommendationCandidate> = grouped
        .into_iter()
        .filter(|(_, (_, contributors))| contributors.len() >= MIN_CONTRIBUTORS)
        .map(|(attraction_id, (score, contributors))| RecommendationCandidate {
            attraction_id,
            aggregated_score: score,
            contributing_users: contributors.len(),
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.aggregated_score
            .partial_cmp(&a.aggregated_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.attraction_id.cmp(&b.attraction_id))
    });
    candidates.truncate(PERSONALIZED_LIMIT);

    candidates
}

/// The user's most frequent tags and cities across the attractions they rated
fn preference_profile(attractions: &[Attraction]) -> (Vec<String>, Vec<String>) {
    let mut tag_freq: HashMap<&str, usize> = HashMap::new();
    let mut city_freq: HashMap<&str, usize> = HashMap::new();

    for attraction in attractions {
        for tag in &attraction.tags {
            *tag_freq.entry(tag).or_default() += 1;
        }
        *city_freq.entry(&attraction.city).or_default() += 1;
    }

    (top_n(tag_freq, TOP_TAGS), top_n(city_freq, TOP_CITIES))
}

fn top_n(freq: HashMap<&str, usize>, n: usize) -> Vec<String> {
    let mut entries: Vec<(&str, usize)> = freq.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    entries.into_iter().take(n).map(|(s, _)| s.to_string()).collect()
}

fn content_reason(attraction: &Attraction, tags: &[String], cities: &[String]) -> String {
    if let Some(tag) = attraction.tags.iter().find(|t| tags.contains(t)) {
        format!("Matches your interest in {}", tag)
    } else if cities.contains(&attraction.city) {
        format!("In {}, which you have enjoyed before", attraction.city)
    } else {
        "Matches your rating history".to_string()
    }
}
