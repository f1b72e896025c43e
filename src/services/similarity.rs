use std::collections::HashMap;

use crate::models::{Rating, SimilarUser, UserRating};

/// Fewer co-rated attractions than this carries too little signal
pub const MIN_CO_RATED: usize = 3;
/// Users at or below this similarity are discarded as candidates
pub const SIMILARITY_THRESHOLD: f64 = 0.3;
/// At most this many similar users feed the collaborative path
pub const MAX_SIMILAR_USERS: usize = 10;

/// Similarity between two users' rating histories.
///
/// Intersects on attraction id and computes the Pearson correlation over the
/// co-rated set. Returns 0 when fewer than [`MIN_CO_RATED`] attractions are
/// shared or when either score vector has no variance.
pub fn user_similarity(a: &[UserRating], b: &[UserRating]) -> f64 {
    let b_scores: HashMap<i64, f64> = b.iter().map(|r| (r.attraction_id, r.score)).collect();

    let pairs: Vec<(f64, f64)> = a
        .iter()
        .filter_map(|r| b_scores.get(&r.attraction_id).map(|&s| (r.score, s)))
        .collect();

    if pairs.len() < MIN_CO_RATED {
        return 0.0;
    }

    pearson(&pairs)
}

/// Pearson correlation coefficient over paired scores, in [-1, 1]
fn pearson(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
    let mean_b = pairs.iter().map(|(_, b)| b).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_a = 0.0;
    let mut sum_sq_b = 0.0;

    for (a, b) in pairs {
        let da = a - mean_a;
        let db = b - mean_b;
        numerator += da * db;
        sum_sq_a += da * da;
        sum_sq_b += db * db;
    }

    if sum_sq_a == 0.0 || sum_sq_b == 0.0 {
        return 0.0;
    }

    numerator / (sum_sq_a.sqrt() * sum_sq_b.sqrt())
}

/// Ranks every other rated user by similarity to the requester.
///
/// Candidates at or below [`SIMILARITY_THRESHOLD`] are dropped; survivors are
/// sorted by descending similarity (ties on ascending user id, so repeated
/// computation of the same data is stable) and capped at
/// [`MAX_SIMILAR_USERS`].
pub fn rank_similar_users(
    user_ratings: &[UserRating],
    others: &HashMap<i64, Vec<UserRating>>,
) -> Vec<SimilarUser> {
    let mut ranked: Vec<SimilarUser> = others
        .iter()
        .map(|(&user_id, ratings)| SimilarUser {
            user_id,
            similarity: user_similarity(user_ratings, ratings),
        })
        .filter(|s| s.similarity > SIMILARITY_THRESHOLD)
        .collect();

    ranked.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.user_id.cmp(&b.user_id))
    });
    ranked.truncate(MAX_SIMILAR_USERS);

    ranked
}

/// Groups a flat rating list into per-user histories
pub fn group_ratings_by_user(ratings: &[Rating]) -> HashMap<i64, Vec<UserRating>> {
    let mut by_user: HashMap<i64, Vec<UserRating>> = HashMap::new();

    for rating in ratings {
        by_user.entry(rating.user_id).or_default().push(UserRating {
            attraction_id: rating.attraction_id,
            score: rating.score,
        });
    }

    by_user
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ratings(entries: &[(i64, f64)]) -> Vec<UserRating> {
        entries
            .iter()
            .map(|&(attraction_id, score)| UserRating {
                attraction_id,
                score,
            })
            .collect()
    }

    #[test]
    fn test_fewer_than_three_co_rated_is_zero() {
        let a = ratings(&[(1, 5.0), (2, 4.0)]);
        let b = ratings(&[(1, 5.0), (2, 4.0)]);
        assert_eq!(user_similarity(&a, &b), 0.0);

        let a = ratings(&[(1, 5.0), (2, 4.0), (3, 3.0)]);
        let b = ratings(&[(1, 5.0), (4, 4.0), (5, 3.0)]);
        assert_eq!(user_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_zero_variance_is_zero() {
        // User B gave the same score to every co-rated attraction
        let a = ratings(&[(1, 5.0), (2, 3.0), (3, 1.0)]);
        let b = ratings(&[(1, 4.0), (2, 4.0), (3, 4.0)]);
        assert_eq!(user_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_similarity_is_bounded_and_symmetric() {
        let a = ratings(&[(1, 5.0), (2, 2.0), (3, 4.0), (4, 1.0)]);
        let b = ratings(&[(1, 4.0), (2, 1.0), (3, 5.0), (4, 2.0)]);

        let ab = user_similarity(&a, &b);
        let ba = user_similarity(&b, &a);

        assert!((-1.0..=1.0).contains(&ab));
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_identical_histories_are_perfectly_correlated() {
        let a = ratings(&[(1, 5.0), (2, 3.0), (3, 1.0)]);
        let sim = user_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_opposite_histories_are_negatively_correlated() {
        let a = ratings(&[(1, 5.0), (2, 3.0), (3, 1.0)]);
        let b = ratings(&[(1, 1.0), (2, 3.0), (3, 5.0)]);
        let sim = user_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_closely_aligned_raters_score_high() {
        // U: {A:5, B:5, C:1}, V: {A:5, B:4, C:2}
        let u = ratings(&[(1, 5.0), (2, 5.0), (3, 1.0)]);
        let v = ratings(&[(1, 5.0), (2, 4.0), (3, 2.0)]);

        let sim = user_similarity(&u, &v);
        assert!(sim > 0.9, "expected high positive similarity, got {}", sim);
    }

    #[test]
    fn test_rank_filters_threshold_sorts_and_caps() {
        let user = ratings(&[(1, 5.0), (2, 4.0), (3, 1.0), (4, 3.0)]);

        let mut others = HashMap::new();
        // Strongly aligned
        others.insert(10, ratings(&[(1, 5.0), (2, 4.0), (3, 1.0)]));
        // Anti-aligned, filtered out by the threshold
        others.insert(20, ratings(&[(1, 1.0), (2, 2.0), (3, 5.0)]));
        // Too little overlap
        others.insert(30, ratings(&[(1, 5.0), (9, 4.0)]));
        // Aligned but less tightly
        others.insert(40, ratings(&[(1, 4.0), (2, 4.0), (3, 2.0), (4, 3.0)]));

        let ranked = rank_similar_users(&user, &others);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].user_id, 10);
        assert_eq!(ranked[1].user_id, 40);
        assert!(ranked[0].similarity >= ranked[1].similarity);
        assert!(ranked.iter().all(|s| s.similarity > SIMILARITY_THRESHOLD));
    }

    #[test]
    fn test_rank_caps_at_max_similar_users() {
        let user = ratings(&[(1, 5.0), (2, 4.0), (3, 1.0)]);

        let mut others = HashMap::new();
        for id in 0..25 {
            others.insert(id, ratings(&[(1, 5.0), (2, 4.0), (3, 1.0)]));
        }

        let ranked = rank_similar_users(&user, &others);
        assert_eq!(ranked.len(), MAX_SIMILAR_USERS);
        // Equal similarity breaks ties on ascending user id
        assert_eq!(ranked[0].user_id, 0);
    }

    #[test]
    fn test_group_ratings_by_user() {
        let now = Utc::now();
        let rows = vec![
            Rating {
                user_id: 1,
                attraction_id: 7,
                score: 4.5,
                comment: None,
                created_at: now,
            },
            Rating {
                user_id: 2,
                attraction_id: 7,
                score: 3.0,
                comment: None,
                created_at: now,
            },
            Rating {
                user_id: 1,
                attraction_id: 8,
                score: 5.0,
                comment: Some("wonderful".to_string()),
                created_at: now,
            },
        ];

        let grouped = group_ratings_by_user(&rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&1].len(), 2);
        assert_eq!(grouped[&2].len(), 1);
    }
}
