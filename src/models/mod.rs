use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an attraction. Only `active` attractions are eligible
/// for recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attraction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttractionStatus {
    Active,
    Inactive,
    Pending,
}

/// A tourism attraction as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attraction {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub tags: Vec<String>,
    /// Aggregate of all visible ratings, in [0, 5]
    pub average_rating: f64,
    pub visit_count: i64,
    pub status: AttractionStatus,
}

/// A single rating row, as read back for cross-user scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub user_id: i64,
    pub attraction_id: i64,
    pub score: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Projection of a rating onto the requesting user's own history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRating {
    pub attraction_id: i64,
    pub score: f64,
}

/// Another user ranked by rating-pattern similarity to the requester.
/// Computed per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarUser {
    pub user_id: i64,
    /// Pearson correlation over co-rated attractions, in [-1, 1]
    pub similarity: f64,
}

/// An attraction surviving the collaborative filter, before catalog lookup
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationCandidate {
    pub attraction_id: i64,
    /// Sum of the similarity weights of the users who liked it
    pub aggregated_score: f64,
    pub contributing_users: usize,
}

/// Which strategy produced a recommendation response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Popular,
    Personalized,
}

/// One recommended attraction plus the explanation owed to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAttraction {
    pub attraction: Attraction,
    /// Human-readable explanation of why this entry was selected
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributing_users: Option<usize>,
}

/// Response body for personalized recommendations; also the cached payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub recommendations: Vec<RecommendedAttraction>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_attraction() -> Attraction {
        Attraction {
            id: 1,
            name: "Forbidden City".to_string(),
            description: Some("Imperial palace complex".to_string()),
            city: "Beijing".to_string(),
            tags: vec!["history".to_string(), "culture".to_string()],
            average_rating: 4.8,
            visit_count: 120_000,
            status: AttractionStatus::Active,
        }
    }

    #[test]
    fn test_attraction_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&AttractionStatus::Active).unwrap(),
            r#""active""#
        );
        let status: AttractionStatus = serde_json::from_str(r#""pending""#).unwrap();
        assert_eq!(status, AttractionStatus::Pending);
    }

    #[test]
    fn test_response_type_field_name() {
        let response = RecommendationResponse {
            kind: RecommendationType::Popular,
            recommendations: vec![],
            generated_at: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "popular");
        assert!(json["recommendations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_recommendation_response_roundtrip() {
        let response = RecommendationResponse {
            kind: RecommendationType::Personalized,
            recommendations: vec![RecommendedAttraction {
                attraction: sample_attraction(),
                reason: "Liked by 3 travelers with similar taste".to_string(),
                score: Some(1.87),
                contributing_users: Some(3),
            }],
            generated_at: Utc::now(),
        };

        let json = serde_json::to_string(&response).unwrap();
        let parsed: RecommendationResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_optional_score_omitted_when_absent() {
        let entry = RecommendedAttraction {
            attraction: sample_attraction(),
            reason: "Popular with travelers".to_string(),
            score: None,
            contributing_users: None,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("score").is_none());
        assert!(json.get("contributing_users").is_none());
    }
}
