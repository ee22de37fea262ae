use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{OutfitPlan, ScoredCandidate};
use crate::models::ranking::RankingStrategy;

/// Response for the outfit recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendOutfitResponse {
    pub recommendation_id: Uuid,
    pub items: Vec<ScoredCandidate>,
    #[serde(flatten)]
    pub strategy: RankingStrategy,
    pub plan: OutfitPlan,
    pub total_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub circuit: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
