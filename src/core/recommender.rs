use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::core::planner::OutfitPlanner;
use crate::core::ranking::RankingService;
use crate::core::selector::CandidateSelector;
use crate::models::{
    OutfitPlan, RankContext, RankingStrategy, ScoredCandidate, UserProfile, WeatherContext,
};
use crate::services::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Spec table unavailable: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result of one recommendation run
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub recommendation_id: Uuid,
    pub plan: OutfitPlan,
    pub items: Vec<ScoredCandidate>,
    pub strategy: RankingStrategy,
    pub total_candidates: usize,
}

/// Main recommendation orchestrator
///
/// # Pipeline Stages
/// 1. Plan eligible subcategories for the weather
/// 2. Select catalog candidates for the plan
/// 3. Rank them (model first, rules as fallback)
#[derive(Clone)]
pub struct OutfitRecommender {
    planner: OutfitPlanner,
    selector: CandidateSelector,
    ranking: RankingService,
}

impl OutfitRecommender {
    pub fn new(planner: OutfitPlanner, selector: CandidateSelector, ranking: RankingService) -> Self {
        Self {
            planner,
            selector,
            ranking,
        }
    }

    pub fn ranking(&self) -> &RankingService {
        &self.ranking
    }

    /// Run the full pipeline.
    ///
    /// `elapsed` is time already spent on the request upstream; time spent
    /// here is added to it before the ranking budget is checked. Only a
    /// failure to load the spec table is an error; ranking trouble is
    /// absorbed by the fallback.
    pub async fn recommend(
        &self,
        weather: WeatherContext,
        user_profile: Option<UserProfile>,
        preferences: HashMap<String, serde_json::Value>,
        location: String,
        elapsed: Duration,
    ) -> Result<Recommendation, RecommendError> {
        let started = Instant::now();
        let temperature = weather.temperature;

        let plan = self
            .planner
            .generate_plan(temperature, &weather.condition, preferences.clone())
            .await?;

        let candidates = self.selector.select(&plan, temperature).await;
        let total_candidates = candidates.len();

        let context = RankContext {
            weather,
            user_profile: user_profile.unwrap_or_default(),
            preferences,
            location,
        };

        let ranked = self
            .ranking
            .rank(&context, candidates, elapsed + started.elapsed())
            .await;

        let recommendation_id = Uuid::new_v4();
        tracing::info!(
            "Recommendation {}: {} items from {} candidates ({})",
            recommendation_id,
            ranked.items.len(),
            total_candidates,
            if ranked.strategy.is_fallback() { "rule-based" } else { "model" }
        );

        Ok(Recommendation {
            recommendation_id,
            plan,
            items: ranked.items,
            strategy: ranked.strategy,
            total_candidates,
        })
    }
}
