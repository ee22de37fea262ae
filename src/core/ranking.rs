use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::core::scoring::rule_based_rank;
use crate::models::{
    ClothingCandidate, RankContext, RankItem, RankRequest, RankResponse, RankingStrategy,
    ScoredCandidate,
};
use crate::services::ranking_client::RankingClient;

/// Retries granted to the ranking call before falling back
pub const DEFAULT_MAX_RETRIES: usize = 1;

/// Final ordering together with the path that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct RankedOutfit {
    pub items: Vec<ScoredCandidate>,
    pub strategy: RankingStrategy,
}

/// Ranks candidates with the remote model, falling back to local rules
/// whenever the model cannot give a usable answer. Never fails.
#[derive(Clone)]
pub struct RankingService {
    client: Arc<RankingClient>,
    max_retries: usize,
}

impl RankingService {
    pub fn new(client: Arc<RankingClient>) -> Self {
        Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn client(&self) -> &RankingClient {
        &self.client
    }

    /// Order `candidates` for `context`. `elapsed` is the time the request
    /// has already spent before ranking started.
    pub async fn rank(
        &self,
        context: &RankContext,
        candidates: Vec<ClothingCandidate>,
        elapsed: Duration,
    ) -> RankedOutfit {
        let temperature = context.weather.temperature;

        if candidates.is_empty() {
            return RankedOutfit {
                items: Vec::new(),
                strategy: RankingStrategy::RuleBased {
                    reason: "no candidates".to_string(),
                },
            };
        }

        let request = RankRequest {
            context: context.clone(),
            candidates: candidates.iter().map(RankItem::from).collect(),
        };

        let response = match self
            .client
            .rank_candidates_with_retry(&request, self.max_retries, elapsed)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Ranking service unavailable, using rule-based ranking: {}", e);
                return fallback(candidates, temperature, e.to_string());
            }
        };

        if let Some(error) = response.error.as_deref() {
            tracing::warn!("Ranking service reported an error, using rule-based ranking: {}", error);
            return fallback(candidates, temperature, format!("ranking service error: {}", error));
        }

        let items = merge_scores(candidates, &response);

        tracing::debug!(
            "Ranked {} candidates with model {} in {:.1}ms",
            items.len(),
            response.model_version,
            response.processing_time_ms
        );

        RankedOutfit {
            items,
            strategy: RankingStrategy::Model {
                model_version: response.model_version,
                processing_time_ms: response.processing_time_ms,
            },
        }
    }
}

fn fallback(candidates: Vec<ClothingCandidate>, temperature: f64, reason: String) -> RankedOutfit {
    RankedOutfit {
        items: rule_based_rank(candidates, temperature),
        strategy: RankingStrategy::RuleBased { reason },
    }
}

/// Attach model scores to candidates and order them, highest first.
///
/// Ids the model left out score 0.0. The sort is stable, so equal scores
/// keep their input order.
pub fn merge_scores(candidates: Vec<ClothingCandidate>, response: &RankResponse) -> Vec<ScoredCandidate> {
    let scores: HashMap<i64, f64> = response.ranked.iter().map(|r| (r.id, r.score)).collect();

    let mut unscored = 0usize;
    let mut merged: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|item| {
            let score = scores.get(&item.id).copied().unwrap_or_else(|| {
                unscored += 1;
                0.0
            });
            ScoredCandidate { item, score }
        })
        .collect();

    if unscored > 0 {
        tracing::debug!("{} candidates were not scored by the model", unscored);
    }

    merged.sort_by(|a, b| b.score.total_cmp(&a.score));
    merged
}
