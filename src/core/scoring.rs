use crate::models::{ClothingCandidate, ScoredCandidate};

/// Below this ambient temperature warmer items earn a bonus
const COLD_THRESHOLD: f64 = 10.0;

const IN_RANGE_BONUS: f64 = 50.0;
const OUT_OF_RANGE_PENALTY: f64 = 30.0;
const MAX_CLOSENESS_BONUS: f64 = 20.0;
const MAX_WARMTH_BONUS: f64 = 30.0;

/// Deterministic local score for one candidate at ambient `temperature`
///
/// Scoring formula:
/// score = source weight            # user 100, manual 80, partner 60, synthetic 40
///       + 50 + closeness           # when min_temp <= T <= max_temp, closeness in 0..=20
///       - 30                       # otherwise
///       + warmth / 10 * 30         # only when T < 10
pub fn rule_score(item: &ClothingCandidate, temperature: f64) -> f64 {
    let mut score = item.source.rule_weight();

    if item.suits_temperature(temperature) {
        let distance = (item.temperature_midpoint() - temperature).abs();
        score += IN_RANGE_BONUS + (MAX_CLOSENESS_BONUS - distance).max(0.0);
    } else {
        score -= OUT_OF_RANGE_PENALTY;
    }

    if temperature < COLD_THRESHOLD {
        score += f64::from(item.warmth) / 10.0 * MAX_WARMTH_BONUS;
    }

    score
}

/// Score and order candidates without the ranking service.
///
/// Highest score first. The sort is stable, so equal scores keep their
/// input order.
pub fn rule_based_rank(candidates: Vec<ClothingCandidate>, temperature: f64) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|item| {
            let score = rule_score(&item, temperature);
            ScoredCandidate { item, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}
