// Recommendation pipeline stages
pub mod planner;
pub mod ranking;
pub mod recommender;
pub mod scoring;
pub mod selector;

pub use planner::{build_plan, OutfitPlanner, MAX_SPECS_PER_CATEGORY};
pub use ranking::{merge_scores, RankedOutfit, RankingService, DEFAULT_MAX_RETRIES};
pub use recommender::{OutfitRecommender, RecommendError, Recommendation};
pub use scoring::{rule_based_rank, rule_score};
pub use selector::{build_query, prefilter, CandidateSelector, CANDIDATES_PER_CATEGORY};
