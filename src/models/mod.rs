// Model exports
pub mod domain;
pub mod ranking;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateQuery, ClothingCandidate, ItemValidationError, OutfitPlan, ScoredCandidate, Source,
    SubcategorySpec, UserProfile, WeatherCondition, WeatherContext,
};
pub use ranking::{RankContext, RankItem, RankRequest, RankResponse, RankedItem, RankingStrategy};
pub use requests::{RecommendOutfitRequest, WeatherInput};
pub use responses::{ErrorResponse, HealthResponse, RecommendOutfitResponse};
