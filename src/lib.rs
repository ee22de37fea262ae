//! Outfit Rank - weather-driven outfit candidate selection and ranking
//!
//! This library narrows a clothing catalog to what suits the current weather
//! and orders it with a remote ranking model. When the model is slow, failing
//! or circuit-tripped, a deterministic rule-based ranker takes over so callers
//! always receive an ordering.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{OutfitPlanner, CandidateSelector, RankingService, OutfitRecommender, rule_based_rank};
pub use models::{ClothingCandidate, SubcategorySpec, WeatherCondition, WeatherContext, OutfitPlan, ScoredCandidate, RankingStrategy};
pub use services::{CircuitBreaker, RankingClient, RankingError};
