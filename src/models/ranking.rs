use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::domain::{ClothingCandidate, Source, UserProfile, WeatherContext};

/// Item shape accepted by the ranking service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub gender: String,
    pub style: String,
    pub usage: String,
    pub season: String,
    pub base_colour: String,
    pub formality: i16,
    pub warmth: i16,
    pub min_temp: i16,
    pub max_temp: i16,
    pub materials: Vec<String>,
    pub fit: String,
    pub pattern: String,
    pub icon_emoji: String,
    pub source: Source,
    pub is_owned: bool,
    pub created_at: String,
    pub source_priority: u8,
}

impl From<&ClothingCandidate> for RankItem {
    fn from(item: &ClothingCandidate) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            subcategory: item.subcategory.clone(),
            gender: item.gender.clone(),
            style: item.style.clone(),
            usage: item.usage.clone(),
            season: item.season.clone(),
            base_colour: item.base_colour.clone(),
            formality: item.formality,
            warmth: item.warmth,
            min_temp: item.min_temp,
            max_temp: item.max_temp,
            materials: item.materials.clone(),
            fit: item.fit.clone(),
            pattern: item.pattern.clone(),
            icon_emoji: item.icon.clone(),
            source: item.source,
            is_owned: item.is_owned,
            created_at: item.created_at.to_rfc3339(),
            source_priority: item.source.priority(),
        }
    }
}

/// Everything the ranking service knows about the request besides the items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankContext {
    pub weather: WeatherContext,
    /// Always sent; anonymous requests carry an empty profile
    #[serde(default)]
    pub user_profile: UserProfile,
    #[serde(default)]
    pub preferences: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRequest {
    pub context: RankContext,
    pub candidates: Vec<RankItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: i64,
    pub score: f64,
}

/// Ranking service reply. A non-empty `error` is a service-level failure
/// reported inside an otherwise successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankResponse {
    #[serde(default)]
    pub ranked: Vec<RankedItem>,
    #[serde(default)]
    pub model_version: String,
    #[serde(default)]
    pub processing_time_ms: f64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Which path produced the final ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum RankingStrategy {
    Model {
        model_version: String,
        processing_time_ms: f64,
    },
    RuleBased {
        reason: String,
    },
}

impl RankingStrategy {
    pub fn is_fallback(&self) -> bool {
        matches!(self, RankingStrategy::RuleBased { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::WeatherCondition;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_rank_item_carries_source_priority() {
        let item = ClothingCandidate {
            id: 7,
            name: "Wool coat".to_string(),
            category: "outerwear".to_string(),
            subcategory: "coat".to_string(),
            gender: "unisex".to_string(),
            style: "casual".to_string(),
            usage: "daily".to_string(),
            season: "winter".to_string(),
            base_colour: "grey".to_string(),
            formality: 3,
            warmth: 8,
            min_temp: -10,
            max_temp: 8,
            materials: vec!["wool".to_string()],
            fit: "regular".to_string(),
            pattern: "solid".to_string(),
            icon: "🧥".to_string(),
            source: Source::Manual,
            is_owned: true,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let wire = RankItem::from(&item);
        assert_eq!(wire.source_priority, 2);
        assert_eq!(wire.icon_emoji, "🧥");
        assert_eq!(wire.created_at, "2024-01-02T03:04:05+00:00");

        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["source"], "manual");
        assert_eq!(json["warmth"], 8);
    }

    #[test]
    fn test_response_with_service_error() {
        let body = r#"{"ranked": [], "model_version": "v3", "processing_time_ms": 1.5, "error": "model not loaded"}"#;
        let response: RankResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.error.as_deref(), Some("model not loaded"));
        assert!(response.ranked.is_empty());
    }

    #[test]
    fn test_anonymous_context_still_sends_profile() {
        let context = RankContext {
            weather: WeatherContext {
                temperature: 12.0,
                feels_like: 10.0,
                humidity: 70,
                wind_speed: 3.0,
                condition: WeatherCondition::Rain,
            },
            user_profile: UserProfile::default(),
            preferences: HashMap::new(),
            location: String::new(),
        };

        let json = serde_json::to_value(&context).unwrap();
        assert!(json["user_profile"].is_object());
        assert_eq!(json["user_profile"]["style_preference"], "");

        let parsed: RankContext = serde_json::from_str(
            r#"{"weather": {"temperature": 1.0, "feels_like": 0.0, "humidity": 50, "wind_speed": 1.0, "weather": "Snow"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.user_profile, UserProfile::default());
    }

    #[test]
    fn test_strategy_serialization() {
        let strategy = RankingStrategy::RuleBased {
            reason: "circuit breaker is open".to_string(),
        };
        let json = serde_json::to_value(&strategy).unwrap();
        assert_eq!(json["strategy"], "rule_based");
        assert!(strategy.is_fallback());
    }
}
