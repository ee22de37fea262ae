use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Where a clothing item came from. Drives both the wire-level
/// `source_priority` and the rule-based fallback weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    User,
    Manual,
    Partner,
    Synthetic,
}

impl Source {
    /// Priority sent to the ranking service (user=3 .. synthetic=0)
    pub fn priority(self) -> u8 {
        match self {
            Source::User => 3,
            Source::Manual => 2,
            Source::Partner => 1,
            Source::Synthetic => 0,
        }
    }

    /// Base weight used by the rule-based ranker
    pub fn rule_weight(self) -> f64 {
        match self {
            Source::User => 100.0,
            Source::Manual => 80.0,
            Source::Partner => 60.0,
            Source::Synthetic => 40.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::User => "user",
            Source::Manual => "manual",
            Source::Partner => "partner",
            Source::Synthetic => "synthetic",
        }
    }

    /// Parse a stored source tag, case-insensitively
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "user" => Some(Source::User),
            "manual" => Some(Source::Manual),
            "partner" => Some(Source::Partner),
            "synthetic" => Some(Source::Synthetic),
            _ => None,
        }
    }
}

/// Violations of the clothing item invariants
#[derive(Debug, Error, PartialEq)]
pub enum ItemValidationError {
    #[error("min_temp ({min}) cannot be greater than max_temp ({max})")]
    TemperatureRange { min: i16, max: i16 },

    #[error("warmth_level must be between 1 and 10, got {0}")]
    Warmth(i16),

    #[error("formality_level must be between 1 and 5, got {0}")]
    Formality(i16),
}

/// A clothing item under consideration for a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothingCandidate {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub gender: String,
    pub style: String,
    pub usage: String,
    pub season: String,
    pub base_colour: String,
    #[serde(rename = "formality_level")]
    pub formality: i16,
    #[serde(rename = "warmth_level")]
    pub warmth: i16,
    pub min_temp: i16,
    pub max_temp: i16,
    #[serde(default)]
    pub materials: Vec<String>,
    pub fit: String,
    pub pattern: String,
    #[serde(rename = "icon_emoji")]
    pub icon: String,
    pub source: Source,
    pub is_owned: bool,
    pub created_at: DateTime<Utc>,
}

impl ClothingCandidate {
    /// Check the bounds every stored item must satisfy
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.min_temp > self.max_temp {
            return Err(ItemValidationError::TemperatureRange {
                min: self.min_temp,
                max: self.max_temp,
            });
        }
        if !(1..=10).contains(&self.warmth) {
            return Err(ItemValidationError::Warmth(self.warmth));
        }
        if !(1..=5).contains(&self.formality) {
            return Err(ItemValidationError::Formality(self.formality));
        }
        Ok(())
    }

    /// Whether the item's own comfort range contains `temperature`
    #[inline]
    pub fn suits_temperature(&self, temperature: f64) -> bool {
        f64::from(self.min_temp) <= temperature && temperature <= f64::from(self.max_temp)
    }

    /// Midpoint of the item's comfort range
    #[inline]
    pub fn temperature_midpoint(&self) -> f64 {
        (f64::from(self.min_temp) + f64::from(self.max_temp)) / 2.0
    }
}

/// Weather condition tag as reported by the weather provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Snow,
    Mist,
    Thunderstorm,
    Other(String),
}

impl WeatherCondition {
    /// Tag in the provider's spelling
    pub fn as_str(&self) -> &str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Clouds => "Clouds",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Mist => "Mist",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Other(tag) => tag,
        }
    }
}

impl From<&str> for WeatherCondition {
    fn from(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "clear" => WeatherCondition::Clear,
            "clouds" => WeatherCondition::Clouds,
            "rain" => WeatherCondition::Rain,
            "drizzle" => WeatherCondition::Drizzle,
            "snow" => WeatherCondition::Snow,
            "mist" => WeatherCondition::Mist,
            "thunderstorm" => WeatherCondition::Thunderstorm,
            _ => WeatherCondition::Other(tag.to_string()),
        }
    }
}

impl From<String> for WeatherCondition {
    fn from(tag: String) -> Self {
        WeatherCondition::from(tag.as_str())
    }
}

impl From<WeatherCondition> for String {
    fn from(condition: WeatherCondition) -> Self {
        match condition {
            WeatherCondition::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference data describing when a subcategory is wearable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategorySpec {
    pub category: String,
    pub subcategory: String,
    pub warmth_min: i16,
    pub temp_min_reco: i16,
    pub temp_max_reco: i16,
    pub rain_ok: bool,
    pub snow_ok: bool,
    pub wind_ok: bool,
}

impl SubcategorySpec {
    /// Whether `temperature` lies inside the recommended range
    #[inline]
    pub fn covers(&self, temperature: f64) -> bool {
        f64::from(self.temp_min_reco) <= temperature && temperature <= f64::from(self.temp_max_reco)
    }

    /// Weather eligibility. Mist and thunderstorm reuse the rain flag since
    /// no separate fog/storm data exists.
    pub fn suits(&self, condition: &WeatherCondition) -> bool {
        match condition {
            WeatherCondition::Rain | WeatherCondition::Drizzle => self.rain_ok,
            WeatherCondition::Snow => self.snow_ok,
            WeatherCondition::Mist | WeatherCondition::Thunderstorm => self.rain_ok,
            _ => true,
        }
    }
}

/// Current weather at the user's location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub wind_speed: f64,
    #[serde(rename = "weather")]
    pub condition: WeatherCondition,
}

/// Fragment of the user's profile passed through to the ranking service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age_range: String,
    pub style_preference: String,
    pub temperature_sensitivity: String,
    pub formality_preference: String,
    pub gender: String,
}

/// Per-category subcategory eligibility for one weather context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitPlan {
    pub temperature: f64,
    pub weather_condition: WeatherCondition,
    #[serde(default)]
    pub user_preferences: HashMap<String, serde_json::Value>,
    pub plan: BTreeMap<String, Vec<SubcategorySpec>>,
}

impl OutfitPlan {
    /// Specs retained for `category`, warmest first
    pub fn bucket(&self, category: &str) -> &[SubcategorySpec] {
        self.plan.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.plan.values().all(Vec::is_empty)
    }
}

/// Catalog lookup parameters for one plan category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub category: String,
    pub subcategories: Vec<String>,
    pub min_warmth: i16,
    pub temperature: i16,
    pub limit: usize,
}

impl CandidateQuery {
    /// Whether `item` satisfies every filter of the query (ignores `limit`)
    pub fn matches(&self, item: &ClothingCandidate) -> bool {
        item.category == self.category
            && self.subcategories.iter().any(|s| s == &item.subcategory)
            && item.warmth >= self.min_warmth
            && item.min_temp <= self.temperature
            && self.temperature <= item.max_temp
    }
}

/// A ranked candidate with the score that placed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub item: ClothingCandidate,
    pub score: f64,
}
