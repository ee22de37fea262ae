use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::models::domain::{UserProfile, WeatherCondition, WeatherContext};

/// Weather block of an outfit request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WeatherInput {
    #[validate(range(min = -90.0, max = 60.0))]
    pub temperature: f64,
    #[serde(default, alias = "feelsLike")]
    pub feels_like: Option<f64>,
    #[validate(range(min = 0, max = 100))]
    #[serde(default)]
    pub humidity: i32,
    #[validate(range(min = 0.0))]
    #[serde(default, alias = "windSpeed")]
    pub wind_speed: f64,
    #[validate(length(min = 1))]
    pub weather: String,
}

impl From<WeatherInput> for WeatherContext {
    fn from(input: WeatherInput) -> Self {
        Self {
            temperature: input.temperature,
            feels_like: input.feels_like.unwrap_or(input.temperature),
            humidity: input.humidity,
            wind_speed: input.wind_speed,
            condition: WeatherCondition::from(input.weather),
        }
    }
}

/// Request to rank an outfit for the current weather
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendOutfitRequest {
    #[validate(nested)]
    pub weather: WeatherInput,
    #[serde(default, alias = "userProfile")]
    pub user_profile: Option<UserProfile>,
    #[serde(default)]
    pub preferences: HashMap<String, serde_json::Value>,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub location: String,
}
