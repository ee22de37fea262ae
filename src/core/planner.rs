use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::models::{OutfitPlan, SubcategorySpec, WeatherCondition};
use crate::services::catalog::{CatalogError, SubcategorySpecProvider};

/// Default number of subcategories kept per category
pub const MAX_SPECS_PER_CATEGORY: usize = 3;

/// Narrows the subcategory table to what is wearable in the given weather
#[derive(Clone)]
pub struct OutfitPlanner {
    specs: Arc<dyn SubcategorySpecProvider>,
    max_per_category: usize,
}

impl OutfitPlanner {
    pub fn new(specs: Arc<dyn SubcategorySpecProvider>) -> Self {
        Self {
            specs,
            max_per_category: MAX_SPECS_PER_CATEGORY,
        }
    }

    pub fn with_max_per_category(mut self, max_per_category: usize) -> Self {
        self.max_per_category = max_per_category;
        self
    }

    /// Load the spec table and build a plan from it
    pub async fn generate_plan(
        &self,
        temperature: f64,
        condition: &WeatherCondition,
        user_preferences: HashMap<String, serde_json::Value>,
    ) -> Result<OutfitPlan, CatalogError> {
        let specs = self.specs.list_all().await?;
        let total_specs = specs.len();

        let plan = build_plan(
            specs,
            temperature,
            condition.clone(),
            user_preferences,
            self.max_per_category,
        );

        tracing::debug!(
            "Plan for {:.1}°C/{}: {} categories from {} specs",
            temperature,
            condition,
            plan.plan.len(),
            total_specs
        );

        Ok(plan)
    }
}

/// Build a plan from an already loaded spec table.
///
/// A spec is kept when `temperature` lies in its recommended range and it
/// suits `condition`. Each category keeps its `max_per_category` warmest
/// specs, warmest first.
pub fn build_plan(
    specs: Vec<SubcategorySpec>,
    temperature: f64,
    condition: WeatherCondition,
    user_preferences: HashMap<String, serde_json::Value>,
    max_per_category: usize,
) -> OutfitPlan {
    let mut plan: BTreeMap<String, Vec<SubcategorySpec>> = BTreeMap::new();

    for spec in specs {
        if spec.covers(temperature) && spec.suits(&condition) {
            plan.entry(spec.category.clone()).or_default().push(spec);
        }
    }

    for bucket in plan.values_mut() {
        bucket.sort_by(|a, b| b.warmth_min.cmp(&a.warmth_min));
        bucket.truncate(max_per_category);
    }

    OutfitPlan {
        temperature,
        weather_condition: condition,
        user_preferences,
        plan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::InMemorySpecs;

    fn spec(category: &str, subcategory: &str, warmth_min: i16, range: (i16, i16), rain_ok: bool, snow_ok: bool) -> SubcategorySpec {
        SubcategorySpec {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            warmth_min,
            temp_min_reco: range.0,
            temp_max_reco: range.1,
            rain_ok,
            snow_ok,
            wind_ok: true,
        }
    }

    fn table() -> Vec<SubcategorySpec> {
        vec![
            spec("outerwear", "raincoat", 4, (0, 18), true, false),
            spec("outerwear", "wool_coat", 8, (-15, 8), false, true),
            spec("outerwear", "parka", 9, (-30, 5), true, true),
            spec("outerwear", "denim_jacket", 3, (8, 20), false, false),
            spec("top", "sweater", 6, (-5, 12), true, true),
            spec("top", "hoodie", 5, (0, 15), true, false),
            spec("top", "thermal", 7, (-20, 6), true, true),
            spec("top", "shirt", 3, (5, 25), true, true),
            spec("top", "t-shirt", 1, (15, 35), true, true),
            spec("shoes", "sandals", 1, (20, 40), false, false),
        ]
    }

    #[test]
    fn test_rain_plan_excludes_non_rain_specs() {
        let plan = build_plan(table(), 5.0, WeatherCondition::Rain, HashMap::new(), 3);

        for (category, bucket) in &plan.plan {
            for spec in bucket {
                assert!(spec.rain_ok, "{}/{} is not rain-proof", category, spec.subcategory);
                assert!(spec.temp_min_reco <= 5 && 5 <= spec.temp_max_reco);
            }
        }

        let outerwear: Vec<&str> = plan.bucket("outerwear").iter().map(|s| s.subcategory.as_str()).collect();
        assert_eq!(outerwear, vec!["parka", "raincoat"]);
        assert!(plan.bucket("shoes").is_empty());
    }

    #[test]
    fn test_buckets_capped_and_sorted_by_warmth() {
        let plan = build_plan(table(), 5.0, WeatherCondition::Clouds, HashMap::new(), 3);

        for bucket in plan.plan.values() {
            assert!(bucket.len() <= 3);
            assert!(bucket.windows(2).all(|w| w[0].warmth_min >= w[1].warmth_min));
        }

        // thermal(7), sweater(6), hoodie(5) survive; shirt(3) is cut
        let top: Vec<&str> = plan.bucket("top").iter().map(|s| s.subcategory.as_str()).collect();
        assert_eq!(top, vec!["thermal", "sweater", "hoodie"]);
    }

    #[test]
    fn test_snow_requires_snow_flag() {
        let plan = build_plan(table(), -2.0, WeatherCondition::Snow, HashMap::new(), 3);
        let outerwear: Vec<&str> = plan.bucket("outerwear").iter().map(|s| s.subcategory.as_str()).collect();
        assert_eq!(outerwear, vec!["parka", "wool_coat"]);
        assert!(plan.bucket("top").iter().all(|s| s.snow_ok));
    }

    #[test]
    fn test_mist_and_thunderstorm_follow_rain_flag() {
        for condition in [WeatherCondition::Mist, WeatherCondition::Thunderstorm] {
            let plan = build_plan(table(), 10.0, condition, HashMap::new(), 3);
            assert!(plan.plan.values().flatten().all(|s| s.rain_ok));
        }
    }

    #[test]
    fn test_unknown_condition_is_always_eligible() {
        let plan = build_plan(
            table(),
            10.0,
            WeatherCondition::from("haze"),
            HashMap::new(),
            3,
        );
        let outerwear: Vec<&str> = plan.bucket("outerwear").iter().map(|s| s.subcategory.as_str()).collect();
        assert_eq!(outerwear, vec!["raincoat", "denim_jacket"]);
    }

    #[test]
    fn test_no_eligible_specs_gives_empty_plan() {
        let plan = build_plan(table(), 50.0, WeatherCondition::Clear, HashMap::new(), 3);
        assert!(plan.is_empty());
        assert_eq!(plan.temperature, 50.0);
    }

    #[tokio::test]
    async fn test_generate_plan_passes_preferences_through() {
        let planner = OutfitPlanner::new(Arc::new(InMemorySpecs::new(table())));
        let mut prefs = HashMap::new();
        prefs.insert("style".to_string(), serde_json::json!("minimal"));

        let plan = planner
            .generate_plan(18.0, &WeatherCondition::Clear, prefs.clone())
            .await
            .unwrap();

        assert_eq!(plan.user_preferences, prefs);
        assert_eq!(plan.weather_condition, WeatherCondition::Clear);
        assert!(!plan.bucket("top").is_empty());
    }

    #[tokio::test]
    async fn test_custom_cap() {
        let planner = OutfitPlanner::new(Arc::new(InMemorySpecs::new(table()))).with_max_per_category(1);
        let plan = planner
            .generate_plan(5.0, &WeatherCondition::Clear, HashMap::new())
            .await
            .unwrap();
        assert!(plan.plan.values().all(|bucket| bucket.len() == 1));
    }
}
