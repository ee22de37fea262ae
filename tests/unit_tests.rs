// Unit tests for Outfit Rank

use chrono::Utc;
use outfit_rank::core::{build_plan, merge_scores, prefilter, rule_based_rank, rule_score, OutfitPlanner};
use outfit_rank::models::{
    ClothingCandidate, RankResponse, RankedItem, Source, SubcategorySpec, WeatherCondition,
};
use outfit_rank::services::InMemorySpecs;
use std::collections::HashMap;
use std::sync::Arc;

fn spec(category: &str, subcategory: &str, warmth_min: i16, min: i16, max: i16, rain_ok: bool) -> SubcategorySpec {
    SubcategorySpec {
        category: category.to_string(),
        subcategory: subcategory.to_string(),
        warmth_min,
        temp_min_reco: min,
        temp_max_reco: max,
        rain_ok,
        snow_ok: false,
        wind_ok: true,
    }
}

fn candidate(id: i64, source: Source, warmth: i16, min_temp: i16, max_temp: i16) -> ClothingCandidate {
    ClothingCandidate {
        id,
        name: format!("Item {}", id),
        category: "top".to_string(),
        subcategory: "sweater".to_string(),
        gender: "female".to_string(),
        style: "classic".to_string(),
        usage: "work".to_string(),
        season: "winter".to_string(),
        base_colour: "beige".to_string(),
        formality: 3,
        warmth,
        min_temp,
        max_temp,
        materials: vec!["wool".to_string(), "cashmere".to_string()],
        fit: "slim".to_string(),
        pattern: "cable".to_string(),
        icon: "🧶".to_string(),
        source,
        is_owned: false,
        created_at: Utc::now(),
    }
}

fn spec_table() -> Vec<SubcategorySpec> {
    vec![
        spec("outerwear", "trench", 4, 5, 18, true),
        spec("outerwear", "puffer", 9, -25, 5, true),
        spec("outerwear", "blazer", 3, 10, 22, false),
        spec("outerwear", "wool_coat", 8, -10, 8, false),
        spec("top", "turtleneck", 6, -10, 10, true),
        spec("top", "cardigan", 5, 0, 15, true),
        spec("top", "tank", 1, 22, 40, true),
        spec("bottom", "chinos", 3, 5, 25, true),
        spec("bottom", "thermal_leggings", 7, -20, 5, true),
        spec("bottom", "corduroy", 5, -5, 12, true),
        spec("bottom", "wool_trousers", 6, -10, 10, true),
    ]
}

#[test]
fn test_rain_plan_eligibility_at_five_degrees() {
    let plan = build_plan(spec_table(), 5.0, WeatherCondition::Rain, HashMap::new(), 3);

    for spec in plan.plan.values().flatten() {
        assert!(spec.rain_ok, "{} should have been excluded", spec.subcategory);
        assert!(spec.covers(5.0), "{} does not cover 5°C", spec.subcategory);
    }

    let outerwear: Vec<&str> = plan.bucket("outerwear").iter().map(|s| s.subcategory.as_str()).collect();
    assert_eq!(outerwear, vec!["puffer", "trench"]);
}

#[test]
fn test_plan_bucket_cap_keeps_warmest() {
    let plan = build_plan(spec_table(), 5.0, WeatherCondition::Clear, HashMap::new(), 3);

    // four bottoms qualify, the lightest (chinos) is cut
    let bottom: Vec<&str> = plan.bucket("bottom").iter().map(|s| s.subcategory.as_str()).collect();
    assert_eq!(bottom, vec!["thermal_leggings", "wool_trousers", "corduroy"]);

    for bucket in plan.plan.values() {
        assert!(bucket.len() <= 3);
    }
}

#[test]
fn test_condition_tags_are_case_insensitive() {
    let upper = build_plan(spec_table(), 5.0, WeatherCondition::from("RAIN"), HashMap::new(), 3);
    let lower = build_plan(spec_table(), 5.0, WeatherCondition::from("rain"), HashMap::new(), 3);
    assert_eq!(upper.plan, lower.plan);
}

#[test]
fn test_planner_via_block_on() {
    let planner = OutfitPlanner::new(Arc::new(InMemorySpecs::new(spec_table())));

    let plan = tokio_test::block_on(planner.generate_plan(-3.0, &WeatherCondition::Snow, HashMap::new())).unwrap();

    // nothing in the table is snow-proof
    assert!(plan.is_empty());
}

#[test]
fn test_fallback_prefers_user_items() {
    let a = candidate(1, Source::User, 6, 0, 10);
    let b = candidate(2, Source::Synthetic, 6, 0, 10);

    assert!(rule_score(&a, 5.0) > rule_score(&b, 5.0));
    assert_eq!(rule_score(&a, 5.0) - rule_score(&b, 5.0), 60.0);

    let ranked = rule_based_rank(vec![b, a], 5.0);
    assert_eq!(ranked[0].item.id, 1);
    assert_eq!(ranked[1].item.id, 2);
}

#[test]
fn test_fallback_is_deterministic() {
    let items: Vec<ClothingCandidate> = (1..=12)
        .map(|id| {
            let source = match id % 4 {
                0 => Source::User,
                1 => Source::Manual,
                2 => Source::Partner,
                _ => Source::Synthetic,
            };
            candidate(id, source, (id % 10 + 1) as i16, -5, 12)
        })
        .collect();

    let first: Vec<i64> = rule_based_rank(items.clone(), 3.0).iter().map(|s| s.item.id).collect();
    let second: Vec<i64> = rule_based_rank(items, 3.0).iter().map(|s| s.item.id).collect();
    assert_eq!(first, second);
}

#[test]
fn test_model_merge_is_stable() {
    let items = vec![
        candidate(10, Source::Partner, 5, 0, 10),
        candidate(20, Source::Partner, 5, 0, 10),
        candidate(30, Source::Partner, 5, 0, 10),
    ];
    let response = RankResponse {
        ranked: vec![
            RankedItem { id: 30, score: 0.7 },
            RankedItem { id: 20, score: 0.7 },
            RankedItem { id: 10, score: 0.7 },
        ],
        model_version: "v1".to_string(),
        processing_time_ms: 3.0,
        error: None,
    };

    let merged = merge_scores(items, &response);
    let ids: Vec<i64> = merged.iter().map(|s| s.item.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[test]
fn test_prefilter_drops_items_outside_their_range() {
    let kept = prefilter(
        vec![
            candidate(1, Source::User, 5, -5, 4),
            candidate(2, Source::User, 5, -5, 5),
            candidate(3, Source::User, 5, 6, 20),
        ],
        4.5,
    );

    assert_eq!(kept.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_candidate_validation() {
    let mut item = candidate(1, Source::Manual, 5, 0, 10);
    assert!(item.validate().is_ok());

    item.min_temp = 11;
    assert!(item.validate().is_err());

    item.min_temp = 0;
    item.formality = 6;
    assert!(item.validate().is_err());
}
