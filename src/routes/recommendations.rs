use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

use crate::core::{OutfitRecommender, RecommendError};
use crate::models::{
    ErrorResponse, HealthResponse, RecommendOutfitRequest, RecommendOutfitResponse, WeatherContext,
};
use crate::services::PostgresCatalog;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<OutfitRecommender>,
    pub postgres: Arc<PostgresCatalog>,
}

/// Configure all recommendation routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/recommendations/outfit", web::post().to(recommend_outfit));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);
    let circuit = state.recommender.ranking().client().breaker().state();

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        circuit: circuit.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Outfit recommendation endpoint
///
/// POST /api/v1/recommendations/outfit
///
/// Request body:
/// ```json
/// {
///   "weather": { "temperature": 5.0, "humidity": 80, "wind_speed": 3.2, "weather": "Rain" },
///   "user_profile": { "age_range": "25-34", "style_preference": "casual", ... },
///   "preferences": { "colours": ["navy"] },
///   "location": "Oslo"
/// }
/// ```
async fn recommend_outfit(
    state: web::Data<AppState>,
    req: web::Json<RecommendOutfitRequest>,
) -> impl Responder {
    let started = Instant::now();

    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for outfit request: {}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    let weather = WeatherContext::from(req.weather);

    tracing::info!(
        "Recommending outfit for {:.1}°C/{} at {:?}",
        weather.temperature,
        weather.condition,
        req.location
    );

    let result = state
        .recommender
        .recommend(
            weather,
            req.user_profile,
            req.preferences,
            req.location,
            started.elapsed(),
        )
        .await;

    match result {
        Ok(recommendation) => HttpResponse::Ok().json(RecommendOutfitResponse {
            recommendation_id: recommendation.recommendation_id,
            items: recommendation.items,
            strategy: recommendation.strategy,
            plan: recommendation.plan,
            total_candidates: recommendation.total_candidates,
        }),
        Err(RecommendError::Catalog(e)) => {
            tracing::error!("Failed to build outfit plan: {}", e);
            HttpResponse::ServiceUnavailable().json(ErrorResponse {
                error: "Catalog unavailable".to_string(),
                message: e.to_string(),
                status_code: 503,
            })
        }
    }
}
