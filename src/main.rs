use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use outfit_rank::config::{LoggingSettings, Settings};
use outfit_rank::core::{CandidateSelector, OutfitPlanner, OutfitRecommender, RankingService};
use outfit_rank::routes::{self, AppState};
use outfit_rank::services::{
    CachedSpecProvider, HttpRankingTransport, PostgresCatalog, RankingClient,
};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_tracing(&settings.logging);

    info!("Starting outfit ranking service...");

    // Initialize PostgreSQL catalog
    let db_max_conn = settings.database.max_connections.unwrap_or(10);

    let postgres = PostgresCatalog::from_settings(
        &settings.database.url,
        Some(db_max_conn),
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
    })?;
    let postgres = Arc::new(postgres);

    info!("PostgreSQL catalog initialized (max: {} connections)", db_max_conn);

    // Spec table is reference data; cache it in-process
    let spec_ttl = Duration::from_secs(settings.cache.spec_ttl_secs);
    let specs = Arc::new(CachedSpecProvider::new(postgres.clone(), spec_ttl));

    info!("Spec cache initialized (TTL: {}s)", settings.cache.spec_ttl_secs);

    // Initialize ranking client
    let client_config = settings.ranking.client_config();
    let transport = HttpRankingTransport::new(settings.ranking.base_url.clone(), client_config.call_timeout)
        .map_err(|e| {
            error!("Failed to build ranking transport: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
        })?;
    let client = Arc::new(RankingClient::new(Arc::new(transport), client_config));

    info!(
        "Ranking client initialized ({}, budget {}ms, breaker {} failures / {}s)",
        settings.ranking.base_url,
        settings.ranking.time_budget_ms,
        settings.ranking.failure_threshold,
        settings.ranking.open_timeout_secs
    );

    let recommender = OutfitRecommender::new(
        OutfitPlanner::new(specs).with_max_per_category(settings.planner.max_per_category),
        CandidateSelector::new(
            postgres.clone(),
            settings.planner.candidates_per_category,
            settings.ranking.max_candidates,
        ),
        RankingService::new(client).with_max_retries(settings.ranking.max_retries),
    );

    // Build application state
    let app_state = AppState {
        recommender: Arc::new(recommender),
        postgres,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
