use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::{CANDIDATES_PER_CATEGORY, MAX_SPECS_PER_CATEGORY};
use crate::services::ranking_client::RankingClientConfig;

const ENV_PREFIX: &str = "OUTFIT";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub planner: PlannerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// Remote ranking service and its resilience limits
#[derive(Debug, Clone, Deserialize)]
pub struct RankingSettings {
    #[serde(default = "default_ranking_url")]
    pub base_url: String,
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            base_url: default_ranking_url(),
            call_timeout_ms: default_call_timeout_ms(),
            max_candidates: default_max_candidates(),
            failure_threshold: default_failure_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
            time_budget_ms: default_time_budget_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl RankingSettings {
    pub fn client_config(&self) -> RankingClientConfig {
        RankingClientConfig {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            max_candidates: self.max_candidates,
            failure_threshold: self.failure_threshold,
            open_timeout: Duration::from_secs(self.open_timeout_secs),
            time_budget: Duration::from_millis(self.time_budget_ms),
            ..RankingClientConfig::default()
        }
    }
}

fn default_ranking_url() -> String { "http://localhost:5000".to_string() }
fn default_call_timeout_ms() -> u64 { 800 }
fn default_max_candidates() -> usize { 250 }
fn default_failure_threshold() -> u32 { 20 }
fn default_open_timeout_secs() -> u64 { 30 }
fn default_time_budget_ms() -> u64 { 400 }
fn default_max_retries() -> usize { 1 }

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSettings {
    #[serde(default = "default_max_per_category")]
    pub max_per_category: usize,
    #[serde(default = "default_candidates_per_category")]
    pub candidates_per_category: usize,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_per_category: default_max_per_category(),
            candidates_per_category: default_candidates_per_category(),
        }
    }
}

fn default_max_per_category() -> usize { MAX_SPECS_PER_CATEGORY }
fn default_candidates_per_category() -> usize { CANDIDATES_PER_CATEGORY }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_spec_ttl_secs")]
    pub spec_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            spec_ttl_secs: default_spec_ttl_secs(),
        }
    }
}

fn default_spec_ttl_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with OUTFIT__)
    /// 5. DATABASE_URL and RANKING_SERVICE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., OUTFIT__RANKING__BASE_URL -> ranking.base_url
            .add_source(environment())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Conventional deployment variables win over everything else
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(ranking_url) = env::var("RANKING_SERVICE_URL") {
        builder = builder.set_override("ranking.base_url", ranking_url)?;
    }

    builder.build()
}
