use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{CandidateQuery, ClothingCandidate, Source, SubcategorySpec};
use crate::services::catalog::{CatalogError, ClothingCatalog, SubcategorySpecProvider};

/// PostgreSQL-backed read access to the spec table and the clothing catalog
///
/// Both tables are owned by the wider application; this client only reads
/// `subcategory_specs` and `clothing_items`.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Create a new client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, CatalogError> {
        tracing::info!("Connecting to PostgreSQL catalog");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Create a client without opening a connection; connections are made
    /// on first use
    pub fn connect_lazy(database_url: &str) -> Result<Self, CatalogError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, CatalogError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl SubcategorySpecProvider for PostgresCatalog {
    async fn list_all(&self) -> Result<Vec<SubcategorySpec>, CatalogError> {
        let query = r#"
            SELECT category, subcategory, warmth_min, temp_min_reco, temp_max_reco,
                   rain_ok, snow_ok, wind_ok
            FROM subcategory_specs
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let specs = rows
            .iter()
            .map(|row| -> Result<SubcategorySpec, sqlx::Error> {
                Ok(SubcategorySpec {
                    category: row.try_get("category")?,
                    subcategory: row.try_get("subcategory")?,
                    warmth_min: row.try_get("warmth_min")?,
                    temp_min_reco: row.try_get("temp_min_reco")?,
                    temp_max_reco: row.try_get("temp_max_reco")?,
                    rain_ok: row.try_get("rain_ok")?,
                    snow_ok: row.try_get("snow_ok")?,
                    wind_ok: row.try_get("wind_ok")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} subcategory specs", specs.len());

        Ok(specs)
    }
}

#[async_trait]
impl ClothingCatalog for PostgresCatalog {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<ClothingCandidate>, CatalogError> {
        let sql = r#"
            SELECT id, name, category, subcategory, gender, style, usage, season, base_colour,
                   formality_level, warmth_level, min_temp, max_temp, materials, fit, pattern,
                   icon_emoji, source, is_owned, created_at
            FROM clothing_items
            WHERE category = $1
              AND subcategory = ANY($2::text[])
              AND warmth_level >= $3
              AND $4 BETWEEN min_temp AND max_temp
            ORDER BY warmth_level DESC, formality_level ASC, id ASC
            LIMIT $5
        "#;

        let rows = sqlx::query(sql)
            .bind(&query.category)
            .bind(&query.subcategories)
            .bind(query.min_warmth)
            .bind(query.temperature)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match candidate_from_row(row)? {
                Some(item) => items.push(item),
                None => tracing::warn!(
                    "Skipping clothing item with unknown source: {:?}",
                    row.try_get::<i64, _>("id").ok()
                ),
            }
        }

        tracing::debug!(
            "Catalog returned {} items for category {}",
            items.len(),
            query.category
        );

        Ok(items)
    }
}

fn candidate_from_row(row: &PgRow) -> Result<Option<ClothingCandidate>, sqlx::Error> {
    let source: String = row.try_get("source")?;
    let Some(source) = Source::parse(&source) else {
        return Ok(None);
    };

    Ok(Some(ClothingCandidate {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        subcategory: row.try_get("subcategory")?,
        gender: row.try_get("gender")?,
        style: row.try_get("style")?,
        usage: row.try_get("usage")?,
        season: row.try_get("season")?,
        base_colour: row.try_get("base_colour")?,
        formality: row.try_get("formality_level")?,
        warmth: row.try_get("warmth_level")?,
        min_temp: row.try_get("min_temp")?,
        max_temp: row.try_get("max_temp")?,
        materials: row.try_get::<Option<Vec<String>>, _>("materials")?.unwrap_or_default(),
        fit: row.try_get("fit")?,
        pattern: row.try_get("pattern")?,
        icon: row.try_get("icon_emoji")?,
        source,
        is_owned: row.try_get("is_owned")?,
        created_at: row.try_get("created_at")?,
    }))
}
