use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandidateQuery, ClothingCandidate, ItemValidationError, SubcategorySpec};

/// Errors raised by the read-only data providers
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid clothing item {id}: {source}")]
    InvalidItem {
        id: i64,
        #[source]
        source: ItemValidationError,
    },

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Source of the subcategory reference table
#[async_trait]
pub trait SubcategorySpecProvider: Send + Sync {
    async fn list_all(&self) -> Result<Vec<SubcategorySpec>, CatalogError>;
}

/// Source of concrete clothing items
#[async_trait]
pub trait ClothingCatalog: Send + Sync {
    /// Items matching every filter of `query`, ordered by warmth descending,
    /// then formality ascending, then id ascending, at most `query.limit`.
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<ClothingCandidate>, CatalogError>;
}

/// Fixed spec table held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySpecs {
    specs: Vec<SubcategorySpec>,
}

impl InMemorySpecs {
    pub fn new(specs: Vec<SubcategorySpec>) -> Self {
        Self { specs }
    }
}

#[async_trait]
impl SubcategorySpecProvider for InMemorySpecs {
    async fn list_all(&self) -> Result<Vec<SubcategorySpec>, CatalogError> {
        Ok(self.specs.clone())
    }
}

/// Clothing catalog held in memory, validated on construction
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<ClothingCandidate>,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<ClothingCandidate>) -> Result<Self, CatalogError> {
        for item in &items {
            item.validate()
                .map_err(|source| CatalogError::InvalidItem { id: item.id, source })?;
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ClothingCatalog for InMemoryCatalog {
    async fn find_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<ClothingCandidate>, CatalogError> {
        let mut found: Vec<ClothingCandidate> = self
            .items
            .iter()
            .filter(|item| query.matches(item))
            .cloned()
            .collect();

        found.sort_by(|a, b| {
            b.warmth
                .cmp(&a.warmth)
                .then_with(|| a.formality.cmp(&b.formality))
                .then_with(|| a.id.cmp(&b.id))
        });
        found.truncate(query.limit);

        Ok(found)
    }
}

/// Time-to-live cache in front of a spec provider. The spec table is
/// immutable reference data, so one entry covers every request.
pub struct CachedSpecProvider {
    inner: Arc<dyn SubcategorySpecProvider>,
    cache: moka::future::Cache<(), Arc<Vec<SubcategorySpec>>>,
}

impl CachedSpecProvider {
    pub fn new(inner: Arc<dyn SubcategorySpecProvider>, ttl: Duration) -> Self {
        let cache = moka::future::CacheBuilder::new(1).time_to_live(ttl).build();
        Self { inner, cache }
    }

    /// Drop the cached table so the next read goes to the inner provider
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}

#[async_trait]
impl SubcategorySpecProvider for CachedSpecProvider {
    async fn list_all(&self) -> Result<Vec<SubcategorySpec>, CatalogError> {
        let inner = self.inner.clone();
        let specs = self
            .cache
            .try_get_with((), async move { inner.list_all().await.map(Arc::new) })
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        tracing::trace!("Serving {} subcategory specs from cache", specs.len());
        Ok(specs.as_ref().clone())
    }
}
