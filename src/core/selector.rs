use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{CandidateQuery, ClothingCandidate, OutfitPlan, SubcategorySpec};
use crate::services::catalog::ClothingCatalog;

/// Default number of catalog items fetched per plan category
pub const CANDIDATES_PER_CATEGORY: usize = 50;

/// Turns an outfit plan into concrete clothing items
///
/// # Pipeline Stages
/// 1. Build one catalog query per plan category
/// 2. Fetch matching items (a failing category is skipped)
/// 3. Re-check each item's comfort range against the ambient temperature
#[derive(Clone)]
pub struct CandidateSelector {
    catalog: Arc<dyn ClothingCatalog>,
    per_category_limit: usize,
    max_candidates: usize,
}

impl CandidateSelector {
    pub fn new(catalog: Arc<dyn ClothingCatalog>, per_category_limit: usize, max_candidates: usize) -> Self {
        Self {
            catalog,
            per_category_limit,
            max_candidates,
        }
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Candidates grouped by plan category, each group in catalog order
    pub async fn select_by_category(
        &self,
        plan: &OutfitPlan,
        temperature: f64,
    ) -> BTreeMap<String, Vec<ClothingCandidate>> {
        let mut selected = BTreeMap::new();

        for (category, specs) in &plan.plan {
            let Some(query) = build_query(category, specs, temperature, self.per_category_limit) else {
                continue;
            };

            let items = match self.catalog.find_candidates(&query).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Catalog lookup failed for category {}: {}", category, e);
                    continue;
                }
            };

            let fetched = items.len();
            let kept = prefilter(items, temperature);
            if kept.len() < fetched {
                tracing::debug!(
                    "Prefilter dropped {} of {} items in {}",
                    fetched - kept.len(),
                    fetched,
                    category
                );
            }

            selected.insert(category.clone(), kept);
        }

        selected
    }

    /// All candidates in category order, capped at `max_candidates`.
    ///
    /// The cap is shared out across categories, so a large early category
    /// cannot crowd out the later ones.
    pub async fn select(&self, plan: &OutfitPlan, temperature: f64) -> Vec<ClothingCandidate> {
        let groups: Vec<Vec<ClothingCandidate>> = self
            .select_by_category(plan, temperature)
            .await
            .into_values()
            .collect();

        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        let total: usize = sizes.iter().sum();
        let quotas = fair_quotas(&sizes, self.max_candidates);

        if total > self.max_candidates {
            tracing::debug!(
                "Capping {} candidates to {} across {} categories",
                total,
                self.max_candidates,
                groups.len()
            );
        }

        groups
            .into_iter()
            .zip(quotas)
            .flat_map(|(group, quota)| group.into_iter().take(quota))
            .collect()
    }
}

/// Split `cap` slots across groups of the given sizes.
///
/// Each round hands every unfilled group an even share of what is left;
/// slots a small group cannot use flow to the others on the next round.
pub fn fair_quotas(sizes: &[usize], cap: usize) -> Vec<usize> {
    let mut quotas = vec![0usize; sizes.len()];
    let mut remaining = cap.min(sizes.iter().sum());

    while remaining > 0 {
        let open: Vec<usize> = (0..sizes.len()).filter(|&i| quotas[i] < sizes[i]).collect();
        if open.is_empty() {
            break;
        }

        let share = (remaining / open.len()).max(1);
        for i in open {
            let grant = share.min(sizes[i] - quotas[i]).min(remaining);
            quotas[i] += grant;
            remaining -= grant;
            if remaining == 0 {
                break;
            }
        }
    }

    quotas
}

/// Catalog query for one plan category, or `None` for an empty bucket
pub fn build_query(
    category: &str,
    specs: &[SubcategorySpec],
    temperature: f64,
    limit: usize,
) -> Option<CandidateQuery> {
    let min_warmth = specs.iter().map(|s| s.warmth_min).min()?;

    Some(CandidateQuery {
        category: category.to_string(),
        subcategories: specs.iter().map(|s| s.subcategory.clone()).collect(),
        min_warmth,
        temperature: catalog_temperature(temperature),
        limit,
    })
}

/// Drop items whose own range does not contain `temperature`
pub fn prefilter(items: Vec<ClothingCandidate>, temperature: f64) -> Vec<ClothingCandidate> {
    items
        .into_iter()
        .filter(|item| item.suits_temperature(temperature))
        .collect()
}

/// Catalog columns are whole degrees
#[inline]
fn catalog_temperature(temperature: f64) -> i16 {
    temperature
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
