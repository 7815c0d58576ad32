//! Candidate generation strategies
//!
//! Each generator independently turns a user's anchors (books already on
//! their shelves) into an ordered list of catalog items. Generators never see
//! each other's output; merging is the combiner's job.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    db::CatalogRepository,
    error::AppResult,
    models::{CandidateSet, CandidateSource, Item, ItemId, LibraryItem, UserId, WeightTable},
    services::{profiler::PreferenceProfile, similarity},
};

/// Everything a generator needs to know about the request
pub struct GenerationContext<'a> {
    pub user_id: UserId,
    pub anchors: &'a [LibraryItem],
    pub profile: &'a PreferenceProfile,
    pub weights: &'a WeightTable,
    /// Ids that must never be returned
    pub exclude: &'a HashSet<ItemId>,
    /// Maximum candidates to return
    pub limit: usize,
}

/// A single recommendation strategy
#[async_trait::async_trait]
pub trait CandidateGenerator: Send + Sync {
    /// Tag attached to every set this generator produces
    fn source(&self) -> CandidateSource;

    async fn generate(&self, ctx: &GenerationContext<'_>) -> AppResult<CandidateSet>;
}

/// Builds the standard four generators over one catalog
pub fn default_generators(
    catalog: Arc<dyn CatalogRepository>,
    similarity_threshold: f64,
) -> Vec<Box<dyn CandidateGenerator>> {
    vec![
        Box::new(HistoryGenerator::new(catalog.clone())),
        Box::new(CategoryGenerator::new(catalog.clone())),
        Box::new(SimilarityGenerator::new(catalog.clone(), similarity_threshold)),
        Box::new(TemporalGenerator::new(catalog)),
    ]
}

/// "More by these authors, more in these genres"
///
/// Seeds come from books the user actually engaged with (favorites, reads,
/// current reads). A library made only of want-to-read entries falls back to
/// all of them.
pub struct HistoryGenerator {
    catalog: Arc<dyn CatalogRepository>,
}

impl HistoryGenerator {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for HistoryGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::History
    }

    async fn generate(&self, ctx: &GenerationContext<'_>) -> AppResult<CandidateSet> {
        let mut seeds: Vec<&Item> = ctx
            .anchors
            .iter()
            .filter(|a| a.kind().is_engaged())
            .map(|a| &a.item)
            .collect();
        if seeds.is_empty() {
            seeds = ctx.anchors.iter().map(|a| &a.item).collect();
        }
        if seeds.is_empty() || ctx.limit == 0 {
            return Ok(CandidateSet::empty(self.source()));
        }

        let lead_author = ctx
            .profile
            .dominant_author
            .as_deref()
            .filter(|_| ctx.profile.author_loyal);
        let lead_genre = ctx
            .profile
            .dominant_genre
            .as_deref()
            .filter(|_| ctx.profile.genre_focused);

        let authors = distinct_values(seeds.iter().filter_map(|i| i.author()), lead_author);
        let genres = distinct_values(seeds.iter().filter_map(|i| i.genre()), lead_genre);

        let mut items = self
            .catalog
            .items_by_authors(&authors, ctx.exclude, ctx.limit)
            .await?;

        let remaining = ctx.limit.saturating_sub(items.len());
        if remaining > 0 && !genres.is_empty() {
            let mut exclude = ctx.exclude.clone();
            exclude.extend(items.iter().map(|i| i.id));
            items.extend(
                self.catalog
                    .items_by_genres(&genres, &exclude, remaining)
                    .await?,
            );
        }

        tracing::debug!(
            user_id = %ctx.user_id,
            authors = authors.len(),
            genres = genres.len(),
            candidates = items.len(),
            "History candidates generated"
        );

        Ok(CandidateSet::new(self.source(), items))
    }
}

/// Books sharing a category with any anchor
pub struct CategoryGenerator {
    catalog: Arc<dyn CatalogRepository>,
}

impl CategoryGenerator {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for CategoryGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::Category
    }

    async fn generate(&self, ctx: &GenerationContext<'_>) -> AppResult<CandidateSet> {
        let categories = distinct_values(ctx.anchors.iter().filter_map(|a| a.item.category()), None);
        if categories.is_empty() || ctx.limit == 0 {
            return Ok(CandidateSet::empty(self.source()));
        }

        let items = self
            .catalog
            .items_by_categories(&categories, ctx.exclude, ctx.limit)
            .await?;

        tracing::debug!(
            user_id = %ctx.user_id,
            categories = categories.len(),
            candidates = items.len(),
            "Category candidates generated"
        );

        Ok(CandidateSet::new(self.source(), items))
    }
}

/// Catalog items scored against every anchor with the adjusted weights
///
/// A candidate's score is its best match over all anchors; candidates below
/// the threshold are dropped and the rest are ranked best first.
pub struct SimilarityGenerator {
    catalog: Arc<dyn CatalogRepository>,
    threshold: f64,
}

impl SimilarityGenerator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, threshold: f64) -> Self {
        Self { catalog, threshold }
    }

    /// Ranks `pool` against `anchors`; pure so it can be exercised without a
    /// catalog
    pub fn rank(
        &self,
        anchors: &[LibraryItem],
        pool: Vec<Item>,
        weights: &WeightTable,
        limit: usize,
    ) -> Vec<(Item, f64)> {
        let mut scored: Vec<(Item, f64)> = pool
            .into_iter()
            .filter_map(|candidate| {
                let best = anchors
                    .iter()
                    .map(|a| similarity::score(&a.item, &candidate, weights))
                    .fold(0.0_f64, f64::max);
                (best >= self.threshold && best > 0.0).then_some((candidate, best))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.id.cmp(&b.0.id))
        });
        scored.truncate(limit);
        scored
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for SimilarityGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::Similarity
    }

    async fn generate(&self, ctx: &GenerationContext<'_>) -> AppResult<CandidateSet> {
        if ctx.anchors.is_empty() || ctx.limit == 0 {
            return Ok(CandidateSet::empty(self.source()));
        }

        let mut exclude = ctx.exclude.clone();
        exclude.extend(ctx.anchors.iter().map(|a| a.item.id));

        let pool = self.catalog.all_items_excluding(&exclude).await?;
        let pool_size = pool.len();
        let ranked = self.rank(ctx.anchors, pool, ctx.weights, ctx.limit);

        tracing::debug!(
            user_id = %ctx.user_id,
            anchors = ctx.anchors.len(),
            pool_size,
            kept = ranked.len(),
            threshold = self.threshold,
            "Similarity candidates generated"
        );

        Ok(CandidateSet::new(
            self.source(),
            ranked.into_iter().map(|(item, _)| item).collect(),
        ))
    }
}

/// Newest catalog additions, regardless of taste
pub struct TemporalGenerator {
    catalog: Arc<dyn CatalogRepository>,
}

impl TemporalGenerator {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl CandidateGenerator for TemporalGenerator {
    fn source(&self) -> CandidateSource {
        CandidateSource::Temporal
    }

    async fn generate(&self, ctx: &GenerationContext<'_>) -> AppResult<CandidateSet> {
        if ctx.limit == 0 {
            return Ok(CandidateSet::empty(self.source()));
        }

        let items = self.catalog.recent_items(ctx.exclude, ctx.limit).await?;
        Ok(CandidateSet::new(self.source(), items))
    }
}

/// Case-insensitively distinct values in first-seen order, with `lead`
/// moved to the front when present
fn distinct_values<'a>(values: impl Iterator<Item = &'a str>, lead: Option<&'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for value in lead.into_iter().chain(values) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.to_lowercase()) {
            out.push(value.to_string());
        }
    }

    out
}
