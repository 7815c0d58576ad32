use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use crate::{
    db::{CatalogRepository, LibraryRepository},
    error::{AppError, AppResult},
    models::{CandidateSet, Item, ItemId, LibraryItem, ShelfKind, UserId, WeightTable},
    services::{
        combiner,
        generators::{default_generators, CandidateGenerator, GenerationContext},
        profiler::{self, PreferenceProfile, ProfilerSettings},
        similarity,
        weights::{self, AdjusterSettings},
    },
};

/// Tuning knobs for the whole pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderSettings {
    pub profiler: ProfilerSettings,
    pub adjuster: AdjusterSettings,
    /// Minimum similarity for the similarity generator to keep a candidate
    pub similarity_threshold: f64,
    /// Candidates each generator is asked for (raised to the request limit)
    pub candidates_per_source: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            profiler: ProfilerSettings::default(),
            adjuster: AdjusterSettings::default(),
            similarity_threshold: 0.15,
            candidates_per_source: 20,
        }
    }
}

/// Diagnostic view of how a user's library shapes scoring
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub user_id: UserId,
    pub library_size: usize,
    pub profile: PreferenceProfile,
    pub weights: WeightTable,
}

/// User library resolved against the catalog
struct ResolvedLibrary {
    items: Vec<LibraryItem>,
    /// Every shelved id, including ones missing from the catalog
    shelved: HashSet<ItemId>,
    favorites: HashSet<ItemId>,
}

/// End-to-end recommendation pipeline
///
/// Stateless between calls: every request re-reads the library, recomputes the
/// profile and weights, and runs the generators afresh. Safe to share behind
/// an `Arc` across handlers.
pub struct Recommender {
    catalog: Arc<dyn CatalogRepository>,
    library: Arc<dyn LibraryRepository>,
    generators: Vec<Box<dyn CandidateGenerator>>,
    base_weights: WeightTable,
    settings: RecommenderSettings,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        library: Arc<dyn LibraryRepository>,
        base_weights: WeightTable,
        settings: RecommenderSettings,
    ) -> Self {
        let generators = default_generators(catalog.clone(), settings.similarity_threshold);
        Self {
            catalog,
            library,
            generators,
            base_weights,
            settings,
        }
    }

    /// Replaces the generator lineup
    pub fn with_generators(mut self, generators: Vec<Box<dyn CandidateGenerator>>) -> Self {
        self.generators = generators;
        self
    }

    pub fn base_weights(&self) -> &WeightTable {
        &self.base_weights
    }

    /// Recommendations for `user_id`, at most `limit` long
    ///
    /// The result varies between calls; use
    /// [`Self::get_recommendations_with_rng`] for reproducible output.
    pub async fn get_recommendations(&self, user_id: UserId, limit: usize) -> AppResult<Vec<Item>> {
        let mut rng = StdRng::from_entropy();
        self.get_recommendations_with_rng(user_id, limit, &mut rng)
            .await
    }

    #[instrument(skip(self, rng), fields(user_id = %user_id))]
    pub async fn get_recommendations_with_rng<R: Rng + Send + ?Sized>(
        &self,
        user_id: UserId,
        limit: usize,
        rng: &mut R,
    ) -> AppResult<Vec<Item>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let start = Instant::now();

        let library = self.resolve_library(user_id).await?;
        let profile = profiler::analyze(&library.items, &self.settings.profiler);
        let weights = weights::adjust(&self.base_weights, &profile, &self.settings.adjuster);

        let ctx = GenerationContext {
            user_id,
            anchors: &library.items,
            profile: &profile,
            weights: &weights,
            exclude: &library.shelved,
            limit: self.settings.candidates_per_source.max(limit),
        };

        let sets = self.run_generators(&ctx).await;
        let result = combiner::combine(&sets, &library.shelved, &library.favorites, limit, rng);

        tracing::debug!(
            attribution = ?combiner::attribute_sources(&sets, &result),
            "Recommendation sources"
        );
        tracing::info!(
            library_size = library.items.len(),
            author_loyal = profile.author_loyal,
            genre_focused = profile.genre_focused,
            returned = result.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendations generated"
        );

        Ok(result)
    }

    /// Similarity of two items under the base weights
    pub fn calculate_similarity_score(&self, a: &Item, b: &Item) -> f64 {
        similarity::score(a, b, &self.base_weights)
    }

    /// Looks both items up and scores them under the base weights
    pub async fn similarity_between(&self, a: ItemId, b: ItemId) -> AppResult<f64> {
        let items = self.catalog.items_by_ids(&[a, b]).await?;
        let find = |id: ItemId| {
            items
                .iter()
                .find(|i| i.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))
        };

        Ok(self.calculate_similarity_score(find(a)?, find(b)?))
    }

    /// Profile and adjusted weights the next request for `user_id` would use
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn profile_for(&self, user_id: UserId) -> AppResult<ProfileReport> {
        let library = self.resolve_library(user_id).await?;
        let profile = profiler::analyze(&library.items, &self.settings.profiler);
        let weights = weights::adjust(&self.base_weights, &profile, &self.settings.adjuster);

        Ok(ProfileReport {
            user_id,
            library_size: library.items.len(),
            profile,
            weights,
        })
    }

    /// Runs every generator concurrently, dropping the ones that fail
    async fn run_generators(&self, ctx: &GenerationContext<'_>) -> Vec<CandidateSet> {
        let outcomes = join_all(self.generators.iter().map(|g| g.generate(ctx))).await;

        let mut sets = Vec::with_capacity(outcomes.len());
        let mut failures = 0;

        for (generator, outcome) in self.generators.iter().zip(outcomes) {
            match outcome {
                Ok(set) => {
                    tracing::debug!(source = %set.source, candidates = set.len(), "Generator finished");
                    sets.push(set);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        source = %generator.source(),
                        catalog = self.catalog.name(),
                        error = %e,
                        "Candidate generator failed"
                    );
                }
            }
        }

        if failures > 0 {
            tracing::warn!(
                success_count = sets.len(),
                error_count = failures,
                "Partial candidate generation failure"
            );
        }

        sets
    }

    async fn resolve_library(&self, user_id: UserId) -> AppResult<ResolvedLibrary> {
        let (entries, favorites) = tokio::try_join!(
            self.library.entries_for_user(user_id, None),
            self.library.entries_for_user(user_id, Some(ShelfKind::Favorite)),
        )?;

        let ids: Vec<ItemId> = entries.iter().map(|e| e.item_id).collect();
        let mut by_id: HashMap<ItemId, Item> = self
            .catalog
            .items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match by_id.remove(&entry.item_id) {
                Some(item) => items.push(LibraryItem { entry, item }),
                None => tracing::debug!(item_id = %entry.item_id, "Shelved item missing from catalog"),
            }
        }

        Ok(ResolvedLibrary {
            items,
            shelved: ids.into_iter().collect(),
            favorites: favorites.into_iter().map(|e| e.item_id).collect(),
        })
    }
}
