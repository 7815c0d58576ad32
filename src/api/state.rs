use std::sync::Arc;

use crate::{
    config::Config,
    db::{self, CatalogRepository, LibraryRepository, MemoryCatalog, MemoryLibrary, SeedData},
    services::Recommender,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Used when a request omits `limit`
    pub default_limit: usize,
    /// Requests above this are rejected
    pub max_limit: usize,
}

impl AppState {
    pub fn new(recommender: Arc<Recommender>, default_limit: usize, max_limit: usize) -> Self {
        Self {
            recommender,
            default_limit,
            max_limit,
        }
    }

    /// Wires repositories and the recommender from configuration
    ///
    /// Uses Postgres when `DATABASE_URL` is set, otherwise in-memory stores
    /// populated from `SEED_PATH` if present.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let settings = config.recommender_settings()?;
        let weights = config.weight_table()?;
        let (default_limit, max_limit) = config.limits()?;

        let (catalog, library): (Arc<dyn CatalogRepository>, Arc<dyn LibraryRepository>) =
            match &config.database_url {
                Some(url) => {
                    let pool = db::create_pool(url, config.db_max_connections).await?;
                    tracing::info!("Connected to Postgres");
                    (
                        Arc::new(db::PgCatalog::new(pool.clone())),
                        Arc::new(db::PgLibrary::new(pool)),
                    )
                }
                None => {
                    let (catalog, library) = match &config.seed_path {
                        Some(path) => SeedData::from_path(path).await?.into_stores().await,
                        None => {
                            tracing::warn!("No DATABASE_URL or SEED_PATH set; starting with empty stores");
                            (MemoryCatalog::new(), MemoryLibrary::new())
                        }
                    };
                    tracing::info!(items = catalog.item_count().await, "In-memory catalog loaded");
                    (Arc::new(catalog), Arc::new(library))
                }
            };

        tracing::info!(catalog = catalog.name(), "Catalog ready");

        let recommender = Recommender::new(catalog, library, weights, settings);
        Ok(Self::new(Arc::new(recommender), default_limit, max_limit))
    }
}
