use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Attribute, WeightTable},
    services::{AdjusterSettings, ProfilerSettings, RecommenderSettings},
};

/// Upper bound on the combined themes + description share of the weights
pub const MAX_TOKEN_SHARE: f64 = 0.3;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; in-memory stores are used when absent
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// JSON seed for the in-memory stores
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    // Profiling thresholds
    #[serde(default = "default_min_library_size")]
    pub min_library_size: usize,
    #[serde(default = "default_author_loyalty_ratio")]
    pub author_loyalty_ratio: f64,
    #[serde(default = "default_genre_focus_max_genres")]
    pub genre_focus_max_genres: usize,
    #[serde(default = "default_genre_focus_min_items")]
    pub genre_focus_min_items: usize,
    #[serde(default = "default_weight_boost")]
    pub weight_boost: f64,

    // Candidate generation
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_candidates_per_source")]
    pub candidates_per_source: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    // Base attribute weights
    #[serde(default = "default_weight_genre")]
    pub weight_genre: f64,
    #[serde(default = "default_weight_author")]
    pub weight_author: f64,
    #[serde(default = "default_weight_category")]
    pub weight_category: f64,
    #[serde(default = "default_weight_themes")]
    pub weight_themes: f64,
    #[serde(default = "default_weight_description")]
    pub weight_description: f64,
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_min_library_size() -> usize {
    3
}

fn default_author_loyalty_ratio() -> f64 {
    0.4
}

fn default_genre_focus_max_genres() -> usize {
    2
}

fn default_genre_focus_min_items() -> usize {
    5
}

fn default_weight_boost() -> f64 {
    0.3
}

fn default_similarity_threshold() -> f64 {
    0.15
}

fn default_candidates_per_source() -> usize {
    20
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    50
}

fn default_weight_genre() -> f64 {
    0.30
}

fn default_weight_author() -> f64 {
    0.25
}

fn default_weight_category() -> f64 {
    0.20
}

fn default_weight_themes() -> f64 {
    0.15
}

fn default_weight_description() -> f64 {
    0.10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: default_db_max_connections(),
            seed_path: None,
            host: default_host(),
            port: default_port(),
            min_library_size: default_min_library_size(),
            author_loyalty_ratio: default_author_loyalty_ratio(),
            genre_focus_max_genres: default_genre_focus_max_genres(),
            genre_focus_min_items: default_genre_focus_min_items(),
            weight_boost: default_weight_boost(),
            similarity_threshold: default_similarity_threshold(),
            candidates_per_source: default_candidates_per_source(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            weight_genre: default_weight_genre(),
            weight_author: default_weight_author(),
            weight_category: default_weight_category(),
            weight_themes: default_weight_themes(),
            weight_description: default_weight_description(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Base weight table
    ///
    /// Besides the table's own checks, themes and description together must
    /// stay below `MAX_TOKEN_SHARE` of the total so items with nothing but
    /// overlapping text in common keep scoring low.
    pub fn weight_table(&self) -> AppResult<WeightTable> {
        let table = WeightTable::new([
            (Attribute::Genre, self.weight_genre),
            (Attribute::Author, self.weight_author),
            (Attribute::Category, self.weight_category),
            (Attribute::Themes, self.weight_themes),
            (Attribute::Description, self.weight_description),
        ])?;

        let token_share =
            (table.get(Attribute::Themes) + table.get(Attribute::Description)) / table.total();
        if token_share >= MAX_TOKEN_SHARE {
            return Err(invalid(&format!(
                "WEIGHT_THEMES + WEIGHT_DESCRIPTION must be below {} of the total weight, got {:.2}",
                MAX_TOKEN_SHARE, token_share
            )));
        }

        Ok(table)
    }

    /// Validated pipeline settings
    pub fn recommender_settings(&self) -> AppResult<RecommenderSettings> {
        if !(0.0..=1.0).contains(&self.author_loyalty_ratio) {
            return Err(invalid("AUTHOR_LOYALTY_RATIO must be within [0, 1]"));
        }
        if !(self.weight_boost > 0.0 && self.weight_boost < 1.0) {
            return Err(invalid("WEIGHT_BOOST must be within (0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid("SIMILARITY_THRESHOLD must be within [0, 1]"));
        }
        if self.genre_focus_max_genres == 0 {
            return Err(invalid("GENRE_FOCUS_MAX_GENRES must be at least 1"));
        }
        if self.candidates_per_source == 0 {
            return Err(invalid("CANDIDATES_PER_SOURCE must be at least 1"));
        }

        Ok(RecommenderSettings {
            profiler: ProfilerSettings {
                min_library_size: self.min_library_size,
                author_loyalty_ratio: self.author_loyalty_ratio,
                genre_focus_max_genres: self.genre_focus_max_genres,
                genre_focus_min_items: self.genre_focus_min_items,
            },
            adjuster: AdjusterSettings {
                boost: self.weight_boost,
            },
            similarity_threshold: self.similarity_threshold,
            candidates_per_source: self.candidates_per_source,
        })
    }

    /// Limit bounds used by the HTTP layer
    pub fn limits(&self) -> AppResult<(usize, usize)> {
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(invalid("DEFAULT_LIMIT must be between 1 and MAX_LIMIT"));
        }
        Ok((self.default_limit, self.max_limit))
    }
}

fn invalid(msg: &str) -> AppError {
    AppError::InvalidConfiguration(msg.to_string())
}
