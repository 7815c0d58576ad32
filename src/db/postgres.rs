//! Postgres-backed catalog and library
//!
//! Expects the tables owned by the surrounding application:
//!
//! ```sql
//! items (id BIGINT PRIMARY KEY, title TEXT NOT NULL, author TEXT, genre TEXT,
//!        category TEXT, themes TEXT, description TEXT, created_at TIMESTAMPTZ NOT NULL)
//! library_entries (user_id BIGINT, item_id BIGINT REFERENCES items(id), kind TEXT NOT NULL,
//!                  added_at TIMESTAMPTZ NOT NULL, PRIMARY KEY (user_id, item_id))
//! ```

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::collections::HashSet;

use super::{CatalogRepository, LibraryRepository};
use crate::{
    error::AppResult,
    models::{Item, ItemId, LibraryEntry, ShelfKind, UserId},
};

const ITEM_COLUMNS: &str = "id, title, author, genre, category, themes, description, created_at";

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    title: String,
    author: Option<String>,
    genre: Option<String>,
    category: Option<String>,
    themes: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: ItemId(row.id),
            title: row.title,
            author: row.author.unwrap_or_default(),
            genre: row.genre,
            category: row.category,
            themes: row.themes,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LibraryRow {
    user_id: i64,
    item_id: i64,
    kind: String,
    added_at: DateTime<Utc>,
}

impl TryFrom<LibraryRow> for LibraryEntry {
    type Error = crate::error::AppError;

    fn try_from(row: LibraryRow) -> Result<Self, Self::Error> {
        Ok(LibraryEntry {
            user_id: UserId(row.user_id),
            item_id: ItemId(row.item_id),
            kind: row.kind.parse()?,
            added_at: row.added_at,
        })
    }
}

fn raw_ids(ids: impl IntoIterator<Item = ItemId>) -> Vec<i64> {
    ids.into_iter().map(|id| id.0).collect()
}

fn normalized(keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Catalog reads against the `items` table
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Shared shape of the author/genre/category lookups
    async fn matching(
        &self,
        column: &'static str,
        keys: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        let keys = normalized(keys);
        if keys.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM items
            WHERE lower(trim({column})) = ANY($1)
              AND NOT (id = ANY($2))
            ORDER BY array_position($1, lower(trim({column}))), created_at DESC, id
            LIMIT $3
            "#
        );

        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(keys)
            .bind(raw_ids(exclude.iter().copied()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }
}

#[async_trait::async_trait]
impl CatalogRepository for PgCatalog {
    async fn items_by_ids(&self, ids: &[ItemId]) -> AppResult<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(raw_ids(ids.iter().copied()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn items_by_authors(
        &self,
        authors: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        self.matching("author", authors, exclude, limit).await
    }

    async fn items_by_genres(
        &self,
        genres: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        self.matching("genre", genres, exclude, limit).await
    }

    async fn items_by_categories(
        &self,
        categories: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        self.matching("category", categories, exclude, limit).await
    }

    async fn recent_items(&self, exclude: &HashSet<ItemId>, limit: usize) -> AppResult<Vec<Item>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE NOT (id = ANY($1)) \
             ORDER BY created_at DESC, id LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(raw_ids(exclude.iter().copied()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn all_items_excluding(&self, exclude: &HashSet<ItemId>) -> AppResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE NOT (id = ANY($1)) ORDER BY id");
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(raw_ids(exclude.iter().copied()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// Library reads against the `library_entries` table
#[derive(Clone)]
pub struct PgLibrary {
    pool: PgPool,
}

impl PgLibrary {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LibraryRepository for PgLibrary {
    async fn entries_for_user(
        &self,
        user_id: UserId,
        kind: Option<ShelfKind>,
    ) -> AppResult<Vec<LibraryEntry>> {
        let rows = sqlx::query_as::<_, LibraryRow>(
            r#"
            SELECT user_id, item_id, kind, added_at
            FROM library_entries
            WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)
            ORDER BY added_at DESC
            "#,
        )
        .bind(user_id.0)
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LibraryEntry::try_from).collect()
    }
}
