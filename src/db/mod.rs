//! Data-access collaborators of the recommendation core
//!
//! The core never talks to storage directly. It asks these traits for items
//! and library entries, which lets the same scoring code run against the
//! in-memory stores (tests, seeded demos) and Postgres.

use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{Item, ItemId, LibraryEntry, ShelfKind, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryCatalog, MemoryLibrary, SeedData};
pub use postgres::{create_pool, PgCatalog, PgLibrary};

/// Read access to the book catalog
///
/// Filter lookups match case-insensitively, skip every id in `exclude`, and
/// return at most `limit` items.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fetch items by id; unknown ids are silently skipped
    async fn items_by_ids(&self, ids: &[ItemId]) -> AppResult<Vec<Item>>;

    /// Items written by any of `authors`, in the order the authors are given,
    /// newest first within an author
    async fn items_by_authors(
        &self,
        authors: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>>;

    /// Items in any of `genres`, ordered like [`Self::items_by_authors`]
    async fn items_by_genres(
        &self,
        genres: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>>;

    /// Items in any of `categories`, ordered like [`Self::items_by_authors`]
    async fn items_by_categories(
        &self,
        categories: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>>;

    /// Most recently added items, newest first
    async fn recent_items(&self, exclude: &HashSet<ItemId>, limit: usize) -> AppResult<Vec<Item>>;

    /// Every item not in `exclude`
    async fn all_items_excluding(&self, exclude: &HashSet<ItemId>) -> AppResult<Vec<Item>>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Read access to users' shelves
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryRepository: Send + Sync {
    /// A user's entries, optionally restricted to one shelf
    async fn entries_for_user(
        &self,
        user_id: UserId,
        kind: Option<ShelfKind>,
    ) -> AppResult<Vec<LibraryEntry>>;
}
