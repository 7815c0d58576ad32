use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;

use super::{CatalogRepository, LibraryRepository};
use crate::{
    error::{AppError, AppResult},
    models::{Item, ItemId, LibraryEntry, RawItem, ShelfKind, UserId},
};

/// Catalog held in process memory
#[derive(Default)]
pub struct MemoryCatalog {
    items: RwLock<BTreeMap<ItemId, Item>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|i| (i.id, i)).collect()),
        }
    }

    pub async fn item_count(&self) -> usize {
        self.items.read().await.len()
    }

    /// Items whose attribute (picked by `field`) equals one of `keys`,
    /// grouped by key order and newest first within a key
    async fn matching(
        &self,
        keys: &[String],
        field: fn(&Item) -> Option<&str>,
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> Vec<Item> {
        let items = self.items.read().await;
        let mut seen: HashSet<ItemId> = HashSet::new();
        let mut results = Vec::new();

        for key in keys {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }

            let mut group: Vec<&Item> = items
                .values()
                .filter(|i| !exclude.contains(&i.id) && !seen.contains(&i.id))
                .filter(|i| field(*i).map(|v| v.to_lowercase() == key).unwrap_or(false))
                .collect();
            group.sort_by(|a, b| newest_first(a, b));

            for item in group {
                if results.len() >= limit {
                    return results;
                }
                seen.insert(item.id);
                results.push(item.clone());
            }
        }

        results
    }
}

fn newest_first(a: &Item, b: &Item) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))
}

#[async_trait::async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn items_by_ids(&self, ids: &[ItemId]) -> AppResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(ids.iter().filter_map(|id| items.get(id).cloned()).collect())
    }

    async fn items_by_authors(
        &self,
        authors: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        Ok(self.matching(authors, Item::author, exclude, limit).await)
    }

    async fn items_by_genres(
        &self,
        genres: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        Ok(self.matching(genres, Item::genre, exclude, limit).await)
    }

    async fn items_by_categories(
        &self,
        categories: &[String],
        exclude: &HashSet<ItemId>,
        limit: usize,
    ) -> AppResult<Vec<Item>> {
        Ok(self.matching(categories, Item::category, exclude, limit).await)
    }

    async fn recent_items(&self, exclude: &HashSet<ItemId>, limit: usize) -> AppResult<Vec<Item>> {
        let items = self.items.read().await;
        let mut recent: Vec<&Item> = items.values().filter(|i| !exclude.contains(&i.id)).collect();
        recent.sort_by(|a, b| newest_first(a, b));
        Ok(recent.into_iter().take(limit).cloned().collect())
    }

    async fn all_items_excluding(&self, exclude: &HashSet<ItemId>) -> AppResult<Vec<Item>> {
        let items = self.items.read().await;
        Ok(items
            .values()
            .filter(|i| !exclude.contains(&i.id))
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Shelves held in process memory
#[derive(Default)]
pub struct MemoryLibrary {
    entries: RwLock<HashMap<UserId, Vec<LibraryEntry>>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shelves a book, moving it if the user already shelved it elsewhere
    pub async fn add(&self, entry: LibraryEntry) {
        let mut entries = self.entries.write().await;
        let shelf = entries.entry(entry.user_id).or_default();

        if let Some(existing) = shelf.iter_mut().find(|e| e.item_id == entry.item_id) {
            existing.kind = entry.kind;
            existing.added_at = entry.added_at;
        } else {
            shelf.push(entry);
        }
    }
}

#[async_trait::async_trait]
impl LibraryRepository for MemoryLibrary {
    async fn entries_for_user(
        &self,
        user_id: UserId,
        kind: Option<ShelfKind>,
    ) -> AppResult<Vec<LibraryEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&user_id)
            .map(|shelf| {
                shelf
                    .iter()
                    .filter(|e| kind.map(|k| e.kind == k).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ============================================================================
// Seed files
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawLibraryEntry {
    user_id: i64,
    item_id: i64,
    kind: String,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
}

/// Contents of a JSON seed file: `{"items": [...], "library": [...]}`
#[derive(Debug, Default)]
pub struct SeedData {
    pub items: Vec<Item>,
    pub library: Vec<LibraryEntry>,
}

impl SeedData {
    /// Parses seed JSON, normalizing every raw record
    pub fn from_json(json: &str) -> AppResult<Self> {
        #[derive(Deserialize)]
        struct SeedFile {
            #[serde(default)]
            items: Vec<RawItem>,
            #[serde(default)]
            library: Vec<RawLibraryEntry>,
        }

        let file: SeedFile = serde_json::from_str(json)
            .map_err(|e| AppError::InvalidInput(format!("Malformed seed file: {}", e)))?;

        let items = file
            .items
            .into_iter()
            .map(Item::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let library = file
            .library
            .into_iter()
            .map(|raw| -> AppResult<LibraryEntry> {
                Ok(LibraryEntry {
                    user_id: UserId(raw.user_id),
                    item_id: ItemId(raw.item_id),
                    kind: raw.kind.parse()?,
                    added_at: raw.added_at.unwrap_or_else(Utc::now),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { items, library })
    }

    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await?;
        let seed = Self::from_json(&json)
            .map_err(|e| anyhow::anyhow!("Failed to load seed {}: {}", path.display(), e))?;

        tracing::info!(
            path = %path.display(),
            items = seed.items.len(),
            library_entries = seed.library.len(),
            "Loaded seed data"
        );

        Ok(seed)
    }

    /// Builds populated in-memory stores
    pub async fn into_stores(self) -> (MemoryCatalog, MemoryLibrary) {
        let catalog = MemoryCatalog::with_items(self.items);
        let library = MemoryLibrary::new();
        for entry in self.library {
            library.add(entry).await;
        }
        (catalog, library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn catalog() -> MemoryCatalog {
        let now = Utc::now();
        MemoryCatalog::with_items([
            Item::new(1, "Emma", "Jane Austen")
                .with_genre("Romance")
                .with_created_at(now - Duration::days(30)),
            Item::new(2, "Persuasion", "jane austen")
                .with_genre("Romance")
                .with_created_at(now - Duration::days(1)),
            Item::new(3, "Dracula", "Bram Stoker")
                .with_genre("Horror")
                .with_category("Classics")
                .with_created_at(now - Duration::days(10)),
            Item::new(4, "Carmilla", "Sheridan Le Fanu")
                .with_genre("Horror")
                .with_category("classics")
                .with_created_at(now),
        ])
    }

    #[tokio::test]
    async fn test_items_by_ids_skips_unknown() {
        let items = catalog().items_by_ids(&[ItemId(3), ItemId(99)]).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Dracula");
    }

    #[tokio::test]
    async fn test_items_by_authors_case_insensitive_newest_first() {
        let items = catalog()
            .items_by_authors(&["JANE AUSTEN".to_string()], &HashSet::new(), 10)
            .await
            .unwrap();
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![ItemId(2), ItemId(1)]);
    }

    #[tokio::test]
    async fn test_filters_respect_exclusions_and_limit() {
        let exclude: HashSet<ItemId> = [ItemId(4)].into_iter().collect();
        let items = catalog()
            .items_by_categories(&["Classics".to_string()], &exclude, 10)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, ItemId(3));

        let limited = catalog()
            .items_by_genres(&["horror".to_string(), "romance".to_string()], &HashSet::new(), 3)
            .await
            .unwrap();
        let ids: Vec<ItemId> = limited.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![ItemId(4), ItemId(3), ItemId(2)]);
    }

    #[tokio::test]
    async fn test_recent_items_newest_first() {
        let items = catalog().recent_items(&HashSet::new(), 2).await.unwrap();
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![ItemId(4), ItemId(2)]);
    }

    #[tokio::test]
    async fn test_library_add_moves_existing_entry() {
        let library = MemoryLibrary::new();
        library
            .add(LibraryEntry::new(UserId(1), ItemId(1), ShelfKind::WantToRead))
            .await;
        library
            .add(LibraryEntry::new(UserId(1), ItemId(1), ShelfKind::Favorite))
            .await;

        let all = library.entries_for_user(UserId(1), None).await.unwrap();
        assert_eq!(all.len(), 1);

        let favorites = library
            .entries_for_user(UserId(1), Some(ShelfKind::Favorite))
            .await
            .unwrap();
        assert_eq!(favorites.len(), 1);

        let nobody = library.entries_for_user(UserId(2), None).await.unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_seed_data_round_trip_into_stores() {
        let json = r#"{
            "items": [
                {"id": 1, "title": "Emma", "author": "Jane Austen", "genre": "Romance"},
                {"id": "2", "name": "Dracula", "author_name": "Bram Stoker"}
            ],
            "library": [
                {"user_id": 7, "item_id": 1, "kind": "favorite"}
            ]
        }"#;

        let seed = SeedData::from_json(json).unwrap();
        assert_eq!(seed.items.len(), 2);

        let (catalog, library) = seed.into_stores().await;
        assert_eq!(catalog.item_count().await, 2);
        let entries = library.entries_for_user(UserId(7), None).await.unwrap();
        assert_eq!(entries[0].kind, ShelfKind::Favorite);
    }

    #[test]
    fn test_seed_with_bad_shelf_is_rejected() {
        let json = r#"{"library": [{"user_id": 1, "item_id": 1, "kind": "lent"}]}"#;
        assert!(SeedData::from_json(json).is_err());
    }
}
