use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::AppError;

/// Catalog identifier for a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        ItemId(id)
    }
}

/// A catalog book as seen by the recommendation core
///
/// Every descriptive attribute may be empty. Scoring treats an empty
/// attribute as carrying no information rather than as an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub category: Option<String>,
    /// Comma-delimited theme tokens, e.g. "friendship, war, coming of age"
    pub themes: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Creates an item with only the required fields populated
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            genre: None,
            category: None,
            themes: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_themes(mut self, themes: impl Into<String>) -> Self {
        self.themes = Some(themes.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Author, or `None` when blank
    pub fn author(&self) -> Option<&str> {
        non_blank(Some(self.author.as_str()))
    }

    /// Genre, or `None` when missing or blank
    pub fn genre(&self) -> Option<&str> {
        non_blank(self.genre.as_deref())
    }

    /// Category, or `None` when missing or blank
    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Boundary records
// ============================================================================

/// Loosely-typed item record as found in seed files and external payloads
///
/// Field names vary between sources (`name` vs `title`, `genres` vs `genre`),
/// and numeric ids sometimes arrive as strings. Everything is normalized once
/// here so the scoring code only ever sees [`Item`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default, alias = "author_name")]
    pub author: Option<String>,
    #[serde(default, alias = "genres")]
    pub genre: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "tags")]
    pub themes: Option<String>,
    #[serde(default, alias = "summary")]
    pub description: Option<String>,
    #[serde(default, alias = "created")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawItem> for Item {
    type Error = AppError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let id = match raw.id {
            Some(serde_json::Value::Number(n)) => n.as_i64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
        .ok_or_else(|| AppError::InvalidInput("Item record is missing a numeric id".to_string()))?;

        let title = raw
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::InvalidInput(format!("Item {} is missing a title", id)))?;

        Ok(Item {
            id: ItemId(id),
            title,
            author: raw.author.unwrap_or_default().trim().to_string(),
            genre: clean(raw.genre),
            category: clean(raw.category),
            themes: clean(raw.themes),
            description: clean(raw.description),
            created_at: raw.created_at.unwrap_or_else(Utc::now),
        })
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
