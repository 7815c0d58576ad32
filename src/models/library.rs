use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::{Item, ItemId};
use crate::error::AppError;

/// Identifier for a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shelf a user has placed a book on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShelfKind {
    Favorite,
    Reading,
    WantToRead,
    Read,
}

impl ShelfKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShelfKind::Favorite => "favorite",
            ShelfKind::Reading => "reading",
            ShelfKind::WantToRead => "want_to_read",
            ShelfKind::Read => "read",
        }
    }

    /// Whether the user has actually engaged with the book
    /// (as opposed to merely planning to read it)
    pub fn is_engaged(&self) -> bool {
        !matches!(self, ShelfKind::WantToRead)
    }
}

impl Display for ShelfKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShelfKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "favorite" | "favourite" => Ok(ShelfKind::Favorite),
            "reading" | "currently_reading" => Ok(ShelfKind::Reading),
            "want_to_read" | "to_read" => Ok(ShelfKind::WantToRead),
            "read" => Ok(ShelfKind::Read),
            other => Err(AppError::InvalidInput(format!("Unknown shelf kind: {}", other))),
        }
    }
}

/// A book classified by a user; unique per (user, item)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryEntry {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub kind: ShelfKind,
    pub added_at: DateTime<Utc>,
}

impl LibraryEntry {
    pub fn new(user_id: UserId, item_id: ItemId, kind: ShelfKind) -> Self {
        Self {
            user_id,
            item_id,
            kind,
            added_at: Utc::now(),
        }
    }
}

/// Library entry paired with the catalog record it points at
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryItem {
    pub entry: LibraryEntry,
    pub item: Item,
}

impl LibraryItem {
    pub fn kind(&self) -> ShelfKind {
        self.entry.kind
    }
}
