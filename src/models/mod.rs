use serde::Serialize;
use std::fmt::Display;

pub mod item;
pub mod library;
pub mod weights;

pub use item::{Item, ItemId, RawItem};
pub use library::{LibraryEntry, LibraryItem, ShelfKind, UserId};
pub use weights::{Attribute, WeightError, WeightTable};

/// Strategy that produced a candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    History,
    Category,
    Similarity,
    Temporal,
}

impl Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CandidateSource::History => "history",
            CandidateSource::Category => "category",
            CandidateSource::Similarity => "similarity",
            CandidateSource::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

/// Ordered output of one candidate generator
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    pub source: CandidateSource,
    pub items: Vec<Item>,
}

impl CandidateSet {
    pub fn new(source: CandidateSource, items: Vec<Item>) -> Self {
        Self { source, items }
    }

    pub fn empty(source: CandidateSource) -> Self {
        Self::new(source, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
