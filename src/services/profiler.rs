use serde::Serialize;
use std::collections::HashMap;

use crate::models::LibraryItem;

/// Thresholds used to read taste signals out of a library
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerSettings {
    /// Below this many entries the profile stays neutral
    pub min_library_size: usize,
    /// Share of the library one author must hold to count as loyalty
    pub author_loyalty_ratio: f64,
    /// Most distinct genres a focused library may span
    pub genre_focus_max_genres: usize,
    /// Fewest entries before genre focus is considered
    pub genre_focus_min_items: usize,
}

impl Default for ProfilerSettings {
    fn default() -> Self {
        Self {
            min_library_size: 3,
            author_loyalty_ratio: 0.4,
            genre_focus_max_genres: 2,
            genre_focus_min_items: 5,
        }
    }
}

/// Qualitative taste signals derived per request; never persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreferenceProfile {
    pub author_loyal: bool,
    pub genre_focused: bool,
    pub dominant_author: Option<String>,
    pub dominant_genre: Option<String>,
}

impl PreferenceProfile {
    /// Whether any signal would change the weights
    pub fn is_neutral(&self) -> bool {
        !self.author_loyal && !self.genre_focused
    }
}

/// Derives the taste profile of a library
pub fn analyze(library: &[LibraryItem], settings: &ProfilerSettings) -> PreferenceProfile {
    if library.len() < settings.min_library_size {
        return PreferenceProfile::default();
    }

    let authors = tally(library.iter().filter_map(|li| li.item.author()));
    let genres = tally(library.iter().filter_map(|li| li.item.genre()));

    let total = library.len();
    let dominant_author = authors.dominant();
    let dominant_genre = genres.dominant();

    let author_loyal = match &dominant_author {
        Some((_, count)) => {
            total >= 3 && (*count as f64 / total as f64) >= settings.author_loyalty_ratio
        }
        None => false,
    };

    let distinct_genres = genres.distinct();
    let genre_focused = total >= settings.genre_focus_min_items
        && distinct_genres > 0
        && distinct_genres <= settings.genre_focus_max_genres;

    let profile = PreferenceProfile {
        author_loyal,
        genre_focused,
        dominant_author: dominant_author.map(|(name, _)| name),
        dominant_genre: dominant_genre.map(|(name, _)| name),
    };

    tracing::debug!(
        library_size = total,
        distinct_genres,
        author_loyal = profile.author_loyal,
        genre_focused = profile.genre_focused,
        "Analyzed library"
    );

    profile
}

/// Case-insensitive frequency count that remembers the first spelling seen
struct Tally {
    /// lower-cased key -> (display spelling, count, first position)
    counts: HashMap<String, (String, usize, usize)>,
}

impl Tally {
    fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Most frequent value; ties go to whichever appeared first
    fn dominant(&self) -> Option<(String, usize)> {
        self.counts
            .values()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(name, count, _)| (name.clone(), *count))
    }
}

fn tally<'a>(values: impl Iterator<Item = &'a str>) -> Tally {
    let mut counts: HashMap<String, (String, usize, usize)> = HashMap::new();
    for (position, value) in values.enumerate() {
        counts
            .entry(value.to_lowercase())
            .or_insert_with(|| (value.to_string(), 0, position))
            .1 += 1;
    }
    Tally { counts }
}
