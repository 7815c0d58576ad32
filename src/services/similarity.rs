//! Attribute-based similarity between two catalog items
//!
//! Exact-match attributes (genre, author, category) contribute all or
//! nothing. Free-text attributes (themes, description) contribute their
//! token-set Jaccard overlap. The weighted sum is normalized by the weight of
//! the attributes that carry information on at least one side, so sparse
//! records are not punished for fields nobody filled in.

use std::collections::HashSet;

use crate::models::{Attribute, Item, WeightTable};

/// Words too common to say anything about a book's content
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "do", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i",
    "if", "in", "into", "is", "it", "its", "more", "most", "no", "not", "of", "on", "one", "or",
    "our", "out", "she", "so", "some", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "to", "up", "was", "we", "were", "what", "when", "which", "who",
    "will", "with", "you", "your",
];

/// Per-attribute comparison outcome
#[derive(Debug, Clone, Copy, PartialEq)]
struct AttributeMatch {
    score: f64,
    /// At least one side had something to compare
    informative: bool,
}

/// Scores two items in `[0, 1]` using the given weights
///
/// Symmetric in its arguments. Returns 0.0 when neither item has any
/// informative attribute.
pub fn score(a: &Item, b: &Item, weights: &WeightTable) -> f64 {
    let mut weighted_sum = 0.0;
    let mut informative_weight = 0.0;

    for (attribute, weight) in weights.active() {
        let matched = compare(attribute, a, b);
        if matched.informative {
            weighted_sum += weight * matched.score;
            informative_weight += weight;
        }
    }

    if informative_weight == 0.0 {
        return 0.0;
    }

    (weighted_sum / informative_weight).clamp(0.0, 1.0)
}

fn compare(attribute: Attribute, a: &Item, b: &Item) -> AttributeMatch {
    match attribute {
        Attribute::Genre => exact_match(a.genre(), b.genre()),
        Attribute::Author => exact_match(a.author(), b.author()),
        Attribute::Category => exact_match(a.category(), b.category()),
        Attribute::Themes => token_overlap(a.themes.as_deref(), b.themes.as_deref()),
        Attribute::Description => {
            token_overlap(a.description.as_deref(), b.description.as_deref())
        }
    }
}

fn exact_match(a: Option<&str>, b: Option<&str>) -> AttributeMatch {
    let score = match (a, b) {
        (Some(a), Some(b)) if a.to_lowercase() == b.to_lowercase() => 1.0,
        _ => 0.0,
    };

    AttributeMatch {
        score,
        informative: a.is_some() || b.is_some(),
    }
}

fn token_overlap(a: Option<&str>, b: Option<&str>) -> AttributeMatch {
    let a_tokens = a.map(tokenize).unwrap_or_default();
    let b_tokens = b.map(tokenize).unwrap_or_default();

    AttributeMatch {
        score: jaccard(&a_tokens, &b_tokens),
        informative: !a_tokens.is_empty() || !b_tokens.is_empty(),
    }
}

/// Splits on non-alphanumeric boundaries, lower-cases, and drops stopwords
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// |A ∩ B| / |A ∪ B|, or 0.0 when either set is empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Item {
        Item::new(1, "Dune", "Frank Herbert")
            .with_genre("Science Fiction")
            .with_category("Fiction")
            .with_themes("desert, politics, ecology, religion")
            .with_description("A noble family fights for control of a desert planet and its spice.")
    }

    fn dune_messiah() -> Item {
        Item::new(2, "Dune Messiah", "frank herbert")
            .with_genre("science fiction")
            .with_category("Fiction")
            .with_themes("politics, religion, prophecy")
            .with_description("An emperor struggles with the prophecy he set in motion.")
    }

    fn cookbook() -> Item {
        Item::new(3, "Salt Fat Acid Heat", "Samin Nosrat")
            .with_genre("Cooking")
            .with_category("Non-Fiction")
            .with_themes("desert, politics, ecology, religion")
            .with_description("A noble family fights for control of a desert planet and its spice.")
    }

    #[test]
    fn test_tokenize_drops_stopwords_and_punctuation() {
        let tokens = tokenize("The war, and the PEACE of it!");
        let expected: HashSet<String> = ["war", "peace"].iter().map(|s| s.to_string()).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_jaccard_empty_side_is_zero() {
        let a = tokenize("dragons quest");
        assert_eq!(jaccard(&a, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_jaccard_partial_overlap() {
        let a = tokenize("dragons quest gold");
        let b = tokenize("dragons gold ring");
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_symmetric() {
        let weights = WeightTable::default();
        let pairs = [(dune(), dune_messiah()), (dune(), cookbook()), (dune_messiah(), cookbook())];
        for (a, b) in pairs {
            assert_eq!(score(&a, &b, &weights), score(&b, &a, &weights));
        }
    }

    #[test]
    fn test_self_similarity_is_maximal() {
        let weights = WeightTable::default();
        let item = dune();
        assert!(score(&item, &item, &weights) >= 0.99);
    }

    #[test]
    fn test_shared_genre_author_category_scores_high() {
        let weights = WeightTable::default();
        assert!(score(&dune(), &dune_messiah(), &weights) > 0.5);
    }

    #[test]
    fn test_disjoint_exact_attributes_score_low_despite_token_overlap() {
        let weights = WeightTable::default();
        // Identical themes and description, different genre/author/category
        let s = score(&dune(), &cookbook(), &weights);
        assert!(s < 0.3, "score was {}", s);
    }

    #[test]
    fn test_empty_items_score_zero() {
        let weights = WeightTable::default();
        let a = Item::new(10, "Untitled", "");
        let b = Item::new(11, "Also Untitled", "");
        assert_eq!(score(&a, &b, &weights), 0.0);
    }

    #[test]
    fn test_single_populated_attribute_not_penalized() {
        let weights = WeightTable::default();
        let a = Item::new(10, "A", "").with_genre("Poetry");
        let b = Item::new(11, "B", "").with_genre("poetry");
        assert!((score(&a, &b, &weights) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_one_sided_attribute_counts_as_mismatch() {
        let weights = WeightTable::new([(Attribute::Genre, 0.5), (Attribute::Author, 0.5)]).unwrap();
        let a = Item::new(10, "A", "Le Guin").with_genre("Fantasy");
        let b = Item::new(11, "B", "Le Guin");
        assert!((score(&a, &b, &weights) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weight_attribute_ignored() {
        let weights = WeightTable::new([(Attribute::Author, 1.0)]).unwrap();
        let a = Item::new(10, "A", "Austen").with_genre("Romance");
        let b = Item::new(11, "B", "Austen").with_genre("Horror");
        assert_eq!(score(&a, &b, &weights), 1.0);
    }

    #[test]
    fn test_stopword_only_description_carries_no_information() {
        let weights = WeightTable::new([(Attribute::Description, 0.5), (Attribute::Genre, 0.5)]).unwrap();
        let a = Item::new(10, "A", "").with_genre("Drama").with_description("the and of");
        let b = Item::new(11, "B", "").with_genre("Drama").with_description("it is");
        assert_eq!(score(&a, &b, &weights), 1.0);
    }
}
