use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

/// Descriptive attribute compared by the similarity scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Genre,
    Author,
    Category,
    Themes,
    Description,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Genre,
        Attribute::Author,
        Attribute::Category,
        Attribute::Themes,
        Attribute::Description,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Genre => "genre",
            Attribute::Author => "author",
            Attribute::Category => "category",
            Attribute::Themes => "themes",
            Attribute::Description => "description",
        }
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when a weight table is constructed from bad values
#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("Weight for {attribute} is negative: {value}")]
    Negative { attribute: Attribute, value: f64 },
    #[error("Weight for {attribute} is not a finite number")]
    NonFinite { attribute: Attribute },
    #[error("All attribute weights are zero")]
    AllZero,
}

/// Per-attribute contribution to the similarity score
///
/// Weights conventionally sum to 1.0, which is not enforced. A table can
/// only be built through [`WeightTable::new`], so every instance holds
/// finite, non-negative weights with at least one above zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightTable {
    weights: BTreeMap<Attribute, f64>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: BTreeMap::from([
                (Attribute::Genre, 0.30),
                (Attribute::Author, 0.25),
                (Attribute::Category, 0.20),
                (Attribute::Themes, 0.15),
                (Attribute::Description, 0.10),
            ]),
        }
    }
}

impl WeightTable {
    /// Builds a validated table; attributes not listed get weight zero
    pub fn new(
        entries: impl IntoIterator<Item = (Attribute, f64)>,
    ) -> Result<Self, WeightError> {
        let mut weights = BTreeMap::new();
        for (attribute, value) in entries {
            if !value.is_finite() {
                return Err(WeightError::NonFinite { attribute });
            }
            if value < 0.0 {
                return Err(WeightError::Negative { attribute, value });
            }
            weights.insert(attribute, value);
        }

        if weights.values().all(|w| *w == 0.0) {
            return Err(WeightError::AllZero);
        }

        Ok(Self { weights })
    }

    pub fn get(&self, attribute: Attribute) -> f64 {
        self.weights.get(&attribute).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Attributes with a nonzero weight
    pub fn active(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        self.weights
            .iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(a, w)| (*a, *w))
    }

    /// Replaces weights wholesale; only the adjuster uses this and it keeps
    /// the values finite and non-negative
    pub(crate) fn from_validated(weights: BTreeMap<Attribute, f64>) -> Self {
        Self { weights }
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<Attribute, f64> {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let table = WeightTable::default();
        assert!((table.total() - 1.0).abs() < 1e-9);
        assert_eq!(table.get(Attribute::Genre), 0.30);
    }

    #[test]
    fn test_missing_attribute_reads_as_zero() {
        let table = WeightTable::new([(Attribute::Author, 1.0)]).unwrap();
        assert_eq!(table.get(Attribute::Genre), 0.0);
        assert_eq!(table.active().count(), 1);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = WeightTable::new([(Attribute::Genre, 0.5), (Attribute::Author, -0.1)]);
        assert_eq!(
            result,
            Err(WeightError::Negative {
                attribute: Attribute::Author,
                value: -0.1
            })
        );
    }

    #[test]
    fn test_all_zero_rejected() {
        let result = WeightTable::new([(Attribute::Genre, 0.0), (Attribute::Author, 0.0)]);
        assert_eq!(result, Err(WeightError::AllZero));

        let empty: [(Attribute, f64); 0] = [];
        assert_eq!(WeightTable::new(empty), Err(WeightError::AllZero));
    }

    #[test]
    fn test_nan_rejected() {
        let result = WeightTable::new([(Attribute::Themes, f64::NAN)]);
        assert_eq!(
            result,
            Err(WeightError::NonFinite {
                attribute: Attribute::Themes
            })
        );
    }

    #[test]
    fn test_serializes_as_attribute_map() {
        let json = serde_json::to_value(WeightTable::default()).unwrap();
        assert_eq!(json["author"], 0.25);
        assert_eq!(json["description"], 0.10);
    }
}
