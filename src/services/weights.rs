use std::collections::BTreeMap;

use crate::models::{Attribute, WeightTable};
use crate::services::profiler::PreferenceProfile;

/// Share of the total handed to an attribute whose base weight is zero
/// before it is boosted
const SEED_SHARE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct AdjusterSettings {
    /// Fraction of the remaining distance to the full total that a boosted
    /// attribute's share moves by; must lie in (0, 1)
    pub boost: f64,
}

impl Default for AdjusterSettings {
    fn default() -> Self {
        Self { boost: 0.3 }
    }
}

/// Returns a copy of `base` tilted toward the profile's signals
///
/// Author loyalty boosts the author weight and genre focus boosts the genre
/// weight; the remaining attributes shrink proportionally so the total is
/// unchanged. A neutral profile yields an equal copy.
pub fn adjust(
    base: &WeightTable,
    profile: &PreferenceProfile,
    settings: &AdjusterSettings,
) -> WeightTable {
    if profile.is_neutral() {
        return base.clone();
    }

    let mut weights = base.as_map().clone();

    if profile.author_loyal {
        boost(&mut weights, Attribute::Author, settings.boost);
    }
    if profile.genre_focused {
        boost(&mut weights, Attribute::Genre, settings.boost);
    }

    tracing::debug!(?weights, "Adjusted attribute weights");

    WeightTable::from_validated(weights)
}

fn boost(weights: &mut BTreeMap<Attribute, f64>, target: Attribute, gain: f64) {
    let total: f64 = weights.values().sum();
    let current = weights.get(&target).copied().unwrap_or(0.0);
    let others = total - current;

    // Nothing to take weight from; grow the attribute itself
    if others <= 0.0 {
        weights.insert(target, current * (1.0 + gain));
        return;
    }

    let share = if current > 0.0 {
        current / total
    } else {
        SEED_SHARE
    };
    let new_share = share + (1.0 - share) * gain;
    let new_weight = new_share * total;
    let scale = (total - new_weight) / others;

    for (attribute, weight) in weights.iter_mut() {
        if *attribute != target {
            *weight *= scale;
        }
    }
    weights.insert(target, new_weight);
}
