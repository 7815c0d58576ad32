//! Merges candidate sets into the final recommendation list
//!
//! Placement runs in two phases. The cover phase makes sure every source with
//! a usable item is represented, visiting sources scarcest first. When fewer
//! slots remain than uncovered sources, it places the item shared by the most
//! uncovered sources instead. The fill phase then hands out the remaining
//! slots round-robin, visiting sources in a fresh random order every round.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

use crate::models::{CandidateSet, CandidateSource, Item, ItemId};

struct SourceQueue<'a> {
    source: CandidateSource,
    items: VecDeque<&'a Item>,
    members: HashSet<ItemId>,
}

impl<'a> SourceQueue<'a> {
    /// Next item not already placed, dropping stale ones on the way
    fn next_unplaced(&mut self, placed: &HashSet<ItemId>) -> Option<&'a Item> {
        while let Some(item) = self.items.pop_front() {
            if !placed.contains(&item.id) {
                return Some(item);
            }
        }
        None
    }

    fn has_unplaced(&self, placed: &HashSet<ItemId>) -> bool {
        self.items.iter().any(|i| !placed.contains(&i.id))
    }

    fn offers(&self, id: ItemId) -> bool {
        self.members.contains(&id)
    }
}

/// Unplaced item offered by the most uncovered sources, first seen wins ties
fn widest_cover<'a>(
    queues: &[SourceQueue<'a>],
    uncovered: &[usize],
    placed: &HashSet<ItemId>,
) -> Option<&'a Item> {
    let mut best: Option<(&'a Item, usize)> = None;

    for &index in uncovered {
        for &item in queues[index].items.iter().filter(|i| !placed.contains(&i.id)) {
            let reach = uncovered.iter().filter(|&&j| queues[j].offers(item.id)).count();
            if best.map_or(true, |(_, top)| reach > top) {
                best = Some((item, reach));
            }
        }
    }

    best.map(|(item, _)| item)
}

/// Merges `candidate_sets` into at most `limit` distinct items
///
/// Never returns an id in `excluded_ids` or `favorite_ids`. Every source
/// with at least one usable item contributes when `limit` allows it.
pub fn combine<R: Rng + ?Sized>(
    candidate_sets: &[CandidateSet],
    excluded_ids: &HashSet<ItemId>,
    favorite_ids: &HashSet<ItemId>,
    limit: usize,
    rng: &mut R,
) -> Vec<Item> {
    let mut queues: Vec<SourceQueue<'_>> = candidate_sets
        .iter()
        .map(|set| {
            let mut members = HashSet::new();
            let items: VecDeque<&Item> = set
                .items
                .iter()
                .filter(|i| !excluded_ids.contains(&i.id) && !favorite_ids.contains(&i.id))
                .filter(|i| members.insert(i.id))
                .collect();
            SourceQueue {
                source: set.source,
                items,
                members,
            }
        })
        .filter(|q| !q.items.is_empty())
        .collect();

    let mut placed: HashSet<ItemId> = HashSet::new();
    let mut result: Vec<Item> = Vec::with_capacity(limit.min(64));

    if limit == 0 || queues.is_empty() {
        return result;
    }

    // Cover phase: scarcest first, random among equals
    queues.shuffle(&mut *rng);
    queues.sort_by_key(|q| q.items.len());

    let mut uncovered: Vec<usize> = (0..queues.len()).collect();
    while result.len() < limit && !uncovered.is_empty() {
        let slots = limit - result.len();
        let pick = if slots < uncovered.len() {
            widest_cover(&queues, &uncovered, &placed)
        } else {
            queues[uncovered[0]].next_unplaced(&placed)
        };
        let Some(item) = pick else {
            break;
        };

        tracing::trace!(item_id = %item.id, "Placed covering candidate");
        placed.insert(item.id);
        result.push(item.clone());
        uncovered.retain(|&i| !queues[i].offers(item.id));
    }

    // Fill phase
    while result.len() < limit {
        queues.retain(|q| q.has_unplaced(&placed));
        if queues.is_empty() {
            break;
        }
        queues.shuffle(&mut *rng);

        for queue in queues.iter_mut() {
            if result.len() >= limit {
                break;
            }
            if let Some(item) = queue.next_unplaced(&placed) {
                tracing::trace!(source = %queue.source, item_id = %item.id, "Placed candidate");
                placed.insert(item.id);
                result.push(item.clone());
            }
        }
    }

    tracing::debug!(
        sources = candidate_sets.len(),
        limit,
        returned = result.len(),
        "Combined candidate sets"
    );

    result
}

/// Every source that offered each returned item
pub fn attribute_sources(
    candidate_sets: &[CandidateSet],
    items: &[Item],
) -> Vec<(ItemId, Vec<CandidateSource>)> {
    items
        .iter()
        .map(|item| {
            let sources = candidate_sets
                .iter()
                .filter(|set| set.items.iter().any(|i| i.id == item.id))
                .map(|set| set.source)
                .collect();
            (item.id, sources)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn items(ids: std::ops::Range<i64>) -> Vec<Item> {
        ids.map(|id| Item::new(id, format!("Book {}", id), "Someone"))
            .collect()
    }

    fn four_sources() -> Vec<CandidateSet> {
        vec![
            CandidateSet::new(CandidateSource::History, items(1..21)),
            CandidateSet::new(CandidateSource::Category, items(15..35)),
            CandidateSet::new(CandidateSource::Similarity, items(30..50)),
            CandidateSet::new(CandidateSource::Temporal, items(100..120)),
        ]
    }

    fn source_of(sets: &[CandidateSet], id: ItemId) -> Vec<CandidateSource> {
        sets.iter()
            .filter(|s| s.items.iter().any(|i| i.id == id))
            .map(|s| s.source)
            .collect()
    }

    #[test]
    fn test_every_source_contributes() {
        let sets = four_sources();
        for limit in [5, 10, 15] {
            for seed in 0..50 {
                let mut rng = StdRng::seed_from_u64(seed);
                let result = combine(&sets, &HashSet::new(), &HashSet::new(), limit, &mut rng);

                assert_eq!(result.len(), limit);
                for set in &sets {
                    assert!(
                        result.iter().any(|i| source_of(&sets, i.id).contains(&set.source)),
                        "limit {} seed {}: {} missing",
                        limit,
                        seed,
                        set.source
                    );
                }
            }
        }
    }

    #[test]
    fn test_never_returns_excluded_or_favorites() {
        let sets = four_sources();
        let excluded: HashSet<ItemId> = (1..10).map(ItemId).collect();
        let favorites: HashSet<ItemId> = (100..110).map(ItemId).collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = combine(&sets, &excluded, &favorites, 40, &mut rng);
            assert!(result
                .iter()
                .all(|i| !excluded.contains(&i.id) && !favorites.contains(&i.id)));
        }
    }

    #[test]
    fn test_no_duplicates_across_overlapping_sources() {
        let sets = four_sources();
        let mut rng = StdRng::seed_from_u64(7);
        let result = combine(&sets, &HashSet::new(), &HashSet::new(), 200, &mut rng);

        let unique: HashSet<ItemId> = result.iter().map(|i| i.id).collect();
        assert_eq!(unique.len(), result.len());
        // 1..50 and 100..120 once each
        assert_eq!(result.len(), 69);
    }

    #[test]
    fn test_zero_limit_and_empty_sources() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(combine(&four_sources(), &HashSet::new(), &HashSet::new(), 0, &mut rng).is_empty());

        let empty = vec![
            CandidateSet::empty(CandidateSource::History),
            CandidateSet::empty(CandidateSource::Temporal),
        ];
        assert!(combine(&empty, &HashSet::new(), &HashSet::new(), 10, &mut rng).is_empty());
    }

    #[test]
    fn test_scarce_source_not_starved_by_overlap() {
        // Temporal's only item also heads the history list
        let sets = vec![
            CandidateSet::new(CandidateSource::History, items(1..6)),
            CandidateSet::new(CandidateSource::Temporal, items(1..2)),
        ];

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = combine(&sets, &HashSet::new(), &HashSet::new(), 2, &mut rng);
            assert_eq!(result.len(), 2);
            assert!(result.iter().any(|i| i.id == ItemId(1)));
            assert!(result.iter().any(|i| i.id != ItemId(1)));
        }
    }

    #[test]
    fn test_shared_item_covers_sources_when_slots_are_short() {
        let pick = |ids: &[i64]| {
            ids.iter()
                .map(|&id| Item::new(id, format!("Book {}", id), "Someone"))
                .collect::<Vec<_>>()
        };
        let sets = vec![
            CandidateSet::new(CandidateSource::History, pick(&[1, 2])),
            CandidateSet::new(CandidateSource::Category, pick(&[3, 4])),
            CandidateSet::new(CandidateSource::Similarity, pick(&[1, 3])),
        ];

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = combine(&sets, &HashSet::new(), &HashSet::new(), 2, &mut rng);
            assert_eq!(result.len(), 2);
            for set in &sets {
                assert!(
                    result.iter().any(|i| source_of(&sets, i.id).contains(&set.source)),
                    "seed {}: {} missing",
                    seed,
                    set.source
                );
            }
        }
    }

    #[test]
    fn test_single_slot_goes_to_widest_item() {
        let sets = vec![
            CandidateSet::new(CandidateSource::History, items(1..3)),
            CandidateSet::new(CandidateSource::Category, items(2..4)),
            CandidateSet::new(CandidateSource::Temporal, items(2..3)),
        ];
        let mut rng = StdRng::seed_from_u64(11);
        let result = combine(&sets, &HashSet::new(), &HashSet::new(), 1, &mut rng);
        assert_eq!(result.iter().map(|i| i.id).collect::<Vec<_>>(), vec![ItemId(2)]);
    }

    #[test]
    fn test_same_seed_same_order() {
        let sets = four_sources();
        let a = combine(&sets, &HashSet::new(), &HashSet::new(), 10, &mut StdRng::seed_from_u64(3));
        let b = combine(&sets, &HashSet::new(), &HashSet::new(), 10, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_attribute_sources_lists_overlaps() {
        let sets = four_sources();
        let picked = items(15..16);
        let attributed = attribute_sources(&sets, &picked);
        assert_eq!(
            attributed,
            vec![(ItemId(15), vec![CandidateSource::History, CandidateSource::Category])]
        );
    }
}
