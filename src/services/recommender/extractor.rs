use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{ItemId, TransactionRow};

/// Per-item set membership and pairwise co-occurrence counts
///
/// Membership is boolean: an item listed twice in one set counts once for
/// that set, both in `set_counts` and in every co-occurrence it takes part in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoOccurrenceGraph {
    sets_total: usize,
    set_counts: HashMap<ItemId, usize>,
    neighbor_counts: HashMap<ItemId, BTreeMap<ItemId, usize>>,
}

impl CoOccurrenceGraph {
    /// Builds the graph from flat (set, item) rows
    pub fn from_rows(rows: &[TransactionRow]) -> Self {
        let sets = group_into_sets(rows);

        Self {
            sets_total: sets.len(),
            set_counts: compute_set_counts(&sets),
            neighbor_counts: compute_neighbor_counts(&sets),
        }
    }

    /// Wraps counts computed elsewhere; no consistency checks are made here
    #[cfg(test)]
    pub(crate) fn from_parts(
        sets_total: usize,
        set_counts: HashMap<ItemId, usize>,
        neighbor_counts: HashMap<ItemId, BTreeMap<ItemId, usize>>,
    ) -> Self {
        Self {
            sets_total,
            set_counts,
            neighbor_counts,
        }
    }

    /// Number of distinct sets
    pub fn sets_total(&self) -> usize {
        self.sets_total
    }

    pub fn set_counts(&self) -> &HashMap<ItemId, usize> {
        &self.set_counts
    }

    /// Only items with at least one neighbor have an entry
    pub fn neighbor_counts(&self) -> &HashMap<ItemId, BTreeMap<ItemId, usize>> {
        &self.neighbor_counts
    }

    pub fn set_count(&self, item_id: &str) -> Option<usize> {
        self.set_counts.get(item_id).copied()
    }

    pub fn neighbors(&self, item_id: &str) -> Option<&BTreeMap<ItemId, usize>> {
        self.neighbor_counts.get(item_id)
    }

    /// Number of sets containing both items; zero when they never meet
    pub fn co_occurrence(&self, item_id: &str, neighbor_id: &str) -> usize {
        self.neighbor_counts
            .get(item_id)
            .and_then(|neighbors| neighbors.get(neighbor_id))
            .copied()
            .unwrap_or(0)
    }

    /// True when at least one pair of items shares a set
    pub fn has_relationships(&self) -> bool {
        !self.neighbor_counts.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.set_counts.len()
    }
}

/// Groups rows by set id, one item list per set in first-seen set order
///
/// Repeated items inside a set are kept here; the counting passes collapse them.
pub fn group_into_sets(rows: &[TransactionRow]) -> Vec<Vec<&str>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sets: Vec<Vec<&str>> = Vec::new();

    for row in rows {
        let slot = *index.entry(row.set_id.as_str()).or_insert_with(|| {
            sets.push(Vec::new());
            sets.len() - 1
        });
        sets[slot].push(row.item_id.as_str());
    }

    sets
}

/// For each item, the number of sets in which it appears at least once
pub fn compute_set_counts(sets: &[Vec<&str>]) -> HashMap<ItemId, usize> {
    let mut counts: HashMap<ItemId, usize> = HashMap::new();

    for set in sets {
        for item_id in distinct(set) {
            *counts.entry(item_id.to_string()).or_insert(0) += 1;
        }
    }

    counts
}

/// For each item, how many sets it shares with every other item
///
/// Each set adds exactly one to every ordered pair of distinct items it holds,
/// which keeps the counts symmetric. Items alone in all their sets get no entry.
pub fn compute_neighbor_counts(sets: &[Vec<&str>]) -> HashMap<ItemId, BTreeMap<ItemId, usize>> {
    let mut neighbors: HashMap<ItemId, BTreeMap<ItemId, usize>> = HashMap::new();

    for set in sets {
        let items = distinct(set);
        if items.len() < 2 {
            continue;
        }

        for &item_id in &items {
            let entry = neighbors.entry(item_id.to_string()).or_default();
            for &friend_id in items.iter().filter(|&&other| other != item_id) {
                *entry.entry(friend_id.to_string()).or_insert(0) += 1;
            }
        }
    }

    neighbors
}

fn distinct<'a>(set: &[&'a str]) -> BTreeSet<&'a str> {
    set.iter().copied().collect()
}
