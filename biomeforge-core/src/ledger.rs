//! Batch Ledger
//!
//! Slot -> fingerprint record for the batch currently being built. Lives for
//! one run only.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::hashing::Fingerprint;
use crate::tables::Slot;

/// Slots sharing one fingerprint, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: Fingerprint,
    pub slots: Vec<Slot>,
}

impl DuplicateGroup {
    /// The lowest ordinal is kept.
    pub fn survivor(&self) -> Slot {
        self.slots[0]
    }

    /// Every member except the survivor.
    pub fn redundant(&self) -> &[Slot] {
        &self.slots[1..]
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchLedger {
    entries: BTreeMap<Slot, Fingerprint>,
}

impl BatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a slot's fingerprint, returning the one it replaced.
    pub fn record(&mut self, slot: Slot, fingerprint: Fingerprint) -> Option<Fingerprint> {
        self.entries.insert(slot, fingerprint)
    }

    pub fn remove(&mut self, slot: Slot) -> Option<Fingerprint> {
        self.entries.remove(&slot)
    }

    pub fn get(&self, slot: Slot) -> Option<&Fingerprint> {
        self.entries.get(&slot)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.entries.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> &BTreeMap<Slot, Fingerprint> {
        &self.entries
    }

    /// Invert the ledger and return every fingerprint held by two or more
    /// slots, ordered by survivor.
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut by_fingerprint: BTreeMap<&Fingerprint, Vec<Slot>> = BTreeMap::new();
        for (slot, fingerprint) in &self.entries {
            by_fingerprint.entry(fingerprint).or_default().push(*slot);
        }

        let mut groups: Vec<DuplicateGroup> = by_fingerprint
            .into_iter()
            .filter(|(_, slots)| slots.len() > 1)
            .map(|(fingerprint, mut slots)| {
                slots.sort_unstable();
                DuplicateGroup { fingerprint: fingerprint.clone(), slots }
            })
            .collect();
        groups.sort_by_key(|group| group.survivor());
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::fingerprint;
    use crate::resolver::AttributeSet;

    fn fp(background: &str) -> Fingerprint {
        fingerprint(&AttributeSet::new(background, "fg.png", "obj.png")).unwrap()
    }

    #[test]
    fn test_no_duplicates() {
        let mut ledger = BatchLedger::new();
        ledger.record(1, fp("a"));
        ledger.record(2, fp("b"));
        ledger.record(3, fp("c"));
        assert!(ledger.duplicate_groups().is_empty());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_groups_and_survivor() {
        let mut ledger = BatchLedger::new();
        ledger.record(7, fp("a"));
        ledger.record(2, fp("a"));
        ledger.record(5, fp("a"));
        ledger.record(3, fp("b"));
        ledger.record(1, fp("c"));
        ledger.record(4, fp("c"));

        let groups = ledger.duplicate_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].slots, vec![1, 4]);
        assert_eq!(groups[0].survivor(), 1);
        assert_eq!(groups[0].redundant(), &[4]);
        assert_eq!(groups[1].slots, vec![2, 5, 7]);
        assert_eq!(groups[1].survivor(), 2);
        assert_eq!(groups[1].redundant(), &[5, 7]);
    }

    #[test]
    fn test_remove_clears_collision() {
        let mut ledger = BatchLedger::new();
        ledger.record(1, fp("a"));
        ledger.record(2, fp("a"));
        assert_eq!(ledger.remove(2), Some(fp("a")));
        assert!(ledger.duplicate_groups().is_empty());
        assert!(!ledger.contains(2));
        assert_eq!(ledger.slots().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_record_replaces() {
        let mut ledger = BatchLedger::new();
        assert_eq!(ledger.record(1, fp("a")), None);
        assert_eq!(ledger.record(1, fp("b")), Some(fp("a")));
        assert_eq!(ledger.get(1), Some(&fp("b")));
    }
}
