//! Insertion-ordered set used for command queues

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// A FIFO set: unique members, iterated in insertion order
///
/// Membership checks are O(1); insertion, removal and head lookup are
/// O(log n). Re-adding a member that is already present keeps its original
/// position.
#[derive(Debug, Clone)]
pub struct OrderedSet<T> {
    by_seq: BTreeMap<u64, T>,
    seq_of: HashMap<T, u64>,
    next_seq: u64,
}

impl<T> Default for OrderedSet<T> {
    fn default() -> Self {
        Self {
            by_seq: BTreeMap::new(),
            seq_of: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Hash + Eq + Clone> OrderedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value`; returns false if it was already a member
    pub fn add(&mut self, value: T) -> bool {
        if self.seq_of.contains_key(&value) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.seq_of.insert(value.clone(), seq);
        self.by_seq.insert(seq, value);
        true
    }

    /// Remove `value`; returns false if it was not a member
    pub fn remove(&mut self, value: &T) -> bool {
        match self.seq_of.remove(value) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.seq_of.contains_key(value)
    }

    /// The oldest member
    pub fn head(&self) -> Option<&T> {
        self.by_seq.values().next()
    }

    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_seq.clear();
        self.seq_of.clear();
    }

    /// Remove and return every member, oldest first
    pub fn drain(&mut self) -> Vec<T> {
        self.seq_of.clear();
        std::mem::take(&mut self.by_seq).into_values().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.by_seq.values()
    }
}

impl<T: Hash + Eq + Clone> PartialEq for OrderedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: Hash + Eq + Clone> Eq for OrderedSet<T> {}

impl<T: Hash + Eq + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}
