//! Restores enqueue order for results that complete out of order.

use std::collections::BTreeMap;

/// Holds completed results until every earlier sequence number has arrived.
///
/// A `None` marks a sequence number that produced nothing (a failed
/// synthesis); it is skipped rather than blocking later entries.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: u64,
    slots: BTreeMap<u64, Option<T>>,
}

impl<T> ReorderBuffer<T> {
    pub fn new(first: u64) -> Self {
        Self {
            next: first,
            slots: BTreeMap::new(),
        }
    }

    /// Record the result for `seq`. Results for already-released positions are dropped.
    pub fn insert(&mut self, seq: u64, item: Option<T>) {
        if seq >= self.next {
            self.slots.insert(seq, item);
        }
    }

    /// Next item in order, if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        while let Some(entry) = self.slots.first_entry() {
            if *entry.key() != self.next {
                return None;
            }
            self.next += 1;
            if let Some(item) = entry.remove() {
                return Some(item);
            }
        }
        None
    }

    /// Drop everything and continue from `next`.
    pub fn reset(&mut self, next: u64) {
        self.slots.clear();
        self.next = next;
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
