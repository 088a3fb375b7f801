//! Priority queue over open subproblems.
//!
//! Entries carry a precomputed selection key (best bound or depth,
//! chosen by the master); ties fall to the most recently pushed entry so
//! depth-first selection explores the newest child first.

use std::collections::BinaryHeap;

use crate::settings::ObjSense;

use super::subproblem::Subproblem;

struct Entry {
    key: f64,
    seq: u64,
    node: Subproblem,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .total_cmp(&other.key)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Max-heap of open subproblems, keyed at push time.
pub struct OpenNodeQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl OpenNodeQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Push a node with its selection key (larger = picked earlier).
    pub fn push(&mut self, node: Subproblem, key: f64) {
        self.seq += 1;
        self.heap.push(Entry {
            key,
            seq: self.seq,
            node,
        });
    }

    /// Pop the highest-priority open node.
    pub fn pop(&mut self) -> Option<Subproblem> {
        self.heap.pop().map(|e| e.node)
    }

    /// Number of open nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The loosest dual bound over all open nodes. This is the valid
    /// global bound contribution of the unexplored part of the tree.
    pub fn best_bound(&self, sense: ObjSense) -> Option<f64> {
        self.heap
            .iter()
            .map(|e| e.node.dual_bound())
            .reduce(|a, b| match sense {
                ObjSense::Min => a.min(b),
                ObjSense::Max => a.max(b),
            })
    }

    /// Remove and return every node matched by the predicate.
    pub fn prune<F>(&mut self, dominated: F) -> Vec<Subproblem>
    where
        F: Fn(&Subproblem) -> bool,
    {
        let entries = std::mem::take(&mut self.heap).into_vec();
        let mut pruned = Vec::new();
        for e in entries {
            if dominated(&e.node) {
                pruned.push(e.node);
            } else {
                self.heap.push(e);
            }
        }
        pruned
    }
}

impl Default for OpenNodeQueue {
    fn default() -> Self {
        Self::new()
    }
}
