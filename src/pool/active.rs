//! Per-node active sets.
//!
//! An active set is a node's ordered view of pool items currently
//! materialized in its LP: position in the set equals the LP row or
//! column index. Every membership change goes through the owning pool's
//! activation counts, and `release` is idempotent so teardown on any
//! exit path never double-releases.

use std::collections::HashMap;

use super::store::Pool;

/// Ordered set of active pool items with per-item redundant age.
#[derive(Debug)]
pub struct ActiveSet {
    /// Pool ids; position == LP index.
    items: Vec<usize>,

    /// Reverse map: pool id -> position.
    pos: HashMap<usize, usize>,

    /// Consecutive iterations each item has looked redundant.
    age: Vec<u32>,

    released: bool,
}

impl ActiveSet {
    /// Create an empty active set.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            pos: HashMap::new(),
            age: Vec::new(),
            released: false,
        }
    }

    /// Build an active set from pool ids, activating each of them.
    pub fn from_ids<T>(pool: &mut Pool<T>, ids: &[usize]) -> Self {
        let mut set = Self::new();
        for &id in ids {
            set.insert(pool, id);
        }
        set
    }

    /// Activate a pool item and append it to the set.
    ///
    /// Returns the LP index of the new item.
    pub fn insert<T>(&mut self, pool: &mut Pool<T>, id: usize) -> usize {
        debug_assert!(!self.released, "insert into released active set");
        debug_assert!(!self.pos.contains_key(&id), "item already active");
        pool.activate(id);
        let idx = self.items.len();
        self.items.push(id);
        self.age.push(0);
        self.pos.insert(id, idx);
        idx
    }

    /// Deactivate and remove the items at the given positions,
    /// compacting the set while preserving order.
    pub fn remove_many<T>(&mut self, pool: &mut Pool<T>, positions: &[usize]) {
        if positions.is_empty() {
            return;
        }
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        for &p in sorted.iter().rev() {
            let id = self.items.remove(p);
            self.age.remove(p);
            pool.deactivate(id);
        }
        self.rebuild_pos();
    }

    fn rebuild_pos(&mut self) {
        self.pos.clear();
        for (idx, &id) in self.items.iter().enumerate() {
            self.pos.insert(id, idx);
        }
    }

    /// Pool id at an LP index.
    pub fn pool_id(&self, idx: usize) -> usize {
        self.items[idx]
    }

    /// LP index of a pool id, if active.
    pub fn lp_index(&self, id: usize) -> Option<usize> {
        self.pos.get(&id).copied()
    }

    /// Check whether a pool id is active.
    pub fn contains(&self, id: usize) -> bool {
        self.pos.contains_key(&id)
    }

    /// Number of active items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over pool ids in LP order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().copied()
    }

    /// Increment the redundant age of one item.
    pub fn age_item(&mut self, idx: usize) {
        self.age[idx] += 1;
    }

    /// Reset the redundant age of one item.
    pub fn reset_age(&mut self, idx: usize) {
        self.age[idx] = 0;
    }

    /// Redundant age of one item.
    pub fn age(&self, idx: usize) -> u32 {
        self.age[idx]
    }

    /// Release every activation held by this set. Idempotent.
    pub fn release<T>(&mut self, pool: &mut Pool<T>) {
        if self.released {
            return;
        }
        for &id in &self.items {
            pool.deactivate(id);
        }
        self.released = true;
    }

    /// Whether the set has been released.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Default for ActiveSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(n: usize) -> Pool<u32> {
        let mut p = Pool::new(100);
        for i in 0..n {
            p.insert(i as u32);
        }
        p
    }

    #[test]
    fn test_insert_orders_by_lp_index() {
        let mut pool = pool_of(3);
        let mut set = ActiveSet::new();

        assert_eq!(set.insert(&mut pool, 2), 0);
        assert_eq!(set.insert(&mut pool, 0), 1);

        assert_eq!(set.pool_id(0), 2);
        assert_eq!(set.pool_id(1), 0);
        assert_eq!(set.lp_index(0), Some(1));
        assert_eq!(set.lp_index(1), None);
        assert_eq!(pool.active_count(2), 1);
    }

    #[test]
    fn test_remove_compacts_and_preserves_order() {
        let mut pool = pool_of(4);
        let mut set = ActiveSet::from_ids(&mut pool, &[0, 1, 2, 3]);

        set.remove_many(&mut pool, &[1, 3]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.pool_id(0), 0);
        assert_eq!(set.pool_id(1), 2);
        assert_eq!(set.lp_index(2), Some(1));
        assert_eq!(pool.active_count(1), 0);
        assert_eq!(pool.active_count(3), 0);
    }

    #[test]
    fn test_aging() {
        let mut pool = pool_of(2);
        let mut set = ActiveSet::from_ids(&mut pool, &[0, 1]);

        set.age_item(0);
        set.age_item(0);
        set.age_item(1);
        assert_eq!(set.age(0), 2);

        set.reset_age(0);
        assert_eq!(set.age(0), 0);
        assert_eq!(set.age(1), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = pool_of(2);
        let mut set = ActiveSet::from_ids(&mut pool, &[0, 1]);
        assert_eq!(pool.active_count(0), 1);

        set.release(&mut pool);
        set.release(&mut pool);

        assert_eq!(pool.active_count(0), 0);
        assert_eq!(pool.active_count(1), 0);
        assert!(set.is_released());
    }
}
