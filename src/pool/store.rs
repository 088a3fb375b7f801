//! Bounded, reference-counted pool storage.
//!
//! Pools hold every variable and constraint ever generated, shared
//! across all nodes of the tree. Each slot carries an activation count:
//! the number of node active sets currently referencing it. A slot may
//! only be reclaimed when that count is zero.

/// One slot of a pool.
#[derive(Debug, Clone)]
pub struct PoolSlot<T> {
    /// The stored item.
    pub item: T,

    /// Number of active references from node active sets.
    pub active_count: usize,
}

/// Pool statistics.
#[derive(Debug, Default, Clone)]
pub struct PoolStats {
    /// Total items inserted.
    pub total_inserted: usize,

    /// Inserts rejected because the pool was full.
    pub rejected: usize,

    /// Slots reclaimed from unreferenced items.
    pub reclaimed: usize,
}

/// Bounded pool of reference-counted slots.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Option<PoolSlot<T>>>,
    capacity: usize,
    stats: PoolStats,
}

impl<T> Pool<T> {
    /// Create a pool with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            stats: PoolStats::default(),
        }
    }

    /// Insert an item, returning its slot id.
    ///
    /// When the pool is full, an unreferenced slot is reclaimed if one
    /// exists; otherwise `None` is returned and the caller is expected
    /// to discard the item and continue.
    pub fn insert(&mut self, item: T) -> Option<usize> {
        if self.slots.len() < self.capacity {
            self.slots.push(Some(PoolSlot {
                item,
                active_count: 0,
            }));
            self.stats.total_inserted += 1;
            return Some(self.slots.len() - 1);
        }

        // Reclaim: reuse an emptied or unreferenced slot.
        let reusable = self.slots.iter().position(|s| match s {
            None => true,
            Some(slot) => slot.active_count == 0,
        });

        match reusable {
            Some(id) => {
                self.slots[id] = Some(PoolSlot {
                    item,
                    active_count: 0,
                });
                self.stats.total_inserted += 1;
                self.stats.reclaimed += 1;
                Some(id)
            }
            None => {
                self.stats.rejected += 1;
                None
            }
        }
    }

    /// Get an item by id. Panics on a reclaimed slot in debug builds.
    pub fn get(&self, id: usize) -> &T {
        &self.slots[id].as_ref().expect("reclaimed pool slot").item
    }

    /// Check whether a slot currently holds an item.
    pub fn contains(&self, id: usize) -> bool {
        id < self.slots.len() && self.slots[id].is_some()
    }

    /// Increment a slot's activation count.
    pub fn activate(&mut self, id: usize) {
        let slot = self.slots[id].as_mut().expect("reclaimed pool slot");
        slot.active_count += 1;
    }

    /// Decrement a slot's activation count.
    pub fn deactivate(&mut self, id: usize) {
        let slot = self.slots[id].as_mut().expect("reclaimed pool slot");
        debug_assert!(slot.active_count > 0, "deactivate on unreferenced slot");
        slot.active_count = slot.active_count.saturating_sub(1);
    }

    /// Current activation count of a slot.
    pub fn active_count(&self, id: usize) -> usize {
        self.slots[id]
            .as_ref()
            .map(|s| s.active_count)
            .unwrap_or(0)
    }

    /// Iterate over (id, item) for all live slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, s)| s.as_ref().map(|slot| (id, &slot.item)))
    }

    /// Number of slot positions allocated (including reclaimed holes).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Pool capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pool statistics.
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }
}
