// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor-owned bitmap resources.
//!
//! UI resources (overlay images, scrollbar thumbs, background textures)
//! are mapped to pool resources independently of tile content. They
//! survive across frames until explicitly deleted, and are dropped
//! wholesale on context loss — after which the `evicted` flag blocks
//! drawing until the owner recreates them.

use std::collections::BTreeMap;
use std::fmt;

use crate::pool::{ResourceId, ResourcePool};

/// Caller-assigned identity of a UI resource.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UiResourceId(pub u32);

impl fmt::Debug for UiResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UiResourceId({})", self.0)
    }
}

/// The UI-resource id table.
#[derive(Debug, Default)]
pub struct UiResourceTable {
    map: BTreeMap<UiResourceId, ResourceId>,
    evicted: bool,
}

impl UiResourceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) a UI resource of `bytes` bytes.
    pub fn create(&mut self, pool: &mut ResourcePool, id: UiResourceId, bytes: u64) {
        if let Some(old) = self.map.insert(id, pool.allocate(bytes)) {
            let _ = pool.free(old);
        }
    }

    /// Deletes a UI resource. Unknown ids are ignored (the table may
    /// have been evicted since the caller last looked).
    pub fn delete(&mut self, pool: &mut ResourcePool, id: UiResourceId) {
        if let Some(resource) = self.map.remove(&id) {
            let _ = pool.free(resource);
        }
    }

    /// Resolves a UI resource to its pool handle.
    #[must_use]
    pub fn resource_for(&self, id: UiResourceId) -> Option<ResourceId> {
        self.map.get(&id).copied()
    }

    /// Drops every resource (context loss). Sets the evicted flag, which
    /// blocks drawing until the owner recreates its resources and calls
    /// [`clear_evicted`](Self::clear_evicted).
    pub fn evict_all(&mut self, pool: &mut ResourcePool) -> u64 {
        let mut freed = 0;
        let map = core::mem::take(&mut self.map);
        for resource in map.into_values() {
            freed += pool.free(resource);
        }
        self.evicted = true;
        freed
    }

    /// Whether an eviction is still unacknowledged.
    #[must_use]
    pub fn evicted(&self) -> bool {
        self.evicted
    }

    /// Acknowledges an eviction after resources were recreated.
    pub fn clear_evicted(&mut self) {
        self.evicted = false;
    }

    /// Number of live UI resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_resolve() {
        let mut pool = ResourcePool::new();
        let mut table = UiResourceTable::new();
        table.create(&mut pool, UiResourceId(1), 64);
        assert!(table.resource_for(UiResourceId(1)).is_some());
        assert_eq!(pool.total_bytes(), 64);
    }

    #[test]
    fn replacement_frees_the_old_resource() {
        let mut pool = ResourcePool::new();
        let mut table = UiResourceTable::new();
        table.create(&mut pool, UiResourceId(1), 64);
        let first = table.resource_for(UiResourceId(1)).expect("created");
        table.create(&mut pool, UiResourceId(1), 32);
        assert!(!pool.contains(first));
        assert_eq!(pool.total_bytes(), 32);
    }

    #[test]
    fn delete_frees_and_tolerates_unknown_ids() {
        let mut pool = ResourcePool::new();
        let mut table = UiResourceTable::new();
        table.create(&mut pool, UiResourceId(1), 64);
        table.delete(&mut pool, UiResourceId(1));
        table.delete(&mut pool, UiResourceId(1));
        assert_eq!(pool.total_bytes(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn evict_all_flags_until_cleared() {
        let mut pool = ResourcePool::new();
        let mut table = UiResourceTable::new();
        table.create(&mut pool, UiResourceId(1), 64);
        table.create(&mut pool, UiResourceId(2), 64);

        assert_eq!(table.evict_all(&mut pool), 128);
        assert!(table.evicted());
        assert!(table.is_empty());
        assert_eq!(pool.total_bytes(), 0);

        table.create(&mut pool, UiResourceId(1), 64);
        table.clear_evicted();
        assert!(!table.evicted());
        assert_eq!(table.len(), 1);
    }
}
