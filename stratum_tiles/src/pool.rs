// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared resource accounting.

use std::collections::BTreeMap;
use std::fmt;

/// An opaque handle to one allocated resource (tile texture, UI bitmap).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub u64);

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

/// Byte accounting for every resource the compositor holds.
///
/// The pool is shared across the active/pending/recycle trees and the
/// UI-resource table; mutation is serialized by single-threaded
/// impl-role ownership. The pool itself enforces nothing — budget
/// decisions belong to the tile manager.
#[derive(Debug, Default)]
pub struct ResourcePool {
    next_id: u64,
    sizes: BTreeMap<ResourceId, u64>,
    total_bytes: u64,
    uploads_nonblocking: bool,
}

impl ResourcePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an accounting entry of `bytes` and returns its handle.
    pub fn allocate(&mut self, bytes: u64) -> ResourceId {
        let id = ResourceId(self.next_id);
        self.next_id += 1;
        self.sizes.insert(id, bytes);
        self.total_bytes += bytes;
        id
    }

    /// Frees a resource; returns the bytes released.
    ///
    /// Freeing an unknown handle is a no-op returning zero (the resource
    /// may already have been dropped by a teardown pass).
    pub fn free(&mut self, id: ResourceId) -> u64 {
        let bytes = self.sizes.remove(&id).unwrap_or(0);
        self.total_bytes -= bytes;
        bytes
    }

    /// Frees everything; returns the bytes released.
    pub fn free_all(&mut self) -> u64 {
        let released = self.total_bytes;
        self.sizes.clear();
        self.total_bytes = 0;
        released
    }

    /// Returns whether the handle is live.
    #[must_use]
    pub fn contains(&self, id: ResourceId) -> bool {
        self.sizes.contains_key(&id)
    }

    /// Total bytes currently allocated.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Number of live resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.sizes.len()
    }

    /// Marks pending uploads as non-blocking (or not).
    ///
    /// Flipped to `true` strictly after all layers have been notified of
    /// a finished draw, so a later frame's uploads are not throttled by
    /// a draw still consuming the prior frame's textures.
    pub fn set_uploads_nonblocking(&mut self, nonblocking: bool) {
        self.uploads_nonblocking = nonblocking;
    }

    /// Returns the current upload throttling state.
    #[must_use]
    pub fn uploads_nonblocking(&self) -> bool {
        self.uploads_nonblocking
    }
}
