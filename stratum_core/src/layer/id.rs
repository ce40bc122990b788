// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer identity types.

use core::fmt;

/// Sentinel value meaning "no layer" in slot-index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a layer in one [`LayerStore`](super::LayerStore).
///
/// Carries a slot index plus a generation counter so stale handles are
/// detected after a layer is destroyed and the slot reused. Handles are
/// only meaningful against the store that issued them; cross-tree
/// identity uses [`StableId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter, must match the store's for this slot.
    pub(crate) generation: u32,
}

impl LayerId {
    /// Returns the raw slot index (diagnostics and raw accessors only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({}@gen{})", self.idx, self.generation)
    }
}

/// Commit-assigned identity of a layer, stable across trees and frames.
///
/// The same `StableId` names "the same layer" in the active tree, the
/// pending tree, damage bookkeeping, tilings, and render-pass ids. The
/// main-thread side allocates these; the compositor never invents one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StableId(pub u64);

impl fmt::Debug for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StableId({})", self.0)
    }
}
