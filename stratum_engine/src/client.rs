// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host-collaborator interface.
//!
//! Every outbound signal from the compositor is advisory and
//! asynchronous: the host may coalesce, defer, or batch them, and none
//! of them block the compositor. All methods default to no-ops so test
//! doubles implement only what they observe.

use kurbo::Rect;

/// Callbacks delivered to the host collaborator.
pub trait CompositorClient {
    /// Drawability flipped (renderer lost, textures purged, first
    /// drawable commit arrived).
    fn on_can_draw_state_changed(&mut self, can_draw: bool) {
        let _ = can_draw;
    }

    /// The compositor needs a new commit from the main thread.
    fn set_needs_commit(&mut self) {}

    /// The compositor wants to redraw; `damage` narrows the region when
    /// known.
    fn set_needs_redraw(&mut self, damage: Option<Rect>) {
        let _ = damage;
    }

    /// A tile-management pass should be scheduled.
    fn set_needs_manage_tiles(&mut self) {}

    /// Hint: re-evaluate which tree should be favored for resources.
    fn renew_tree_priority(&mut self) {}

    /// Memory-stats heartbeat, rounded up to bound message frequency.
    /// Sent after every budget enforcement even when nothing changed —
    /// downstream throttling keys on receiving it.
    fn send_managed_memory_stats(&mut self, bytes_allocated: u64) {
        let _ = bytes_allocated;
    }

    /// The output surface is gone; the host must arrange
    /// reinitialization.
    fn did_lose_output_surface(&mut self) {}

    /// The pending tree's required tiles are all resident.
    fn notify_ready_to_activate(&mut self) {}

    /// A pending tree became active.
    fn did_activate_pending_tree(&mut self) {}

    /// A tile in the visible viewport finished rasterizing.
    fn did_initialize_visible_tile(&mut self) {}
}

/// A client that ignores every callback.
#[derive(Debug, Default)]
pub struct NullClient;

impl CompositorClient for NullClient {}
