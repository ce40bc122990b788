// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The layer arena uses multi-channel dirty tracking (via
//! [`understory_dirty`]) so the draw-properties pass only recomputes what
//! a commit or input event actually touched.
//!
//! # Propagation semantics
//!
//! - **Propagating** — [`TRANSFORM`] and [`OPACITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with child→parent
//!   dependency edges: screen transforms, draw opacities, and effective
//!   hidden state are inherited, so marking a layer marks its subtree.
//!   Hidden-flag and scroll-offset changes are routed through
//!   [`TRANSFORM`] because both move or reveal descendant content.
//! - **Local-only** — [`CLIP`] and [`CONTENT`] mark just the mutated
//!   layer.
//! - **Structural** — [`TOPOLOGY`] is marked by create/destroy/reparent
//!   and triggers a traversal-order rebuild at the next evaluation.
//!
//! Draining happens inside
//! [`LayerStore::evaluate`](crate::layer::LayerStore::evaluate); the
//! drained slot sets double as the per-frame "appearance changed" input
//! to damage tracking.

use understory_dirty::Channel;

/// Transform, scroll offset, or hidden flag changed — screen transforms
/// and effective hidden state must be recomputed for the subtree.
pub const TRANSFORM: Channel = Channel::new(0);

/// Opacity changed — draw opacity must be recomputed for the subtree.
pub const OPACITY: Channel = Channel::new(1);

/// Clip changed — no propagation.
pub const CLIP: Channel = Channel::new(2);

/// Drawn content (color, tiling, bounds, opaque flag) changed — no
/// propagation.
pub const CONTENT: Channel = Channel::new(3);

/// Tree topology changed — triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(4);
