// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer arena and draw-properties pass.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity: a generational [`LayerId`] handle scoped to its store,
//!   plus a commit-assigned [`StableId`] used across trees and frames.
//! - Topology: parent, first-child, and sibling links forming an ordered
//!   tree, plus weak scroll-parent / mask / replica links stored as slot
//!   indices.
//! - **Local properties** set by commits or input handling: transform,
//!   bounds, opacity, content, scroll state, and [`LayerFlags`].
//! - **Computed properties** produced by the draw-properties pass
//!   ([`compute_draw_data`]): screen transform, draw opacity, effective
//!   hidden state, screen-space and visible rects, and the render target.
//!
//! Layers live in struct-of-arrays storage ([`LayerStore`]) with
//! index-based handles for cache-friendly traversal. Property mutations
//! mark dirty channels (see [`dirty`](crate::dirty)); draining them in
//! [`LayerStore::evaluate`] yields the per-frame change sets that feed
//! damage tracking.

mod id;
mod props;
mod store;
mod traverse;

pub use id::{INVALID, LayerId, StableId};
pub use props::{Contribution, DrawData, SurfaceData, compute_draw_data};
pub use store::{FrameChanges, LayerContent, LayerFlags, LayerStore};
pub use traverse::Children;
