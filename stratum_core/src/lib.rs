// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer trees, tree lifecycle, input handling, and frame timing for the
//! stratum compositor.
//!
//! `stratum_core` owns everything on the compositor-thread side of the
//! commit boundary that is not frame assembly or rendering: the layer
//! arena, the active/pending/recycle tree set, the scroll/pinch input
//! state machine, memory-policy types, and the tick adapter. It is
//! `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! A frame moves through the crate like this:
//!
//! ```text
//!   main thread commit ──► TreeSet::pending (LayerTree)
//!                               │ raster ready
//!                               ▼
//!                     TreeSet::activate_pending()
//!                               │
//!                               ▼
//!   LayerTree::update_draw_properties() ──► DrawData
//!                               │
//!                               ▼
//!         (stratum_render: damage, occlusion, passes)
//! ```
//!
//! **[`layer`]** — Struct-of-arrays layer arena with generational handles
//! and stable cross-commit identities. Local properties are set by
//! commits or input handling; screen transforms, draw opacities, and the
//! render-surface list are produced by the draw-properties pass.
//!
//! **[`tree`]** — [`LayerTree`](tree::LayerTree) plus the three-slot
//! [`TreeSet`](tree::TreeSet) (active/pending/recycle) and the commit /
//! activation lifecycle.
//!
//! **[`input`]** — Compositor-thread scrolling: hit testing, delta
//! projection and bubbling, pinch anchoring, top-controls handoff.
//!
//! **[`policy`]** — Managed memory policy and priority cutoffs consumed
//! by the tile manager.
//!
//! **[`ticker`]** — Periodic tick delivery decoupled from the platform
//! timer, and the impl-thread identity guard for single-threaded
//! configurations.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) instrumentation
//! contract with the zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): enables `std` support in dependencies.
//! - `trace` (disabled by default): enables `Tracer` method bodies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod geom;
pub mod input;
pub mod layer;
pub mod policy;
pub mod ticker;
pub mod time;
pub mod trace;
pub mod transform;
pub mod tree;
