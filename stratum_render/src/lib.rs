// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame assembly for the stratum compositor: damage, occlusion, render
//! passes, and renderer backends.
//!
//! The crate turns a tree's draw-properties output into something a
//! renderer can consume:
//!
//! ```text
//!   DrawData ──► damage update (per surface, leaf → root)
//!                      │
//!                      ▼
//!   front-to-back walk + OcclusionTracker ──► RenderPass list
//!                      │ prune (fixed point over the pass DAG)
//!                      ▼
//!   Renderer::{Hardware, Software, Delegating}::draw_frame
//! ```
//!
//! **[`region`]** — Disjoint-rect screen-space regions: the coverage
//! arithmetic under occlusion and background filling.
//!
//! **[`damage`]** — Per-surface [`DamageTracker`](damage::DamageTracker)
//! accumulating redraw rects across frames.
//!
//! **[`walk`]** — The front-to-back iterator over a
//! [`DrawData`](stratum_core::layer::DrawData), yielding tagged
//! enter/leave/contributing/self visits.
//!
//! **[`occlusion`]** — [`OcclusionTracker`](occlusion::OcclusionTracker)
//! maintaining opaque coverage per target surface during the walk.
//!
//! **[`pass`]** — The render-pass/quad data model and per-frame
//! [`FrameData`](pass::FrameData).
//!
//! **[`copy`]** — Copy-output requests with an exactly-one-response
//! contract.
//!
//! **[`builder`]** — Pass assembly: quad generation, replica handling,
//! background fill, transitive pruning, and the postcondition checks.
//!
//! **[`renderer`]** — The closed renderer variant set and its uniform
//! draw/swap/capability contract.

pub mod builder;
pub mod copy;
pub mod damage;
pub mod occlusion;
pub mod pass;
pub mod region;
pub mod renderer;
pub mod walk;
