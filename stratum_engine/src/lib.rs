// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stratum compositor.
//!
//! [`Compositor`] owns everything on the impl-thread side: the
//! active/pending/recycle tree set, damage trackers, the tile manager
//! and resource pool, the scroll state machine, the tick adapter, and
//! the renderer. The host collaborator drives it through method calls
//! (commits, input, policy and visibility changes) and receives advisory
//! callbacks through [`CompositorClient`] — every callback is
//! non-blocking and may be coalesced by the host.
//!
//! A frame goes: commit → (pending raster, activation) →
//! [`Compositor::prepare_to_draw`] → [`Compositor::draw`] →
//! [`Compositor::swap_buffers`]. Preparation can conclude "nothing to
//! draw" ([`FrameData::has_no_damage`]) or veto the swap
//! ([`DrawResult::AbortCheckerboardAnimation`]) without either being an
//! error.
//!
//! [`FrameData::has_no_damage`]: stratum_render::pass::FrameData

pub mod client;
pub mod compositor;

pub use client::CompositorClient;
pub use compositor::{
    AnimationDriver, Compositor, CompositorContext, CompositorSettings, DebugState, DrawResult,
    RendererInitState,
};
