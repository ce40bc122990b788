// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Front-to-back traversal of a frame's surface/layer structure.
//!
//! Pass assembly and occlusion tracking both consume the same strict
//! front-to-back order. Rather than an iterator with overloaded
//! begin/end semantics, the walk produces an explicit sequence of tagged
//! [`Visit`] events: entering a target surface, a layer representing
//! itself, a child surface contributing to its parent, and leaving a
//! target surface. Enter/leave pairs are what let the occlusion tracker
//! scope opaque coverage per target.

use stratum_core::layer::{Contribution, DrawData};

/// One event of the front-to-back walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    /// Quad generation for the given surface starts; it becomes the
    /// current draw target.
    EnterTarget {
        /// Index into [`DrawData::surfaces`].
        surface: usize,
    },
    /// A child surface composites into the current target at this point
    /// in the paint order.
    ContributingSurface {
        /// Index into [`DrawData::surfaces`] of the child.
        surface: usize,
    },
    /// A layer draws its own quads into the current target.
    Itself {
        /// Raw layer slot.
        slot: u32,
    },
    /// Quad generation for the surface is done; the previous target
    /// becomes current again.
    LeaveTarget {
        /// Index into [`DrawData::surfaces`].
        surface: usize,
    },
}

/// Produces the front-to-back visit sequence for a frame.
///
/// Within each surface, contributions are visited in reverse paint
/// order (front first). A contributing surface is announced in its
/// parent's order before its own interior is walked.
#[must_use]
pub fn front_to_back(data: &DrawData) -> Vec<Visit> {
    let mut out = Vec::new();
    if !data.surfaces.is_empty() {
        walk_surface(data, 0, &mut out);
    }
    out
}

fn walk_surface(data: &DrawData, surface: usize, out: &mut Vec<Visit>) {
    out.push(Visit::EnterTarget { surface });
    for contribution in data.surfaces[surface].contributions.iter().rev() {
        match *contribution {
            Contribution::Layer(slot) => out.push(Visit::Itself { slot }),
            Contribution::Surface(child) => {
                out.push(Visit::ContributingSurface { surface: child });
                walk_surface(data, child, out);
            }
        }
    }
    out.push(Visit::LeaveTarget { surface });
}
