// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render-pass/quad data model.
//!
//! A [`RenderPass`] is one draw target's worth of quads. Passes form a
//! DAG: a [`DrawQuad::Pass`] references another pass by id, which is how
//! nested surface composition happens without re-rasterizing. The pass
//! list is ordered contributing-before-referencing, with the root pass
//! last.
//!
//! Quads within a pass are stored **front-to-back** (the order the
//! assembly walk visits them); renderers draw each pass's quads in
//! reverse for painter's-algorithm correctness.

use core::fmt;

use kurbo::Rect;
use stratum_core::geom::Color;
use stratum_core::layer::StableId;
use stratum_core::transform::Transform3d;
use stratum_tiles::pool::ResourceId;

use crate::copy::CopyOutputRequest;

/// Identity of a render pass, stable across a frame.
///
/// Derived from the owning surface's [`StableId`], so the same surface
/// produces the same pass id every frame.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderPassId(pub u64);

impl RenderPassId {
    /// The pass id for the surface owned by `stable`.
    #[must_use]
    pub const fn for_surface(stable: StableId) -> Self {
        Self(stable.0)
    }
}

impl fmt::Debug for RenderPassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RenderPassId({})", self.0)
    }
}

/// Draw state shared by consecutive quads from one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedQuadState {
    /// Content-to-target-space transform.
    pub transform: Transform3d,
    /// Visible rect of the content, in target space.
    pub visible_rect: Rect,
    /// Clip applied to all quads using this state.
    pub clip: Rect,
    /// Opacity applied to all quads using this state.
    pub opacity: f32,
    /// Whether blending is required (transparent content or opacity).
    pub blend: bool,
}

/// One drawable unit.
///
/// Every variant carries `shared`, an index into the owning pass's
/// shared-state list; an out-of-range index is a fatal invariant
/// violation checked at assembly time.
#[derive(Debug)]
pub enum DrawQuad {
    /// A flat colored rect.
    SolidColor {
        /// Index into the pass's shared-state list.
        shared: usize,
        /// Quad rect in target space.
        rect: Rect,
        /// Fill color.
        color: Color,
    },
    /// Rasterized tile content.
    Tile {
        /// Index into the pass's shared-state list.
        shared: usize,
        /// Quad rect in target space.
        rect: Rect,
        /// Resident tile resource.
        resource: ResourceId,
    },
    /// Placeholder for missing tile content.
    Checkerboard {
        /// Index into the pass's shared-state list.
        shared: usize,
        /// Quad rect in target space.
        rect: Rect,
    },
    /// The pre-rendered content of another pass.
    Pass {
        /// Index into the pass's shared-state list.
        shared: usize,
        /// Quad rect in target space.
        rect: Rect,
        /// Referenced pass.
        pass: RenderPassId,
    },
    /// Overhang texture stretched over scrolled-past-the-edge space.
    Overhang {
        /// Index into the pass's shared-state list.
        shared: usize,
        /// Quad rect in target space.
        rect: Rect,
        /// Overhang texture resource.
        resource: ResourceId,
    },
}

impl DrawQuad {
    /// The shared-state index of this quad.
    #[must_use]
    pub fn shared_index(&self) -> usize {
        match *self {
            Self::SolidColor { shared, .. }
            | Self::Tile { shared, .. }
            | Self::Checkerboard { shared, .. }
            | Self::Pass { shared, .. }
            | Self::Overhang { shared, .. } => shared,
        }
    }

    /// The target-space rect of this quad.
    #[must_use]
    pub fn rect(&self) -> Rect {
        match *self {
            Self::SolidColor { rect, .. }
            | Self::Tile { rect, .. }
            | Self::Checkerboard { rect, .. }
            | Self::Pass { rect, .. }
            | Self::Overhang { rect, .. } => rect,
        }
    }

    /// The referenced pass id, for [`DrawQuad::Pass`] quads.
    #[must_use]
    pub fn referenced_pass(&self) -> Option<RenderPassId> {
        match *self {
            Self::Pass { pass, .. } => Some(pass),
            _ => None,
        }
    }
}

/// One draw target's worth of quads.
#[derive(Debug, Default)]
pub struct RenderPass {
    /// Pass identity, referenceable from other passes' quads.
    pub id: RenderPassId,
    /// Output rect in the pass's own space.
    pub output_rect: Rect,
    /// Damage-derived scissor for partial redraw.
    pub damage_rect: Rect,
    /// Shared draw state referenced by quads.
    pub shared_states: Vec<SharedQuadState>,
    /// Quads, front-to-back. Renderers draw in reverse.
    pub quads: Vec<DrawQuad>,
    /// Copy requests to service against this pass's output.
    pub copy_requests: Vec<CopyOutputRequest>,
}

impl Default for RenderPassId {
    fn default() -> Self {
        Self(0)
    }
}

impl RenderPass {
    /// Creates an empty pass.
    #[must_use]
    pub fn new(id: RenderPassId, output_rect: Rect, damage_rect: Rect) -> Self {
        Self {
            id,
            output_rect,
            damage_rect,
            shared_states: Vec::new(),
            quads: Vec::new(),
            copy_requests: Vec::new(),
        }
    }

    /// Appends a shared state, returning its index for quads.
    pub fn add_shared_state(&mut self, state: SharedQuadState) -> usize {
        self.shared_states.push(state);
        self.shared_states.len() - 1
    }

    /// Returns whether every quad's shared-state index resolves.
    #[must_use]
    pub fn shared_states_consistent(&self) -> bool {
        self.quads
            .iter()
            .all(|quad| quad.shared_index() < self.shared_states.len())
    }
}

/// Everything one draw attempt produces, consumed by the renderer and
/// then discarded.
#[derive(Debug, Default)]
pub struct FrameData {
    /// Passes in contributing-before-referencing order; root pass last.
    pub passes: Vec<RenderPass>,
    /// True when the frame can be treated as a successful empty swap.
    pub has_no_damage: bool,
    /// True when some required tile content was missing (checkerboard).
    pub contains_incomplete_tile: bool,
    /// Stable ids of layers that will draw this frame (for will/did-draw
    /// notifications).
    pub will_draw_layers: Vec<StableId>,
}

impl FrameData {
    /// The root pass (the last one), if any passes exist.
    #[must_use]
    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.passes.last()
    }

    /// Looks up a pass by id.
    #[must_use]
    pub fn pass_by_id(&self, id: RenderPassId) -> Option<&RenderPass> {
        self.passes.iter().find(|pass| pass.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SharedQuadState {
        SharedQuadState {
            transform: Transform3d::IDENTITY,
            visible_rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            clip: Rect::new(0.0, 0.0, 10.0, 10.0),
            opacity: 1.0,
            blend: false,
        }
    }

    #[test]
    fn shared_state_indices_resolve() {
        let mut pass = RenderPass::new(
            RenderPassId(1),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::ZERO,
        );
        let shared = pass.add_shared_state(state());
        pass.quads.push(DrawQuad::SolidColor {
            shared,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            color: Color::WHITE,
        });
        assert!(pass.shared_states_consistent());

        pass.quads.push(DrawQuad::Checkerboard {
            shared: 7,
            rect: Rect::ZERO,
        });
        assert!(!pass.shared_states_consistent());
    }

    #[test]
    fn pass_ids_derive_from_surface_identity() {
        assert_eq!(
            RenderPassId::for_surface(StableId(9)),
            RenderPassId(9)
        );
    }

    #[test]
    fn frame_data_lookup() {
        let mut frame = FrameData::default();
        frame.passes.push(RenderPass::new(
            RenderPassId(2),
            Rect::new(0.0, 0.0, 50.0, 50.0),
            Rect::ZERO,
        ));
        frame.passes.push(RenderPass::new(
            RenderPassId(1),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::ZERO,
        ));
        assert_eq!(frame.root_pass().map(|pass| pass.id), Some(RenderPassId(1)));
        assert!(frame.pass_by_id(RenderPassId(2)).is_some());
        assert!(frame.pass_by_id(RenderPassId(3)).is_none());
    }
}
