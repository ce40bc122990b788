// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The draw-properties pass.
//!
//! One full pre-order walk per frame computes, for every layer: the
//! screen-space transform (ancestor transforms plus scroll translations
//! and the device/page scale), draw opacity, effective hidden state,
//! screen-space and clipped visible rects, and the render target. The
//! walk simultaneously builds the [`DrawData`]: the render-surface list
//! in pre-order (root surface first, so reverse iteration yields every
//! surface before any surface that composites it) with each surface's
//! back-to-front contribution list.
//!
//! Surface promotion happens here: a layer composites its subtree
//! through an intermediate surface when it is the root, is forced to,
//! carries a mask, replica, or filters, or blends a multi-layer subtree
//! with non-unit opacity. A layer that owns a surface restarts opacity
//! accumulation — the accumulated value is applied once when the surface
//! is composited, not per quad.

use alloc::vec::Vec;

use kurbo::{Point, Rect, Size};

use crate::geom::{intersect_nonempty, rect_is_empty, union_nonempty};
use crate::transform::Transform3d;

use super::id::{INVALID, LayerId, StableId};
use super::store::LayerStore;

/// One entry in a surface's back-to-front paint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contribution {
    /// A layer drawing its own quads, by raw slot index.
    Layer(u32),
    /// A child surface composited as a unit, by index into
    /// [`DrawData::surfaces`].
    Surface(usize),
}

/// Per-frame state of one render surface.
#[derive(Clone, Debug)]
pub struct SurfaceData {
    /// Slot of the layer owning this surface.
    pub owner: u32,
    /// Stable identity of the owning layer (keys damage trackers and
    /// render-pass ids across frames).
    pub owner_stable: StableId,
    /// Index of the surface this one composites into; `None` for root.
    pub parent_surface: Option<usize>,
    /// Screen-space rect of the surface's content.
    pub content_rect: Rect,
    /// Clip applied when compositing this surface into its target.
    pub composite_clip: Rect,
    /// Opacity applied when compositing (accumulated from ancestors up
    /// to and including the owner).
    pub composite_opacity: f32,
    /// Mask layer slot, or [`INVALID`].
    pub mask: u32,
    /// Replica layer slot, or [`INVALID`].
    pub replica: u32,
    /// Screen-space footprint of the replica copy ([`Rect::ZERO`] when
    /// there is no replica).
    pub replica_screen_rect: Rect,
    /// Contributing layers and child surfaces, back-to-front.
    pub contributions: Vec<Contribution>,
}

/// Output of the draw-properties pass.
#[derive(Clone, Debug, Default)]
pub struct DrawData {
    /// Render surfaces in pre-order; index 0 is the root surface.
    pub surfaces: Vec<SurfaceData>,
}

impl DrawData {
    /// Returns every drawable layer slot in global back-to-front order,
    /// expanding child surfaces at their paint position.
    #[must_use]
    pub fn layers_back_to_front(&self) -> Vec<u32> {
        let mut out = Vec::new();
        if !self.surfaces.is_empty() {
            self.flatten(0, &mut out);
        }
        out
    }

    /// Returns every drawable layer slot in global front-to-back order.
    #[must_use]
    pub fn layers_front_to_back(&self) -> Vec<u32> {
        let mut order = self.layers_back_to_front();
        order.reverse();
        order
    }

    fn flatten(&self, surface: usize, out: &mut Vec<u32>) {
        for contribution in &self.surfaces[surface].contributions {
            match *contribution {
                Contribution::Layer(slot) => out.push(slot),
                Contribution::Surface(child) => self.flatten(child, out),
            }
        }
    }
}

/// Runs the draw-properties pass over the tree rooted at `root`.
///
/// `viewport` is the output size in physical pixels; `device_scale` and
/// `page_scale` are folded into the root transform. The root surface's
/// content rect is always the full viewport with origin at zero.
#[must_use]
pub fn compute_draw_data(
    store: &mut LayerStore,
    root: LayerId,
    viewport: Size,
    device_scale: f64,
    page_scale: f64,
) -> DrawData {
    let viewport_rect = Rect::from_origin_size(Point::ZERO, viewport);
    let mut data = DrawData::default();
    let scale = device_scale * page_scale;
    let root_transform = Transform3d::from_scale(scale, scale, 1.0);

    walk(
        store,
        &mut data.surfaces,
        root.index(),
        root_transform,
        1.0,
        false,
        viewport_rect,
        usize::MAX,
    );

    if let Some(root_surface) = data.surfaces.first_mut() {
        root_surface.content_rect = viewport_rect;
    }
    data
}

fn surface_needed(store: &LayerStore, slot: u32, is_root: bool) -> bool {
    let i = slot as usize;
    let flags = store.flags[i];
    is_root
        || flags.force_render_surface
        || flags.has_filters
        || store.mask[i] != INVALID
        || store.replica[i] != INVALID
        || (store.local_opacity[i] < 1.0 && store.first_child[i] != INVALID)
}

fn walk(
    store: &mut LayerStore,
    surfaces: &mut Vec<SurfaceData>,
    slot: u32,
    parent_transform: Transform3d,
    inherited_opacity: f32,
    inherited_hidden: bool,
    clip: Rect,
    target_surface: usize,
) {
    let i = slot as usize;
    let is_root = target_surface == usize::MAX;
    let flags = store.flags[i];

    let world = parent_transform * store.local_transform[i];
    let hidden = inherited_hidden || flags.hidden;
    store.screen_transform[i] = world;
    store.effective_hidden[i] = hidden;

    let bounds = store.bounds[i];
    let bounds_rect = Rect::from_origin_size(Point::ZERO, bounds);
    let screen = if rect_is_empty(bounds_rect) {
        Rect::ZERO
    } else {
        world.map_rect(bounds_rect)
    };
    store.screen_rect[i] = screen;

    let owns_surface = surface_needed(store, slot, is_root);
    let (my_surface, quad_opacity, child_opacity);
    if owns_surface {
        let composite_opacity = inherited_opacity * store.local_opacity[i];
        let replica = store.replica[i];
        let replica_screen_rect = if replica != INVALID {
            (world * store.local_transform[replica as usize]).map_rect(bounds_rect)
        } else {
            Rect::ZERO
        };
        surfaces.push(SurfaceData {
            owner: slot,
            owner_stable: store.stable[i],
            parent_surface: (!is_root).then_some(target_surface),
            content_rect: Rect::ZERO,
            composite_clip: clip,
            composite_opacity,
            mask: store.mask[i],
            replica,
            replica_screen_rect,
            contributions: Vec::new(),
        });
        let new_surface = surfaces.len() - 1;
        if !is_root {
            surfaces[target_surface]
                .contributions
                .push(Contribution::Surface(new_surface));
        }
        my_surface = new_surface;
        // Accumulated opacity is applied when the surface composites.
        quad_opacity = 1.0;
        child_opacity = 1.0;
    } else {
        my_surface = target_surface;
        quad_opacity = inherited_opacity * store.local_opacity[i];
        child_opacity = quad_opacity;
    }
    store.draw_opacity[i] = quad_opacity;
    store.render_target[i] = surfaces[my_surface].owner;

    let visible = if hidden {
        Rect::ZERO
    } else {
        intersect_nonempty(screen, clip)
    };
    store.visible_rect[i] = visible;

    if !hidden && flags.draws_content && !rect_is_empty(visible) {
        surfaces[my_surface].contributions.push(Contribution::Layer(slot));
        surfaces[my_surface].content_rect =
            union_nonempty(surfaces[my_surface].content_rect, visible);
    }

    let child_clip = if flags.masks_to_bounds {
        intersect_nonempty(clip, screen)
    } else {
        clip
    };
    let scroll = store.scroll_offset[i] + store.scroll_delta[i];
    let child_transform = world * Transform3d::from_translation(-scroll.x, -scroll.y, 0.0);

    let mask = store.mask[i];
    let replica = store.replica[i];
    let mut child = store.first_child[i];
    while child != INVALID {
        let next = store.next_sibling[child as usize];
        // Mask and replica layers are referenced by role, not painted as
        // ordinary children.
        if child != mask && child != replica {
            walk(
                store,
                surfaces,
                child,
                child_transform,
                child_opacity,
                hidden,
                child_clip,
                my_surface,
            );
        }
        child = next;
    }

    if owns_surface {
        let content = surfaces[my_surface].content_rect;
        let replica_rect = surfaces[my_surface].replica_screen_rect;
        let footprint = union_nonempty(content, replica_rect);
        if !is_root && !rect_is_empty(footprint) {
            surfaces[target_surface].content_rect =
                union_nonempty(surfaces[target_surface].content_rect, footprint);
        }
    }
}
