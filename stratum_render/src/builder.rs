// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-pass assembly.
//!
//! One pass per contributing surface, created leaf-before-compositor;
//! then a single front-to-back walk appends quads to the walk-current
//! target, querying the occlusion tracker before every append. Nested
//! surfaces contribute [`DrawQuad::Pass`] quads referencing their pass
//! id instead of re-rasterized content; replicas append their quads
//! immediately after the primary's so they render beneath it.
//!
//! After the walk, the uncovered part of the viewport is filled against
//! the root pass (flat background color, or the overhang texture outside
//! the scrollable content rect), bypassing occlusion accounting since it
//! is definitionally the complement of covered space. Finally the pass
//! DAG is pruned to a fixed point and the assembly postconditions are
//! checked — a violation there is a bug in this subsystem and panics.

use std::collections::{BTreeMap, BTreeSet};

use kurbo::Rect;
use stratum_core::geom::{intersect_nonempty, rect_is_empty};
use stratum_core::layer::{INVALID, LayerContent, StableId};
use stratum_core::transform::Transform3d;
use stratum_core::tree::LayerTree;
use stratum_tiles::manager::{TileManager, TreeKind};
use stratum_tiles::pool::ResourceId;

use crate::copy::CopyOutputRequest;
use crate::occlusion::OcclusionTracker;
use crate::pass::{DrawQuad, FrameData, RenderPass, RenderPassId, SharedQuadState};
use crate::region::subtract_rect;
use crate::walk::{Visit, front_to_back};

/// Everything pass assembly reads besides the tree itself.
#[derive(Debug)]
pub struct BuildInputs<'a> {
    /// The tree to assemble (draw properties must be current).
    pub tree: &'a LayerTree,
    /// Tile manager for tiled-content quads, if one exists.
    pub tiles: Option<&'a TileManager>,
    /// Which tile-manager tree the quads read from.
    pub tree_kind: TreeKind,
    /// Damage for the root surface (explicit + tracked), screen space.
    pub root_damage: Rect,
    /// Damage per non-root surface, keyed by surface owner.
    pub surface_damage: &'a BTreeMap<StableId, Rect>,
    /// Overhang texture for scrolled-past-the-edge space, if any.
    pub overhang_resource: Option<ResourceId>,
    /// Scrollable content rect in screen space (overhang applies
    /// outside it).
    pub scrollable_content_rect: Rect,
    /// Resourceless software mode: exactly one pass, no intermediate
    /// surfaces.
    pub resourceless_software: bool,
}

/// Assembles the render-pass list for one frame.
///
/// `copy_requests` holds pending requests keyed by surface owner;
/// requests whose surfaces produce passes are moved onto those passes.
/// Anything left in the map afterwards could not be serviced this frame
/// and must be answered empty by the caller.
///
/// # Panics
///
/// Panics when an assembly postcondition fails: no passes, root pass
/// not at origin, dangling shared-state index, unresolvable pass
/// reference, or more than one pass in resourceless mode.
pub fn build_render_passes(
    inputs: &BuildInputs<'_>,
    copy_requests: &mut BTreeMap<StableId, Vec<CopyOutputRequest>>,
) -> FrameData {
    let data = &inputs.tree.draw_data;
    assert!(
        !data.surfaces.is_empty(),
        "pass assembly needs at least a root surface"
    );

    let mut frame = FrameData::default();

    // Pass per contributing surface, leaf-before-compositor order
    // (reverse pre-order), skipping surfaces with nothing to draw and
    // no copy request. The root pass always exists and lands last.
    let mut pass_of_surface: Vec<Option<usize>> = vec![None; data.surfaces.len()];
    for surface_index in (0..data.surfaces.len()).rev() {
        let surface = &data.surfaces[surface_index];
        let is_root = surface_index == 0;
        if inputs.resourceless_software && !is_root {
            continue;
        }
        let has_copy_request = copy_requests.contains_key(&surface.owner_stable);
        if !is_root && surface.contributions.is_empty() && !has_copy_request {
            continue;
        }
        let damage = if is_root {
            intersect_nonempty(inputs.root_damage, surface.content_rect)
        } else {
            inputs
                .surface_damage
                .get(&surface.owner_stable)
                .copied()
                .map_or(surface.content_rect, |d| {
                    intersect_nonempty(d, surface.content_rect)
                })
        };
        let mut pass = RenderPass::new(
            RenderPassId::for_surface(surface.owner_stable),
            surface.content_rect,
            damage,
        );
        if let Some(requests) = copy_requests.remove(&surface.owner_stable) {
            pass.copy_requests = requests;
        }
        frame.passes.push(pass);
        pass_of_surface[surface_index] = Some(frame.passes.len() - 1);
    }

    // Single front-to-back walk with occlusion.
    let mut occlusion = OcclusionTracker::new();
    let mut target_stack: Vec<usize> = Vec::new();
    let mut background_fragments: Vec<Rect> = Vec::new();
    let store = &inputs.tree.store;

    for visit in front_to_back(data) {
        match visit {
            Visit::EnterTarget { surface } => {
                occlusion.enter_target();
                let pass = pass_of_surface[surface]
                    .or_else(|| target_stack.last().copied())
                    .unwrap_or(frame.passes.len() - 1);
                target_stack.push(pass);
            }
            Visit::LeaveTarget { surface } => {
                if surface == 0 {
                    // Uncovered viewport space, captured while the root
                    // scope is still open.
                    background_fragments =
                        occlusion.unoccluded_fragments(data.surfaces[0].content_rect);
                }
                let sd = &data.surfaces[surface];
                let opaque_composite = sd.composite_opacity >= 1.0
                    && sd.mask == INVALID
                    && !store.flags_at(sd.owner).has_filters;
                occlusion.leave_target(opaque_composite);
                let _ = target_stack.pop();
            }
            Visit::Itself { slot } => {
                let target = *target_stack.last().expect("layer visited outside a target");
                let visible = store.visible_rect_at(slot);
                if rect_is_empty(visible) {
                    continue;
                }
                let flags = store.flags_at(slot);
                let opacity = store.draw_opacity_at(slot);
                if !occlusion.is_occluded(visible) {
                    append_layer_quads(&mut frame, target, inputs, slot, visible);
                }
                // Occlusion contribution registers even when the layer's
                // own quads were culled.
                if flags.contents_opaque && opacity >= 1.0 {
                    occlusion.add_opaque(visible);
                }
            }
            Visit::ContributingSurface { surface } => {
                if inputs.resourceless_software {
                    continue;
                }
                let Some(pass_index) = pass_of_surface[surface] else {
                    continue;
                };
                let target = *target_stack
                    .last()
                    .expect("contributing surface outside a target");
                let sd = &data.surfaces[surface];
                let content = sd.content_rect;
                let has_copy_request = !frame.passes[pass_index].copy_requests.is_empty();
                if rect_is_empty(content) && !has_copy_request {
                    continue;
                }
                // A fully occluded surface normally contributes nothing,
                // but a pending copy request forces it to draw.
                if occlusion.is_occluded(content) && !has_copy_request {
                    continue;
                }
                let id = frame.passes[pass_index].id;
                let replica_rect = sd.replica_screen_rect;
                let target_pass = &mut frame.passes[target];
                let shared = target_pass.add_shared_state(SharedQuadState {
                    transform: Transform3d::IDENTITY,
                    visible_rect: content,
                    clip: sd.composite_clip,
                    opacity: sd.composite_opacity,
                    blend: sd.composite_opacity < 1.0 || sd.mask != INVALID,
                });
                target_pass.quads.push(DrawQuad::Pass {
                    shared,
                    rect: content,
                    pass: id,
                });
                // The replica renders beneath the primary: appended
                // immediately after it in front-to-back order.
                if sd.replica != INVALID && !rect_is_empty(replica_rect) {
                    target_pass.quads.push(DrawQuad::Pass {
                        shared,
                        rect: replica_rect,
                        pass: id,
                    });
                }
            }
        }
    }

    fill_background(&mut frame, inputs, &background_fragments);
    prune_passes(&mut frame);
    check_postconditions(&frame, inputs.resourceless_software);
    frame
}

fn append_layer_quads(
    frame: &mut FrameData,
    target: usize,
    inputs: &BuildInputs<'_>,
    slot: u32,
    visible: Rect,
) {
    let store = &inputs.tree.store;
    let flags = store.flags_at(slot);
    let opacity = store.draw_opacity_at(slot);
    let stable = store.stable_at(slot);
    let content = store.content_at(slot);
    if matches!(content, LayerContent::None) {
        return;
    }

    let pass = &mut frame.passes[target];
    let shared = pass.add_shared_state(SharedQuadState {
        transform: store.screen_transform_at(slot),
        visible_rect: visible,
        clip: visible,
        opacity,
        blend: !(flags.contents_opaque && opacity >= 1.0),
    });

    match content {
        LayerContent::None => {}
        LayerContent::Solid(color) => {
            pass.quads.push(DrawQuad::SolidColor {
                shared,
                rect: visible,
                color,
            });
        }
        LayerContent::Tiled => {
            let tiles = inputs
                .tiles
                .and_then(|manager| manager.tiles_for(inputs.tree_kind, stable, visible));
            match tiles {
                Some(tiles) => {
                    for (tile_rect, resource) in tiles {
                        let rect = intersect_nonempty(tile_rect, visible);
                        if rect_is_empty(rect) {
                            continue;
                        }
                        match resource {
                            Some(resource) => {
                                pass.quads.push(DrawQuad::Tile {
                                    shared,
                                    rect,
                                    resource,
                                });
                            }
                            None => {
                                frame.contains_incomplete_tile = true;
                                pass.quads.push(DrawQuad::Checkerboard { shared, rect });
                            }
                        }
                    }
                }
                None => {
                    frame.contains_incomplete_tile = true;
                    pass.quads.push(DrawQuad::Checkerboard {
                        shared,
                        rect: visible,
                    });
                }
            }
        }
    }
    frame.will_draw_layers.push(stable);
}

/// Fills uncovered viewport space against the root pass.
fn fill_background(frame: &mut FrameData, inputs: &BuildInputs<'_>, fragments: &[Rect]) {
    let background = inputs.tree.background_color;
    if !background.is_opaque() {
        // A transparent output target keeps its holes.
        return;
    }
    let root = frame.passes.len() - 1;
    let pass = &mut frame.passes[root];
    let shared = pass.add_shared_state(SharedQuadState {
        transform: Transform3d::IDENTITY,
        visible_rect: pass.output_rect,
        clip: pass.output_rect,
        opacity: 1.0,
        blend: false,
    });
    for &fragment in fragments {
        if rect_is_empty(fragment) {
            continue;
        }
        match inputs.overhang_resource {
            Some(resource) => {
                // Overhang texture outside the scrollable content rect,
                // flat color inside it.
                let inside = intersect_nonempty(fragment, inputs.scrollable_content_rect);
                if !rect_is_empty(inside) {
                    pass.quads.push(DrawQuad::SolidColor {
                        shared,
                        rect: inside,
                        color: background,
                    });
                }
                for outside in subtract_rect(fragment, inputs.scrollable_content_rect) {
                    pass.quads.push(DrawQuad::Overhang {
                        shared,
                        rect: outside,
                        resource,
                    });
                }
            }
            None => {
                pass.quads.push(DrawQuad::SolidColor {
                    shared,
                    rect: fragment,
                    color: background,
                });
            }
        }
    }
}

/// Removes dead passes until a fixed point: every surviving pass is
/// reachable from the root (or holds a copy request), and no empty,
/// unreferenced pass remains.
fn prune_passes(frame: &mut FrameData) {
    loop {
        let root_id = frame
            .passes
            .last()
            .expect("prune requires at least the root pass")
            .id;

        // Reference closure from the root and from copy-request passes.
        let mut keep: BTreeSet<RenderPassId> = BTreeSet::new();
        let mut worklist: Vec<RenderPassId> = vec![root_id];
        worklist.extend(
            frame
                .passes
                .iter()
                .filter(|pass| !pass.copy_requests.is_empty())
                .map(|pass| pass.id),
        );
        while let Some(id) = worklist.pop() {
            if !keep.insert(id) {
                continue;
            }
            if let Some(pass) = frame.passes.iter().find(|pass| pass.id == id) {
                worklist.extend(pass.quads.iter().filter_map(DrawQuad::referenced_pass));
            }
        }

        // Referenced-by-survivor set, for the empty-pass rule.
        let referenced: BTreeSet<RenderPassId> = frame
            .passes
            .iter()
            .filter(|pass| keep.contains(&pass.id))
            .flat_map(|pass| pass.quads.iter().filter_map(DrawQuad::referenced_pass))
            .collect();

        let before = frame.passes.len();
        frame.passes.retain(|pass| {
            if pass.id == root_id || !pass.copy_requests.is_empty() {
                return true;
            }
            keep.contains(&pass.id) && (!pass.quads.is_empty() || referenced.contains(&pass.id))
        });
        if frame.passes.len() == before {
            break;
        }
    }
}

fn check_postconditions(frame: &FrameData, resourceless_software: bool) {
    assert!(!frame.passes.is_empty(), "pass assembly produced no passes");
    let root = frame.root_pass().expect("non-empty pass list has a root");
    assert!(
        root.output_rect.x0 == 0.0 && root.output_rect.y0 == 0.0,
        "root pass output rect must have its origin at zero: {:?}",
        root.output_rect
    );
    for pass in &frame.passes {
        assert!(
            pass.shared_states_consistent(),
            "quad references a shared state out of range in pass {:?}",
            pass.id
        );
        for quad in &pass.quads {
            if let Some(referenced) = quad.referenced_pass() {
                assert!(
                    frame.pass_by_id(referenced).is_some(),
                    "pass quad references pruned pass {referenced:?}"
                );
            }
        }
    }
    if resourceless_software {
        assert!(
            frame.passes.len() == 1,
            "resourceless software draws allow exactly one pass"
        );
    }
}
