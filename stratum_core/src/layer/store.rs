// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and
//! property management.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::{Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;
use crate::geom::Color;
use crate::transform::Transform3d;

use super::id::{INVALID, LayerId, StableId};
use super::traverse::Children;

/// Per-layer boolean properties.
///
/// `hidden` suppresses the visual contribution of the layer and its
/// whole subtree; properties can still be mutated while hidden.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// Whether the layer (and its subtree) is hidden.
    pub hidden: bool,
    /// Whether the layer produces quads itself (as opposed to being a
    /// grouping or scroll-container node).
    pub draws_content: bool,
    /// Whether the drawn content covers its bounds with no transparency.
    /// Feeds the occlusion tracker.
    pub contents_opaque: bool,
    /// Whether descendants are clipped to this layer's bounds.
    pub masks_to_bounds: bool,
    /// Whether the layer accepts compositor-thread scrolls.
    pub scrollable: bool,
    /// Whether gestures hitting this layer must be handed to the main
    /// thread instead of being handled here.
    pub main_thread_scrolling: bool,
    /// Forces an intermediate render surface for the subtree.
    pub force_render_surface: bool,
    /// Whether the subtree has filters (always composited through a
    /// surface; filter changes damage the whole surface).
    pub has_filters: bool,
    /// Whether a compositor-driven transform animation is running. A
    /// layer animating with missing tiles vetoes the frame swap.
    pub transform_animating: bool,
}

/// What a layer draws.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LayerContent {
    /// Nothing — a grouping / scroll-container node.
    #[default]
    None,
    /// A solid color filling the bounds.
    Solid(Color),
    /// Rasterized tile content, managed under this layer's [`StableId`]
    /// by the tile manager.
    Tiled,
}

/// Change sets produced by a single [`LayerStore::evaluate`] call.
///
/// Slot indices, not handles: consumers feed them straight into the
/// `*_at()` raw accessors without paying generation checks.
#[derive(Clone, Debug, Default)]
pub struct FrameChanges {
    /// Layers whose transform, scroll offset, or hidden flag changed
    /// (including descendants of such layers).
    pub transforms: Vec<u32>,
    /// Layers whose opacity changed (including descendants).
    pub opacities: Vec<u32>,
    /// Layers whose clip changed.
    pub clips: Vec<u32>,
    /// Layers whose drawn content or bounds changed.
    pub content: Vec<u32>,
    /// Whether the traversal order was rebuilt.
    pub topology_changed: bool,
}

impl FrameChanges {
    /// Returns whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
            && self.opacities.is_empty()
            && self.clips.is_empty()
            && self.content.is_empty()
            && !self.topology_changed
    }
}

/// Struct-of-arrays storage for all layers of one tree.
///
/// Layers are addressed by generational [`LayerId`] handles; destroyed
/// slots are recycled via a free list. Every layer additionally carries
/// a [`StableId`] for cross-tree identity, indexed by `by_stable`.
#[derive(Debug)]
pub struct LayerStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Identity --
    pub(crate) stable: Vec<StableId>,
    by_stable: BTreeMap<StableId, u32>,

    // -- Local properties --
    pub(crate) local_transform: Vec<Transform3d>,
    pub(crate) bounds: Vec<Size>,
    pub(crate) local_opacity: Vec<f32>,
    pub(crate) content: Vec<LayerContent>,
    pub(crate) flags: Vec<LayerFlags>,
    pub(crate) scroll_offset: Vec<Vec2>,
    pub(crate) scroll_delta: Vec<Vec2>,
    pub(crate) max_scroll_offset: Vec<Vec2>,
    pub(crate) scroll_parent: Vec<u32>,
    pub(crate) mask: Vec<u32>,
    pub(crate) replica: Vec<u32>,

    // -- Computed properties (written by the draw-properties pass) --
    pub(crate) screen_transform: Vec<Transform3d>,
    pub(crate) draw_opacity: Vec<f32>,
    pub(crate) effective_hidden: Vec<bool>,
    pub(crate) screen_rect: Vec<Rect>,
    pub(crate) visible_rect: Vec<Rect>,
    pub(crate) render_target: Vec<u32>,

    // -- Change tracking --
    pub(crate) appearance_changed: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    traversal_order: Vec<u32>,
    traversal_dirty: bool,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            stable: Vec::new(),
            by_stable: BTreeMap::new(),
            local_transform: Vec::new(),
            bounds: Vec::new(),
            local_opacity: Vec::new(),
            content: Vec::new(),
            flags: Vec::new(),
            scroll_offset: Vec::new(),
            scroll_delta: Vec::new(),
            max_scroll_offset: Vec::new(),
            scroll_parent: Vec::new(),
            mask: Vec::new(),
            replica: Vec::new(),
            screen_transform: Vec::new(),
            draw_opacity: Vec::new(),
            effective_hidden: Vec::new(),
            screen_rect: Vec::new(),
            visible_rect: Vec::new(),
            render_target: Vec::new(),
            appearance_changed: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
        }
    }

    /// Number of live layers.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Allocation API --

    /// Creates a new layer with the given stable identity.
    ///
    /// The layer starts with an identity transform, empty bounds, full
    /// opacity, no content, default flags, and no parent.
    ///
    /// # Panics
    ///
    /// Panics if `stable` already names a live layer in this store.
    pub fn create_layer(&mut self, stable: StableId) -> LayerId {
        assert!(
            !self.by_stable.contains_key(&stable),
            "duplicate StableId in one tree: {stable:?}"
        );
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.stable[i] = stable;
            self.local_transform[i] = Transform3d::IDENTITY;
            self.bounds[i] = Size::ZERO;
            self.local_opacity[i] = 1.0;
            self.content[i] = LayerContent::None;
            self.flags[i] = LayerFlags::default();
            self.scroll_offset[i] = Vec2::ZERO;
            self.scroll_delta[i] = Vec2::ZERO;
            self.max_scroll_offset[i] = Vec2::ZERO;
            self.scroll_parent[i] = INVALID;
            self.mask[i] = INVALID;
            self.replica[i] = INVALID;
            self.screen_transform[i] = Transform3d::IDENTITY;
            self.draw_opacity[i] = 1.0;
            self.effective_hidden[i] = false;
            self.screen_rect[i] = Rect::ZERO;
            self.visible_rect[i] = Rect::ZERO;
            self.render_target[i] = INVALID;
            self.appearance_changed[i] = false;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.stable.push(stable);
            self.local_transform.push(Transform3d::IDENTITY);
            self.bounds.push(Size::ZERO);
            self.local_opacity.push(1.0);
            self.content.push(LayerContent::None);
            self.flags.push(LayerFlags::default());
            self.scroll_offset.push(Vec2::ZERO);
            self.scroll_delta.push(Vec2::ZERO);
            self.max_scroll_offset.push(Vec2::ZERO);
            self.scroll_parent.push(INVALID);
            self.mask.push(INVALID);
            self.replica.push(INVALID);
            self.screen_transform.push(Transform3d::IDENTITY);
            self.draw_opacity.push(1.0);
            self.effective_hidden.push(false);
            self.screen_rect.push(Rect::ZERO);
            self.visible_rect.push(Rect::ZERO);
            self.render_target.push(INVALID);
            self.appearance_changed.push(false);
            self.generation.push(0);
            idx
        };

        self.by_stable.insert(stable, idx);
        self.traversal_dirty = true;
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark(idx, dirty::CONTENT);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// Weak references to the destroyed slot (scroll-parent, mask,
    /// replica) held by other layers become dangling and are ignored by
    /// the draw-properties pass.
    ///
    /// # Panics
    ///
    /// Panics if the layer still has children, or the handle is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        self.dirty.remove_key(idx);
        self.by_stable.remove(&self.stable[idx as usize]);
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Looks up a layer by its stable identity.
    #[must_use]
    pub fn by_stable(&self, stable: StableId) -> Option<LayerId> {
        let idx = *self.by_stable.get(&stable)?;
        Some(LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` already has a parent.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Inherited channels flow child←parent.
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| LayerId {
            idx: p,
            generation: self.generation[p as usize],
        })
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    // -- Property setters (auto-mark dirty) --

    /// Sets the local transform; propagates to the subtree.
    pub fn set_transform(&mut self, id: LayerId, transform: Transform3d) {
        self.validate(id);
        self.local_transform[id.idx as usize] = transform;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the local opacity; propagates to the subtree.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        self.validate(id);
        self.local_opacity[id.idx as usize] = opacity;
        self.dirty.mark_with(id.idx, dirty::OPACITY, &EagerPolicy);
    }

    /// Sets the layer bounds.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Size) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets what the layer draws.
    pub fn set_content(&mut self, id: LayerId, content: LayerContent) {
        self.validate(id);
        self.content[id.idx as usize] = content;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the layer flags.
    ///
    /// Routed through the TRANSFORM channel: hidden and clip flags
    /// change what the whole subtree shows. A clip-flag change also
    /// marks the local-only CLIP channel.
    pub fn set_flags(&mut self, id: LayerId, flags: LayerFlags) {
        self.validate(id);
        let old = self.flags[id.idx as usize];
        self.flags[id.idx as usize] = flags;
        if old.masks_to_bounds != flags.masks_to_bounds {
            self.dirty.mark(id.idx, dirty::CLIP);
        }
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the committed scroll offset (from a commit, not from input).
    pub fn set_scroll_offset(&mut self, id: LayerId, offset: Vec2) {
        self.validate(id);
        self.scroll_offset[id.idx as usize] = offset;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the furthest scrollable offset. Not a visual change by
    /// itself, so no channel is marked.
    pub fn set_max_scroll_offset(&mut self, id: LayerId, max: Vec2) {
        self.validate(id);
        self.max_scroll_offset[id.idx as usize] = max;
    }

    /// Sets the scroll-parent link (weak). `None` falls back to the
    /// structural parent during scroll bubbling.
    pub fn set_scroll_parent(&mut self, id: LayerId, scroll_parent: Option<LayerId>) {
        self.validate(id);
        self.scroll_parent[id.idx as usize] = match scroll_parent {
            Some(sp) => {
                self.validate(sp);
                sp.idx
            }
            None => INVALID,
        };
    }

    /// Sets the mask layer link (weak; the mask layer stays owned by the
    /// tree like any other layer but is excluded from normal drawing).
    pub fn set_mask(&mut self, id: LayerId, mask: Option<LayerId>) {
        self.validate(id);
        self.mask[id.idx as usize] = match mask {
            Some(m) => {
                self.validate(m);
                m.idx
            }
            None => INVALID,
        };
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the replica layer link (weak).
    pub fn set_replica(&mut self, id: LayerId, replica: Option<LayerId>) {
        self.validate(id);
        self.replica[id.idx as usize] = match replica {
            Some(r) => {
                self.validate(r);
                r.idx
            }
            None => INVALID,
        };
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Applies an impl-side scroll delta, clamped to the scroll extents.
    ///
    /// Returns the delta actually applied in layer-local space.
    pub fn scroll_by(&mut self, id: LayerId, delta: Vec2) -> Vec2 {
        self.validate(id);
        let i = id.idx as usize;
        let total = self.scroll_offset[i] + self.scroll_delta[i];
        let max = self.max_scroll_offset[i];
        let target = Vec2::new(
            (total.x + delta.x).clamp(0.0, max.x),
            (total.y + delta.y).clamp(0.0, max.y),
        );
        let applied = target - total;
        if applied != Vec2::ZERO {
            self.scroll_delta[i] += applied;
            self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
        }
        applied
    }

    // -- Property getters --

    /// Returns the stable identity of a layer.
    #[must_use]
    pub fn stable_id(&self, id: LayerId) -> StableId {
        self.validate(id);
        self.stable[id.idx as usize]
    }

    /// Returns the local transform.
    #[must_use]
    pub fn local_transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the layer bounds.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Size {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the local opacity.
    #[must_use]
    pub fn local_opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.local_opacity[id.idx as usize]
    }

    /// Returns the layer content.
    #[must_use]
    pub fn content(&self, id: LayerId) -> LayerContent {
        self.validate(id);
        self.content[id.idx as usize]
    }

    /// Returns the layer flags.
    #[must_use]
    pub fn flags(&self, id: LayerId) -> LayerFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the committed scroll offset plus the impl-side delta.
    #[must_use]
    pub fn total_scroll_offset(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.scroll_offset[id.idx as usize] + self.scroll_delta[id.idx as usize]
    }

    /// Returns the impl-side scroll delta alone.
    #[must_use]
    pub fn scroll_delta(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.scroll_delta[id.idx as usize]
    }

    /// Returns the maximum scroll offset.
    #[must_use]
    pub fn max_scroll_offset(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.max_scroll_offset[id.idx as usize]
    }

    /// Returns the computed screen-space transform.
    ///
    /// Only valid after the draw-properties pass has run.
    #[must_use]
    pub fn screen_transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.screen_transform[id.idx as usize]
    }

    /// Returns the computed draw opacity.
    #[must_use]
    pub fn draw_opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.draw_opacity[id.idx as usize]
    }

    /// Returns the computed screen-space visible rect.
    #[must_use]
    pub fn visible_rect(&self, id: LayerId) -> Rect {
        self.validate(id);
        self.visible_rect[id.idx as usize]
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `FrameChanges` and
    // `DrawData`) and skip generation validation. Only use with indices
    // that came from those sources.

    /// Stable identity at raw slot `idx`.
    #[must_use]
    pub fn stable_at(&self, idx: u32) -> StableId {
        self.check_slot(idx);
        self.stable[idx as usize]
    }

    /// Flags at raw slot `idx`.
    #[must_use]
    pub fn flags_at(&self, idx: u32) -> LayerFlags {
        self.check_slot(idx);
        self.flags[idx as usize]
    }

    /// Content at raw slot `idx`.
    #[must_use]
    pub fn content_at(&self, idx: u32) -> LayerContent {
        self.check_slot(idx);
        self.content[idx as usize]
    }

    /// Bounds at raw slot `idx`.
    #[must_use]
    pub fn bounds_at(&self, idx: u32) -> Size {
        self.check_slot(idx);
        self.bounds[idx as usize]
    }

    /// Screen transform at raw slot `idx`.
    #[must_use]
    pub fn screen_transform_at(&self, idx: u32) -> Transform3d {
        self.check_slot(idx);
        self.screen_transform[idx as usize]
    }

    /// Draw opacity at raw slot `idx`.
    #[must_use]
    pub fn draw_opacity_at(&self, idx: u32) -> f32 {
        self.check_slot(idx);
        self.draw_opacity[idx as usize]
    }

    /// Screen-space bounds rect at raw slot `idx`.
    #[must_use]
    pub fn screen_rect_at(&self, idx: u32) -> Rect {
        self.check_slot(idx);
        self.screen_rect[idx as usize]
    }

    /// Screen-space visible rect at raw slot `idx`.
    #[must_use]
    pub fn visible_rect_at(&self, idx: u32) -> Rect {
        self.check_slot(idx);
        self.visible_rect[idx as usize]
    }

    /// Render target (surface-owning ancestor slot) at raw slot `idx`.
    #[must_use]
    pub fn render_target_at(&self, idx: u32) -> u32 {
        self.check_slot(idx);
        self.render_target[idx as usize]
    }

    /// Whether the layer at raw slot `idx` changed appearance since
    /// change tracking was last reset.
    #[must_use]
    pub fn appearance_changed_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.appearance_changed[idx as usize]
    }

    // -- Evaluation --

    /// Drains all dirty channels and returns the change sets.
    ///
    /// Rebuilds the traversal order if topology changed and records
    /// drained slots as appearance-changed for damage tracking. Screen
    /// transforms and rects are *not* computed here; that is the
    /// draw-properties pass ([`compute_draw_data`](super::compute_draw_data)).
    pub fn evaluate(&mut self) -> FrameChanges {
        let mut changes = FrameChanges::default();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        changes.transforms = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes.opacities = self
            .dirty
            .drain(dirty::OPACITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes.clips = self
            .dirty
            .drain(dirty::CLIP)
            .deterministic()
            .run()
            .collect();
        changes.content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        for list in [
            &changes.transforms,
            &changes.opacities,
            &changes.clips,
            &changes.content,
        ] {
            for &idx in list {
                if !self.free_list.contains(&idx) {
                    self.appearance_changed[idx as usize] = true;
                }
            }
        }

        changes
    }

    /// Clears per-layer appearance-change flags after a successful draw.
    pub fn reset_change_tracking(&mut self) {
        for flag in &mut self.appearance_changed {
            *flag = false;
        }
    }

    /// Returns the current traversal order (depth-first pre-order).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has run at least
    /// once since the last topology change.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?}"
        );
    }

    fn check_slot(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }

    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }
    }

    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn sid(n: u64) -> StableId {
        StableId(n)
    }

    #[test]
    fn create_and_destroy() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        assert!(store.is_alive(id));
        assert_eq!(store.live_count(), 1);
        store.destroy_layer(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = LayerStore::new();
        let id1 = store.create_layer(sid(1));
        store.destroy_layer(id1);
        let id2 = store.create_layer(sid(2));
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn stable_lookup_follows_lifecycle() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(7));
        assert_eq!(store.by_stable(sid(7)), Some(id));
        store.destroy_layer(id);
        assert_eq!(store.by_stable(sid(7)), None);
    }

    #[test]
    #[should_panic(expected = "duplicate StableId")]
    fn duplicate_stable_id_panics() {
        let mut store = LayerStore::new();
        let _ = store.create_layer(sid(1));
        let _ = store.create_layer(sid(1));
    }

    #[test]
    fn add_child_and_query() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(sid(1));
        let child1 = store.create_layer(sid(2));
        let child2 = store.create_layer(sid(3));

        store.add_child(parent, child1);
        store.add_child(parent, child2);

        assert_eq!(store.parent(child1), Some(parent));
        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, [child1, child2]);
    }

    #[test]
    fn remove_from_parent_works() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(sid(1));
        let child = store.create_layer(sid(2));

        store.add_child(parent, child);
        store.remove_from_parent(child);
        assert_eq!(store.parent(child), None);
        assert!(store.children(parent).next().is_none());
    }

    #[test]
    #[should_panic(expected = "cannot destroy layer with children")]
    fn destroy_with_children_panics() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(sid(1));
        let child = store.create_layer(sid(2));
        store.add_child(parent, child);
        store.destroy_layer(parent);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_setter() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        store.destroy_layer(id);
        store.set_transform(id, Transform3d::IDENTITY);
    }

    #[test]
    fn scroll_by_clamps_to_extents() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        store.set_max_scroll_offset(id, Vec2::new(100.0, 50.0));

        let applied = store.scroll_by(id, Vec2::new(30.0, 30.0));
        assert_eq!(applied, Vec2::new(30.0, 30.0));

        // Past the extent: only the remaining 20 in y applies.
        let applied = store.scroll_by(id, Vec2::new(0.0, 40.0));
        assert_eq!(applied, Vec2::new(0.0, 20.0));
        assert_eq!(store.total_scroll_offset(id), Vec2::new(30.0, 50.0));

        // Negative past zero clamps too.
        let applied = store.scroll_by(id, Vec2::new(-100.0, 0.0));
        assert_eq!(applied, Vec2::new(-30.0, 0.0));
    }

    #[test]
    fn scroll_delta_separate_from_committed_offset() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        store.set_max_scroll_offset(id, Vec2::new(100.0, 100.0));
        store.set_scroll_offset(id, Vec2::new(10.0, 0.0));
        let _ = store.scroll_by(id, Vec2::new(5.0, 5.0));

        assert_eq!(store.scroll_delta(id), Vec2::new(5.0, 5.0));
        assert_eq!(store.total_scroll_offset(id), Vec2::new(15.0, 5.0));
    }

    #[test]
    fn evaluate_reports_changed_channels() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        let _ = store.evaluate();

        store.set_opacity(id, 0.5);
        store.set_bounds(id, Size::new(10.0, 10.0));
        let changes = store.evaluate();
        assert!(changes.opacities.contains(&id.idx));
        assert!(changes.content.contains(&id.idx));
        assert!(changes.transforms.is_empty());
    }

    #[test]
    fn clip_flag_change_marks_the_clip_channel() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        let _ = store.evaluate();

        store.set_flags(
            id,
            LayerFlags {
                masks_to_bounds: true,
                ..LayerFlags::default()
            },
        );
        let changes = store.evaluate();
        assert!(changes.clips.contains(&id.idx));
        assert!(changes.transforms.contains(&id.idx));
    }

    #[test]
    fn evaluate_marks_appearance_changed() {
        let mut store = LayerStore::new();
        let id = store.create_layer(sid(1));
        let _ = store.evaluate();
        store.reset_change_tracking();
        assert!(!store.appearance_changed_at(id.idx));

        store.set_transform(id, Transform3d::from_translation(1.0, 0.0, 0.0));
        let _ = store.evaluate();
        assert!(store.appearance_changed_at(id.idx));

        store.reset_change_tracking();
        assert!(!store.appearance_changed_at(id.idx));
    }

    #[test]
    fn transform_change_propagates_to_descendants() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(sid(1));
        let child = store.create_layer(sid(2));
        store.add_child(parent, child);
        let _ = store.evaluate();
        store.reset_change_tracking();

        store.set_transform(parent, Transform3d::from_translation(5.0, 0.0, 0.0));
        let changes = store.evaluate();
        assert!(changes.transforms.contains(&parent.idx));
        assert!(changes.transforms.contains(&child.idx));
        assert!(store.appearance_changed_at(child.idx));
    }

    #[test]
    fn second_evaluate_is_empty() {
        let mut store = LayerStore::new();
        let _ = store.create_layer(sid(1));
        let _ = store.evaluate();
        let changes = store.evaluate();
        assert!(changes.is_empty(), "expected no changes, got {changes:?}");
    }

    #[test]
    fn traversal_order_is_depth_first() {
        let mut store = LayerStore::new();
        let a = store.create_layer(sid(1));
        let b = store.create_layer(sid(2));
        let c = store.create_layer(sid(3));
        let d = store.create_layer(sid(4));

        // Tree: a -> [b -> [d], c]
        store.add_child(a, b);
        store.add_child(a, c);
        store.add_child(b, d);

        let _ = store.evaluate();
        assert_eq!(store.traversal_order(), &[a.idx, b.idx, d.idx, c.idx]);
    }
}
