// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer trees and the active/pending/recycle lifecycle.
//!
//! A [`LayerTree`] owns one [`LayerStore`] plus the per-tree state that
//! travels with it: viewport, scales, background, purge flags, and the
//! last draw-properties output. [`TreeSet`] holds the three tree slots:
//!
//! - **active** — what draws; always exists.
//! - **pending** — being prepared while its tiles rasterize; exists only
//!   between [`create_pending`](TreeSet::create_pending) and
//!   [`activate_pending`](TreeSet::activate_pending) (or a discard).
//! - **recycle** — a retired tree kept so the next pending tree reuses
//!   its layer storage instead of reallocating.
//!
//! Commits arrive as [`TreeUpdate`] values built on the main-thread side
//! of the boundary; [`LayerTree::apply_update`] reconciles the update
//! against existing layers by [`StableId`], creating and destroying only
//! what changed. Activation swaps slots and pushes impl-side persisted
//! state (uncommitted scroll deltas, purge flags, residual viewport
//! damage) from the outgoing active tree into the incoming one, walking
//! both stores together by stable identity.
//!
//! Lifecycle preconditions (double pending creation, activation without
//! a pending tree) are programming errors and panic.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::{Rect, Size, Vec2};

use crate::geom::{Color, rect_is_empty, union_nonempty};
use crate::layer::{
    DrawData, INVALID, LayerContent, LayerFlags, LayerId, LayerStore, StableId, compute_draw_data,
};
use crate::transform::Transform3d;

/// Page-scale state carried per tree.
#[derive(Clone, Copy, Debug)]
pub struct PageScale {
    /// Committed scale factor from the last commit.
    pub factor: f64,
    /// Impl-side multiplier accumulated by pinch gestures.
    pub delta: f64,
    /// Minimum allowed total scale.
    pub min: f64,
    /// Maximum allowed total scale.
    pub max: f64,
}

impl Default for PageScale {
    fn default() -> Self {
        Self {
            factor: 1.0,
            delta: 1.0,
            min: 1.0,
            max: 1.0,
        }
    }
}

impl PageScale {
    /// Total effective scale: committed factor times impl delta.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.factor * self.delta
    }

    /// Multiplies the impl-side delta by `magnify`, clamping the total to
    /// `[min, max]`. Returns the magnification actually applied.
    pub fn magnify_by(&mut self, magnify: f64) -> f64 {
        if magnify <= 0.0 || !magnify.is_finite() {
            return 1.0;
        }
        let old_total = self.total();
        let new_total = (old_total * magnify).clamp(self.min, self.max);
        let applied = new_total / old_total;
        self.delta *= applied;
        applied
    }
}

/// A full description of one layer, as delivered by a commit.
#[derive(Clone, Debug)]
pub struct LayerDesc {
    /// Stable identity of the layer.
    pub stable: StableId,
    /// Parent layer, or `None` for the root.
    pub parent: Option<StableId>,
    /// Local transform.
    pub transform: Transform3d,
    /// Layer bounds.
    pub bounds: Size,
    /// Local opacity.
    pub opacity: f32,
    /// Boolean properties.
    pub flags: LayerFlags,
    /// Drawn content.
    pub content: LayerContent,
    /// Committed scroll offset.
    pub scroll_offset: Vec2,
    /// Furthest scrollable offset.
    pub max_scroll_offset: Vec2,
    /// Scroll-parent link.
    pub scroll_parent: Option<StableId>,
    /// Mask layer link.
    pub mask: Option<StableId>,
    /// Replica layer link.
    pub replica: Option<StableId>,
}

impl LayerDesc {
    /// A minimal description with identity transform and defaults.
    #[must_use]
    pub fn new(stable: StableId, parent: Option<StableId>) -> Self {
        Self {
            stable,
            parent,
            transform: Transform3d::IDENTITY,
            bounds: Size::ZERO,
            opacity: 1.0,
            flags: LayerFlags::default(),
            content: LayerContent::None,
            scroll_offset: Vec2::ZERO,
            max_scroll_offset: Vec2::ZERO,
            scroll_parent: None,
            mask: None,
            replica: None,
        }
    }
}

/// A committed scene description, produced on the main-thread side.
///
/// `layers` must list every layer of the new tree, parents before
/// children, with `root` among them.
#[derive(Clone, Debug)]
pub struct TreeUpdate {
    /// Stable identity of the root layer.
    pub root: StableId,
    /// Every layer of the tree, parents before children.
    pub layers: Vec<LayerDesc>,
    /// Output size in physical pixels.
    pub viewport: Size,
    /// Device scale factor.
    pub device_scale: f64,
    /// Committed page scale factor.
    pub page_scale: f64,
    /// Minimum page scale.
    pub min_page_scale: f64,
    /// Maximum page scale.
    pub max_page_scale: f64,
    /// Which layer root-level scrolls and overscroll land on.
    pub root_scroll: Option<StableId>,
    /// Background color behind all layers.
    pub background_color: Color,
}

/// What a commit did to the tree, for instrumentation.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommitSummary {
    /// Number of layers delivered.
    pub layer_count: usize,
    /// Whether any layer was created or destroyed.
    pub structural_change: bool,
}

/// One scene graph plus its per-tree compositor state.
#[derive(Debug, Default)]
pub struct LayerTree {
    /// Layer storage. Exposed for property access by the frame pipeline.
    pub store: LayerStore,
    root: Option<LayerId>,
    /// Output size in physical pixels.
    pub viewport: Size,
    /// Device scale factor.
    pub device_scale: f64,
    /// Page-scale state.
    pub page_scale: PageScale,
    root_scroll: Option<StableId>,
    /// Background color behind all layers.
    pub background_color: Color,
    /// Set when budget enforcement evicted this tree's textures; drawing
    /// requires a recommit first.
    pub contents_textures_purged: bool,
    /// Monotonic commit counter of the last applied update.
    pub source_frame_number: u64,
    viewport_damage: Rect,
    /// Output of the last draw-properties pass.
    pub draw_data: DrawData,
}

impl LayerTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            device_scale: 1.0,
            ..Self::default()
        }
    }

    /// Returns the root layer, if a commit has been applied.
    #[must_use]
    pub fn root(&self) -> Option<LayerId> {
        self.root
    }

    /// Returns the designated root scroll layer, if present.
    #[must_use]
    pub fn root_scroll_layer(&self) -> Option<LayerId> {
        self.store.by_stable(self.root_scroll?)
    }

    /// Reconciles a committed [`TreeUpdate`] into this tree.
    ///
    /// Layers are matched by [`StableId`]: existing layers are updated in
    /// place, missing ones created, and layers absent from the update
    /// destroyed. Impl-side scroll deltas of surviving layers are kept;
    /// the committed portion is absorbed into the new scroll offset.
    pub fn apply_update(&mut self, update: &TreeUpdate, source_frame_number: u64) -> CommitSummary {
        let mut summary = CommitSummary {
            layer_count: update.layers.len(),
            structural_change: false,
        };

        // Detach everything; links are rebuilt from the descriptions.
        let slots: Vec<u32> = (0..self.store.len)
            .filter(|idx| !self.store.free_list.contains(idx))
            .collect();
        for &slot in &slots {
            if self.store.parent[slot as usize] != INVALID {
                let id = self
                    .store
                    .by_stable(self.store.stable[slot as usize])
                    .expect("live slot has a stable id");
                self.store.remove_from_parent(id);
            }
        }

        // Destroy layers the update no longer mentions.
        for &slot in &slots {
            let stable = self.store.stable[slot as usize];
            if !update.layers.iter().any(|desc| desc.stable == stable) {
                let id = self.store.by_stable(stable).expect("slot is live");
                self.store.destroy_layer(id);
                summary.structural_change = true;
            }
        }

        // Create or refresh each described layer.
        for desc in &update.layers {
            let id = match self.store.by_stable(desc.stable) {
                Some(id) => id,
                None => {
                    summary.structural_change = true;
                    self.store.create_layer(desc.stable)
                }
            };
            self.store.set_transform(id, desc.transform);
            self.store.set_bounds(id, desc.bounds);
            self.store.set_opacity(id, desc.opacity);
            self.store.set_flags(id, desc.flags);
            self.store.set_content(id, desc.content);
            self.store.set_scroll_offset(id, desc.scroll_offset);
            self.store.set_max_scroll_offset(id, desc.max_scroll_offset);
        }

        // Rebuild topology and weak links now that every layer exists.
        for desc in &update.layers {
            let id = self.store.by_stable(desc.stable).expect("just created");
            if let Some(parent) = desc.parent {
                let parent_id = self
                    .store
                    .by_stable(parent)
                    .expect("parents are listed before children");
                self.store.add_child(parent_id, id);
            }
            let scroll_parent = desc.scroll_parent.and_then(|s| self.store.by_stable(s));
            self.store.set_scroll_parent(id, scroll_parent);
            let mask = desc.mask.and_then(|s| self.store.by_stable(s));
            self.store.set_mask(id, mask);
            let replica = desc.replica.and_then(|s| self.store.by_stable(s));
            self.store.set_replica(id, replica);
        }

        self.root = self.store.by_stable(update.root);
        assert!(self.root.is_some(), "TreeUpdate root must be among layers");
        self.viewport = update.viewport;
        self.device_scale = update.device_scale;
        self.page_scale.factor = update.page_scale;
        self.page_scale.min = update.min_page_scale;
        self.page_scale.max = update.max_page_scale;
        self.root_scroll = update.root_scroll;
        self.background_color = update.background_color;
        self.source_frame_number = source_frame_number;
        // A commit delivers fresh content for everything it touched.
        self.contents_textures_purged = false;
        summary
    }

    /// Runs dirty evaluation and the draw-properties pass.
    pub fn update_draw_properties(&mut self) {
        let _ = self.store.evaluate();
        self.draw_data = match self.root {
            Some(root) => compute_draw_data(
                &mut self.store,
                root,
                self.viewport,
                self.device_scale,
                self.page_scale.total(),
            ),
            None => DrawData::default(),
        };
    }

    /// Adds an explicit invalidation in screen space.
    pub fn add_viewport_damage(&mut self, rect: Rect) {
        self.viewport_damage = union_nonempty(self.viewport_damage, rect);
    }

    /// The accumulated explicit damage, without clearing it.
    #[must_use]
    pub fn viewport_damage(&self) -> Rect {
        self.viewport_damage
    }

    /// Takes and clears the accumulated explicit damage.
    pub fn take_viewport_damage(&mut self) -> Rect {
        core::mem::replace(&mut self.viewport_damage, Rect::ZERO)
    }

    /// Returns whether the accumulated explicit damage is non-empty.
    #[must_use]
    pub fn has_viewport_damage(&self) -> bool {
        !rect_is_empty(self.viewport_damage)
    }

    /// Returns whether every layer reachable from the root carries valid
    /// draw properties (the activation postcondition).
    #[must_use]
    pub fn is_fully_walkable(&self) -> bool {
        let Some(root) = self.root else {
            return false;
        };
        if !self.store.is_alive(root) {
            return false;
        }
        let order = self.store.traversal_order();
        !order.is_empty()
            && order
                .iter()
                .all(|&slot| self.store.screen_transform_at(slot).is_finite())
    }
}

/// What activation reported back, for instrumentation and callbacks.
#[derive(Clone, Copy, Debug)]
pub struct ActivationSummary {
    /// Commit counter of the tree that became active.
    pub source_frame_number: u64,
}

/// The three tree slots and their lifecycle transitions.
#[derive(Debug)]
pub struct TreeSet {
    active: LayerTree,
    pending: Option<Box<LayerTree>>,
    recycle: Option<Box<LayerTree>>,
}

impl Default for TreeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSet {
    /// Creates a tree set with an empty active tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: LayerTree::new(),
            pending: None,
            recycle: None,
        }
    }

    /// The currently drawn tree.
    #[must_use]
    pub fn active(&self) -> &LayerTree {
        &self.active
    }

    /// Mutable access to the active tree.
    pub fn active_mut(&mut self) -> &mut LayerTree {
        &mut self.active
    }

    /// The tree being prepared, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&LayerTree> {
        self.pending.as_deref()
    }

    /// Mutable access to the pending tree, if any.
    pub fn pending_mut(&mut self) -> Option<&mut LayerTree> {
        self.pending.as_deref_mut()
    }

    /// Returns whether a recycled tree is parked for reuse.
    #[must_use]
    pub fn has_recycle(&self) -> bool {
        self.recycle.is_some()
    }

    /// Creates the pending tree, reusing recycled storage when present.
    ///
    /// # Panics
    ///
    /// Panics if a pending tree already exists — that is a scheduler bug
    /// upstream, not a recoverable condition.
    pub fn create_pending(&mut self) -> &mut LayerTree {
        assert!(
            self.pending.is_none(),
            "create_pending called while a pending tree exists"
        );
        let tree = self
            .recycle
            .take()
            .unwrap_or_else(|| Box::new(LayerTree::new()));
        self.pending.insert(tree)
    }

    /// Discards the pending tree without activating it.
    ///
    /// Outstanding raster work for the tree is simply abandoned; nothing
    /// waits on it. A no-op when no pending tree exists.
    pub fn discard_pending(&mut self) {
        if let Some(tree) = self.pending.take() {
            self.recycle = Some(tree);
        }
    }

    /// Swaps the pending tree in as active.
    ///
    /// Pushes persisted impl-side state from the outgoing active tree
    /// into the incoming one by stable identity: uncommitted scroll
    /// deltas, the textures-purged flag, and residual explicit damage.
    /// The old active tree parks in the recycle slot.
    ///
    /// # Panics
    ///
    /// Panics if no pending tree exists.
    pub fn activate_pending(&mut self) -> ActivationSummary {
        let mut pending = self
            .pending
            .take()
            .expect("activate_pending called with no pending tree");

        // Persisted cross-commit state: active → pending.
        pending.contents_textures_purged |= self.active.contents_textures_purged;
        let residual_damage = self.active.take_viewport_damage();
        pending.add_viewport_damage(residual_damage);
        pending.page_scale.delta = self.active.page_scale.delta;

        // Walk both stores together by stable id, carrying uncommitted
        // scroll deltas forward.
        for slot in 0..self.active.store.len {
            if self.active.store.free_list.contains(&slot) {
                continue;
            }
            let delta = self.active.store.scroll_delta[slot as usize];
            if delta == Vec2::ZERO {
                continue;
            }
            let stable = self.active.store.stable[slot as usize];
            if let Some(id) = pending.store.by_stable(stable) {
                let _ = pending.store.scroll_by(id, delta);
            }
        }

        let old_active = core::mem::replace(&mut self.active, *pending);
        self.recycle = Some(Box::new(old_active));

        ActivationSummary {
            source_frame_number: self.active.source_frame_number,
        }
    }
}
