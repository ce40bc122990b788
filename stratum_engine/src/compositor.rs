// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor: tree lifecycle, frame production, budgets, and
//! input, wired together behind the host interface.
//!
//! All state here is owned by the impl-thread role; the main thread
//! communicates only through the commit bracket
//! ([`begin_commit`](Compositor::begin_commit) /
//! [`finish_commit`](Compositor::finish_commit) /
//! [`commit_complete`](Compositor::commit_complete)) and the advisory
//! [`CompositorClient`] callbacks. Lifecycle preconditions (double
//! pending tree, activation without one) panic — they indicate a
//! scheduler bug upstream, not a runtime condition.
//!
//! Renderer initialization is a small state machine:
//!
//! | state          | entered by                                | side effects                         |
//! |----------------|-------------------------------------------|--------------------------------------|
//! | `Uninitialized`| construction, output-surface loss         | renderer/tiles/resources torn down   |
//! | `SoftwareOnly` | `initialize_renderer` without GPU         | software renderer, tile manager      |
//! | `GpuBound`     | `initialize_renderer` with GPU/delegation | hardware or delegating renderer      |
//! | `Active`       | first successful draw                     | —                                    |

use std::collections::BTreeMap;

use kurbo::{Point, Rect, Size, Vec2};

use stratum_core::geom::{intersect_nonempty, rect_is_empty, union_nonempty};
use stratum_core::input::{ScrollConfig, ScrollController, ScrollResult, ScrollStatus, ScrollUnit, TopControlsManager};
use stratum_core::layer::{INVALID, LayerContent, StableId};
use stratum_core::policy::ManagedMemoryPolicy;
use stratum_core::ticker::{FrameTicker, ThreadAffinity, TickConfig};
use stratum_core::time::HostTime;
use stratum_core::trace::{
    ActivationEvent, CommitEvent, DrawDecisionEvent, MemoryStatsEvent, ScrollEvent, TileStatsEvent,
    TraceSink, Tracer,
};
use stratum_core::trace::AbortReason;
use stratum_core::tree::{LayerTree, TreeSet, TreeUpdate};
use stratum_render::builder::{BuildInputs, build_render_passes};
use stratum_render::copy::{CopyOutputRequest, CopyOutputResult};
use stratum_render::damage::{DamageContribution, DamageTracker};
use stratum_render::pass::{DrawQuad, FrameData, SharedQuadState};
use stratum_render::renderer::{
    DrawParams, FrameMetadata, GpuDevice, OutputSurfaceCaps, Renderer,
};
use stratum_tiles::manager::{RasterTask, TileConfig, TileManager, TiledLayer, TreeKind};
use stratum_tiles::pool::ResourcePool;
use stratum_tiles::ui::{UiResourceId, UiResourceTable};

use crate::client::CompositorClient;

/// Memory-stats heartbeat granularity: reported byte counts round up to
/// a multiple of this, bounding how often the number changes.
pub const MEMORY_STATS_GRANULARITY: u64 = 8 * 1024 * 1024;

/// Outcome of a frame-preparation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawResult {
    /// A frame was produced (possibly an empty no-damage one).
    Success,
    /// Drawing is currently impossible; try again after state changes.
    AbortCantDraw,
    /// Required tiles are missing under an animating transform; keep
    /// showing the previous frame rather than checkerboard
    /// mid-animation.
    AbortCheckerboardAnimation,
}

/// Renderer initialization state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererInitState {
    /// No output surface bound.
    Uninitialized,
    /// Software fallback bound.
    SoftwareOnly,
    /// GPU or delegating backend bound, nothing drawn yet.
    GpuBound,
    /// At least one frame has been drawn since binding.
    Active,
}

/// Static configuration chosen at construction.
#[derive(Clone, Copy, Debug)]
pub struct CompositorSettings {
    /// Whether commits land in a pending tree that rasterizes before
    /// activation (impl-side tiling), or directly in the active tree.
    pub impl_side_tiling: bool,
    /// Whether damage-scissored partial swaps may be used.
    pub allow_partial_swap: bool,
    /// Whether the output target needs a full-viewport redraw every
    /// frame (disables the no-damage skip).
    pub output_requires_full_redraw: bool,
    /// Height of the top controls strip; zero disables it.
    pub top_controls_height: f64,
    /// Scroll thresholds.
    pub scroll: ScrollConfig,
    /// Tile layout and budgeting.
    pub tiles: TileConfig,
    /// Tick pacing.
    pub tick: TickConfig,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            impl_side_tiling: true,
            allow_partial_swap: true,
            output_requires_full_redraw: false,
            top_controls_height: 0.0,
            scroll: ScrollConfig::default(),
            tiles: TileConfig::default(),
            tick: TickConfig::sixty_hz(),
        }
    }
}

/// Runtime debug toggles.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebugState {
    /// Tint the screen-space rects of occluding content.
    pub show_occluding_rects: bool,
    /// Redraw every frame regardless of damage.
    pub continuous_painting: bool,
    /// Restrict rasterization to visible content (tightens the
    /// effective memory policy).
    pub rasterize_only_visible: bool,
}

/// Hooks for animation state owned by the host collaborator.
///
/// The compositor references these per tick; it never owns animation
/// state itself, so multiple compositor instances can share one
/// registrar and tests can isolate trivially.
pub trait AnimationDriver {
    /// Advances a page-scale (smooth zoom) animation.
    fn animate_page_scale(&mut self, tree: &mut LayerTree, now: HostTime) -> bool {
        let _ = (tree, now);
        false
    }

    /// Advances layer property animations.
    fn animate_layers(&mut self, tree: &mut LayerTree, now: HostTime) -> bool {
        let _ = (tree, now);
        false
    }

    /// Advances scrollbar fade animations.
    fn animate_scrollbars(&mut self, tree: &mut LayerTree, now: HostTime) -> bool {
        let _ = (tree, now);
        false
    }
}

/// Externally owned context passed into tick processing.
#[derive(Default)]
pub struct CompositorContext<'a> {
    /// Animation registrar, if the host runs animations.
    pub animations: Option<&'a mut dyn AnimationDriver>,
}

impl core::fmt::Debug for CompositorContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompositorContext")
            .field("has_animations", &self.animations.is_some())
            .finish()
    }
}

/// The compositor-thread owner of trees, tiles, passes, and input.
pub struct Compositor {
    settings: CompositorSettings,
    debug: DebugState,
    client: Box<dyn CompositorClient>,
    trace_sink: Option<Box<dyn TraceSink>>,

    trees: TreeSet,
    scroll: ScrollController,
    ticker: FrameTicker,
    affinity: ThreadAffinity,

    pool: ResourcePool,
    tiles: Option<TileManager>,
    ui_resources: UiResourceTable,
    renderer: Option<Renderer>,
    init_state: RendererInitState,

    damage: BTreeMap<StableId, DamageTracker>,
    copy_requests: BTreeMap<StableId, Vec<CopyOutputRequest>>,

    cached_policy: ManagedMemoryPolicy,
    visible: bool,
    zero_budget: bool,
    can_draw_state: bool,

    commit_in_progress: bool,
    source_frame_number: u64,
    current_frame_time: Option<HostTime>,
    background_ticking: bool,
    overhang_resource: Option<UiResourceId>,
    keyboard_inset: f64,
}

impl core::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Compositor")
            .field("init_state", &self.init_state)
            .field("visible", &self.visible)
            .field("can_draw", &self.can_draw_state)
            .field("source_frame_number", &self.source_frame_number)
            .finish_non_exhaustive()
    }
}

impl Compositor {
    /// Creates a compositor in the single-threaded configuration (the
    /// one thread permanently holds the impl role).
    #[must_use]
    pub fn new(settings: CompositorSettings, client: Box<dyn CompositorClient>) -> Self {
        let mut scroll = ScrollController::new(settings.scroll);
        scroll.top_controls = TopControlsManager::new(settings.top_controls_height);
        Self {
            debug: DebugState::default(),
            client,
            trace_sink: None,
            trees: TreeSet::new(),
            scroll,
            ticker: FrameTicker::new(settings.tick),
            affinity: ThreadAffinity::single_threaded(),
            pool: ResourcePool::new(),
            tiles: None,
            ui_resources: UiResourceTable::new(),
            renderer: None,
            init_state: RendererInitState::Uninitialized,
            damage: BTreeMap::new(),
            copy_requests: BTreeMap::new(),
            cached_policy: ManagedMemoryPolicy::with_bytes_limit(0),
            visible: true,
            zero_budget: false,
            can_draw_state: false,
            commit_in_progress: false,
            source_frame_number: 0,
            current_frame_time: None,
            background_ticking: false,
            overhang_resource: None,
            keyboard_inset: 0.0,
            settings,
        }
    }

    /// Installs a trace sink for pipeline instrumentation.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace_sink = Some(sink);
    }

    fn tracer(&mut self) -> Tracer<'_> {
        match self.trace_sink.as_deref_mut() {
            Some(sink) => Tracer::new(sink),
            None => Tracer::disabled(),
        }
    }

    // -- Renderer lifecycle -------------------------------------------------

    /// Binds an output surface, selecting the renderer variant from its
    /// capabilities, and (re)creates the tile manager.
    pub fn initialize_renderer(
        &mut self,
        caps: OutputSurfaceCaps,
        device: Option<Box<dyn GpuDevice>>,
    ) {
        self.affinity.assert_impl();
        let viewport = self.trees.active().viewport;
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "viewports are small positive pixel counts"
        )]
        let framebuffer = (viewport.width.max(0.0) as usize, viewport.height.max(0.0) as usize);
        let renderer = Renderer::new(caps, device, framebuffer);
        self.init_state = if renderer.capabilities().using_software {
            RendererInitState::SoftwareOnly
        } else {
            RendererInitState::GpuBound
        };
        self.renderer = Some(renderer);
        if self.settings.impl_side_tiling && self.tiles.is_none() {
            self.tiles = Some(TileManager::new(self.settings.tiles));
        }
        self.enforce_managed_memory_policy();
        self.update_can_draw();
        // A fresh surface has no content yet.
        self.client.set_needs_commit();
    }

    /// Reacts to a lost GPU context / output surface: tears down the
    /// renderer, tile manager, and every resource, and disables drawing
    /// until reinitialized. Pending copy requests are answered empty.
    pub fn did_lose_output_surface(&mut self) {
        self.affinity.assert_impl();
        self.renderer = None;
        if let Some(tiles) = &mut self.tiles {
            let _ = tiles.release_all(&mut self.pool);
        }
        self.tiles = None;
        let _ = self.ui_resources.evict_all(&mut self.pool);
        let _ = self.pool.free_all();
        self.trees.active_mut().contents_textures_purged = true;
        if let Some(pending) = self.trees.pending_mut() {
            pending.contents_textures_purged = true;
        }
        for (_, requests) in core::mem::take(&mut self.copy_requests) {
            for request in requests {
                request.send_empty();
            }
        }
        self.init_state = RendererInitState::Uninitialized;
        self.update_can_draw();
        self.client.did_lose_output_surface();
    }

    /// Current renderer initialization state.
    #[must_use]
    pub fn renderer_state(&self) -> RendererInitState {
        self.init_state
    }

    // -- Visibility and memory policy ---------------------------------------

    /// Updates tree visibility; an invisible tree is entitled to a zero
    /// budget.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if let Some(renderer) = &mut self.renderer {
            renderer.set_visible(visible);
        }
        self.enforce_managed_memory_policy();
        if visible {
            self.client.set_needs_redraw(None);
        }
    }

    /// Installs a new cached memory policy from the host's pressure
    /// source and enforces it.
    pub fn set_memory_policy(&mut self, policy: ManagedMemoryPolicy) {
        self.cached_policy = policy;
        self.enforce_managed_memory_policy();
    }

    /// Toggles the zero-budget override used while a GPU context is
    /// being deferred or torn down.
    pub fn set_zero_budget(&mut self, zero: bool) {
        if self.zero_budget == zero {
            return;
        }
        self.zero_budget = zero;
        self.enforce_managed_memory_policy();
    }

    /// Derives the effective policy currently in force.
    #[must_use]
    pub fn actual_memory_policy(&self) -> ManagedMemoryPolicy {
        self.cached_policy.actual(
            self.visible,
            self.zero_budget,
            self.debug.rasterize_only_visible,
        )
    }

    /// Reduces resource usage to the effective policy.
    ///
    /// Anything evicted marks the trees' textures purged (a recommit is
    /// required before drawing), triggers a drawability recheck, and
    /// requests a commit. Memory stats are reported afterward
    /// unconditionally: the heartbeat is what downstream throttling
    /// keys on.
    pub fn enforce_managed_memory_policy(&mut self) {
        let actual = self.actual_memory_policy();
        let mut evicted = 0;
        if let Some(tiles) = &mut self.tiles {
            tiles.set_effective_policy(actual);
            evicted = tiles.enforce_budget(&mut self.pool);
            if tiles.needs_manage() {
                self.client.set_needs_manage_tiles();
            }
        }
        if evicted > 0 {
            self.trees.active_mut().contents_textures_purged = true;
            if let Some(pending) = self.trees.pending_mut() {
                pending.contents_textures_purged = true;
            }
            self.update_can_draw();
            self.client.set_needs_commit();
        }
        self.send_memory_stats();
    }

    fn send_memory_stats(&mut self) {
        let bytes = self.pool.total_bytes();
        let rounded = bytes.div_ceil(MEMORY_STATS_GRANULARITY) * MEMORY_STATS_GRANULARITY;
        self.tracer().memory_stats(&MemoryStatsEvent {
            bytes_allocated: rounded,
        });
        self.client.send_managed_memory_stats(rounded);
    }

    // -- Drawability --------------------------------------------------------

    /// Whether a draw attempt could currently succeed.
    #[must_use]
    pub fn can_draw(&self) -> bool {
        self.renderer.is_some()
            && self.trees.active().root().is_some()
            && self.trees.active().viewport.width > 0.0
            && self.trees.active().viewport.height > 0.0
            && !self.trees.active().contents_textures_purged
            && !self.ui_resources.evicted()
    }

    fn update_can_draw(&mut self) {
        let can_draw = self.can_draw();
        if can_draw != self.can_draw_state {
            self.can_draw_state = can_draw;
            self.client.on_can_draw_state_changed(can_draw);
        }
    }

    // -- Commits and activation ---------------------------------------------

    /// Opens the commit bracket. With impl-side tiling this creates the
    /// pending tree (reusing recycled storage).
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in progress.
    pub fn begin_commit(&mut self) {
        self.affinity.assert_impl();
        assert!(
            !self.commit_in_progress,
            "begin_commit while a commit is in progress"
        );
        self.commit_in_progress = true;
        if self.settings.impl_side_tiling && self.trees.pending().is_none() {
            let _ = self.trees.create_pending();
        }
    }

    /// Applies the committed scene description.
    ///
    /// # Panics
    ///
    /// Panics outside a commit bracket.
    pub fn finish_commit(&mut self, update: &TreeUpdate) {
        assert!(self.commit_in_progress, "finish_commit without begin_commit");
        self.source_frame_number += 1;
        let source_frame_number = self.source_frame_number;
        let summary = if self.settings.impl_side_tiling {
            self.trees
                .pending_mut()
                .expect("begin_commit created the pending tree")
                .apply_update(update, source_frame_number)
        } else {
            self.trees
                .active_mut()
                .apply_update(update, source_frame_number)
        };
        // The shared resource pool was refilled by this commit; the
        // active tree's purge mark is stale now too.
        self.trees.active_mut().contents_textures_purged = false;
        if summary.structural_change {
            // Layer identities moved; any gesture latch into the old
            // graph is meaningless now.
            self.scroll.clear_latch();
        }
        self.tracer().commit(&CommitEvent {
            source_frame_number,
            layer_count: summary.layer_count,
            structural_change: summary.structural_change,
        });
    }

    /// Closes the commit bracket.
    ///
    /// With impl-side tiling, the pending tree's draw properties are
    /// recomputed immediately; activation is requested when no new
    /// rasterization is needed, otherwise a tile-management pass is
    /// scheduled (never run synchronously here).
    ///
    /// # Panics
    ///
    /// Panics outside a commit bracket.
    pub fn commit_complete(&mut self) {
        assert!(self.commit_in_progress, "commit_complete without begin_commit");
        self.commit_in_progress = false;
        if self.settings.impl_side_tiling {
            let mut needs_raster = false;
            if let Some(pending) = self.trees.pending_mut() {
                pending.update_draw_properties();
                needs_raster = pending
                    .store
                    .traversal_order()
                    .iter()
                    .any(|&slot| matches!(pending.store.content_at(slot), LayerContent::Tiled));
            }
            if needs_raster {
                if let Some(tiles) = &mut self.tiles {
                    tiles.request_manage();
                }
                self.client.set_needs_manage_tiles();
            } else {
                self.client.notify_ready_to_activate();
            }
        } else {
            self.trees.active_mut().update_draw_properties();
            self.client.set_needs_redraw(None);
        }
        self.update_can_draw();
    }

    /// Swaps the pending tree in as active.
    ///
    /// Ordered for correctness: the scroll latch into the old active
    /// tree detaches first, then persisted impl-side state pushes into
    /// the incoming tree (inside the tree-set swap), then tilings
    /// promote, then dependents are notified.
    ///
    /// # Panics
    ///
    /// Panics if no pending tree exists.
    pub fn activate_pending_tree(&mut self) {
        self.affinity.assert_impl();
        self.scroll.clear_latch();
        let summary = self.trees.activate_pending();
        if let Some(tiles) = &mut self.tiles {
            tiles.promote_pending(&mut self.pool);
        }
        self.trees.active_mut().update_draw_properties();
        let at = self.current_frame_time.unwrap_or_default();
        self.tracer().activation(&ActivationEvent {
            source_frame_number: summary.source_frame_number,
            at,
        });
        self.client.renew_tree_priority();
        self.client.set_needs_redraw(None);
        self.client.did_activate_pending_tree();
        self.update_can_draw();
    }

    /// Discards an in-flight pending tree without waiting for its
    /// raster work. Copy requests that only the discarded tree could
    /// have serviced are answered empty.
    pub fn discard_pending_tree(&mut self) {
        if self.trees.pending().is_none() {
            return;
        }
        if let Some(tiles) = &mut self.tiles {
            tiles.drop_pending(&mut self.pool);
        }
        self.trees.discard_pending();
        let orphaned: Vec<StableId> = self
            .copy_requests
            .keys()
            .copied()
            .filter(|stable| self.trees.active().store.by_stable(*stable).is_none())
            .collect();
        for stable in orphaned {
            if let Some(requests) = self.copy_requests.remove(&stable) {
                for request in requests {
                    request.send_empty();
                }
            }
        }
    }

    // -- Tiles --------------------------------------------------------------

    /// Runs a tile-management pass if one is due; returns raster work
    /// for the (external) worker pool. A no-op unless priorities are
    /// dirty, a tile manager exists, and the viewport is valid for
    /// management.
    pub fn manage_tiles(&mut self) -> Vec<RasterTask> {
        self.affinity.assert_impl();
        let Some(tiles) = &mut self.tiles else {
            return Vec::new();
        };
        let mut per_tree = vec![(TreeKind::Active, tiled_layers_of(self.trees.active()))];
        if let Some(pending) = self.trees.pending() {
            per_tree.push((TreeKind::Pending, tiled_layers_of(pending)));
        }
        let Some(result) = tiles.manage(&mut self.pool, &per_tree) else {
            return Vec::new();
        };
        let stats = TileStatsEvent {
            resident_bytes: tiles.resident_bytes(),
            evicted_bytes: result.evicted_bytes,
            missing_tiles: result.raster_tasks.len(),
        };
        let pending_ready =
            self.trees.pending().is_some() && tiles.all_required_ready(TreeKind::Pending);
        self.tracer().tile_stats(&stats);
        if pending_ready {
            self.client.notify_ready_to_activate();
        }
        result.raster_tasks
    }

    /// Completion notification for one raster task.
    pub fn did_finish_raster_task(&mut self, task: RasterTask) {
        let Some(tiles) = &mut self.tiles else {
            return;
        };
        if !tiles.did_finish_raster(&mut self.pool, task) {
            // The destination no longer exists; the work completes into
            // nothing.
            return;
        }
        if tiles.update_visible_tiles() {
            self.client.did_initialize_visible_tile();
            self.client.set_needs_redraw(None);
        }
        if task.tree == TreeKind::Pending
            && self.trees.pending().is_some()
            && self
                .tiles
                .as_ref()
                .is_some_and(|tiles| tiles.all_required_ready(TreeKind::Pending))
        {
            self.client.notify_ready_to_activate();
        }
    }

    /// Polls for visible tiles that finished since the last poll.
    pub fn update_visible_tiles(&mut self) {
        if let Some(tiles) = &mut self.tiles {
            if tiles.update_visible_tiles() {
                self.client.did_initialize_visible_tile();
                self.client.set_needs_redraw(None);
            }
        }
    }

    /// Suppresses tile management while the viewport is in flux (e.g.
    /// interactive resize), so prioritization never runs against a
    /// viewport about to change again.
    pub fn set_tile_management_suppressed(&mut self, suppressed: bool) {
        if let Some(tiles) = &mut self.tiles {
            tiles.set_viewport_valid(!suppressed);
        }
    }

    // -- Viewport, debug, UI resources --------------------------------------

    /// Updates the output size and device scale for both trees and
    /// damages the full viewport.
    pub fn set_viewport(&mut self, size: Size, device_scale: f64) {
        {
            let active = self.trees.active_mut();
            active.viewport = size;
            active.device_scale = device_scale;
            active.add_viewport_damage(Rect::from_origin_size(Point::ZERO, size));
        }
        if let Some(pending) = self.trees.pending_mut() {
            pending.viewport = size;
            pending.device_scale = device_scale;
        }
        self.update_can_draw();
        self.client.set_needs_redraw(None);
    }

    /// Adds an explicit invalidation in screen space.
    pub fn set_viewport_damage(&mut self, rect: Rect) {
        self.trees.active_mut().add_viewport_damage(rect);
        self.client.set_needs_redraw(Some(rect));
    }

    /// Replaces the debug toggles.
    pub fn set_debug_state(&mut self, debug: DebugState) {
        let raster_mode_changed =
            debug.rasterize_only_visible != self.debug.rasterize_only_visible;
        self.debug = debug;
        if raster_mode_changed {
            self.enforce_managed_memory_policy();
        }
        self.client.set_needs_redraw(None);
    }

    /// Creates (or replaces) a compositor-owned bitmap resource.
    pub fn create_ui_resource(&mut self, id: UiResourceId, bytes: u64) {
        self.ui_resources.create(&mut self.pool, id, bytes);
    }

    /// Deletes a compositor-owned bitmap resource.
    pub fn delete_ui_resource(&mut self, id: UiResourceId) {
        self.ui_resources.delete(&mut self.pool, id);
    }

    /// Acknowledges that UI resources were recreated after an eviction.
    pub fn ui_resources_recreated(&mut self) {
        self.ui_resources.clear_evicted();
        self.update_can_draw();
    }

    /// Selects the UI resource stretched over overscrolled space.
    pub fn set_overhang_ui_resource(&mut self, id: Option<UiResourceId>) {
        self.overhang_resource = id;
    }

    /// Sets the on-screen-keyboard inset reported in frame metadata.
    pub fn set_keyboard_inset(&mut self, inset: f64) {
        self.keyboard_inset = inset;
    }

    /// Registers a copy-output request against a surface-owning layer.
    /// Copy requests force drawing even when nothing is damaged.
    pub fn request_copy_of_surface(&mut self, stable: StableId, request: CopyOutputRequest) {
        self.copy_requests.entry(stable).or_default().push(request);
        self.client.set_needs_redraw(None);
    }

    // -- Input --------------------------------------------------------------

    /// Starts a scroll gesture against the active tree.
    pub fn scroll_begin(&mut self, point: Point, unit: ScrollUnit) -> ScrollStatus {
        self.affinity.assert_impl();
        self.scroll.scroll_begin(self.trees.active(), point, unit)
    }

    /// Applies a scroll delta on the compositor thread.
    pub fn scroll_by(&mut self, delta: Vec2) -> ScrollResult {
        self.affinity.assert_impl();
        let result = self.scroll.scroll_by(self.trees.active_mut(), delta);
        self.tracer().scroll(&ScrollEvent {
            applied: [result.applied.x, result.applied.y],
            overscroll: [result.unused.x, result.unused.y],
        });
        if result.did_scroll {
            self.client.renew_tree_priority();
            self.client.set_needs_redraw(None);
        }
        result
    }

    /// Ends the scroll gesture.
    pub fn scroll_end(&mut self) {
        self.scroll.scroll_end();
    }

    /// Starts a fling on the current latch.
    pub fn fling_begin(&mut self) -> ScrollStatus {
        self.scroll.fling_begin()
    }

    /// Ends the fling.
    pub fn fling_end(&mut self) {
        self.scroll.fling_end();
    }

    /// Starts a pinch-zoom gesture.
    pub fn pinch_begin(&mut self) {
        self.scroll.pinch_begin();
    }

    /// Applies one pinch update anchored at `anchor`.
    pub fn pinch_update(&mut self, magnify: f64, anchor: Point) {
        self.scroll
            .pinch_update(self.trees.active_mut(), magnify, anchor);
        self.client.set_needs_redraw(None);
    }

    /// Ends the pinch gesture; the accumulated page-scale delta reaches
    /// the main thread through the next commit.
    pub fn pinch_end(&mut self) {
        self.scroll.pinch_end();
        self.client.set_needs_commit();
    }

    // -- Ticking ------------------------------------------------------------

    /// Starts periodic tick delivery (animations, background ticking).
    pub fn start_ticking(&mut self) {
        self.ticker.set_active(true);
    }

    /// Stops periodic tick delivery.
    pub fn stop_ticking(&mut self) {
        self.ticker.set_active(false);
    }

    /// Processes one tick opportunity.
    ///
    /// If a pending tree exists, its draw properties refresh and a
    /// tile-management pass runs before animations. The animation
    /// advance order is fixed: page scale, then layers, then
    /// scrollbars, then top controls. Afterward the current-frame-time
    /// cache resets so the next real draw recomputes fresh timestamps.
    pub fn on_tick(&mut self, now: HostTime, context: &mut CompositorContext<'_>) -> Vec<RasterTask> {
        self.affinity.assert_impl();
        let Some(tick) = self.ticker.poll(now) else {
            return Vec::new();
        };
        let mut tasks = Vec::new();
        if self.trees.pending().is_some() {
            if let Some(pending) = self.trees.pending_mut() {
                pending.update_draw_properties();
            }
            if let Some(tiles) = &mut self.tiles {
                tiles.request_manage();
            }
            tasks = self.manage_tiles();
        }

        let mut animated = false;
        if let Some(driver) = context.animations.as_deref_mut() {
            let active = self.trees.active_mut();
            animated |= driver.animate_page_scale(active, tick.now);
            animated |= driver.animate_layers(active, tick.now);
            animated |= driver.animate_scrollbars(active, tick.now);
        }
        let controls_step = self.scroll.top_controls.height * 0.1;
        if controls_step > 0.0 {
            animated |= self.scroll.top_controls.animate(controls_step);
        }
        if animated {
            self.client.set_needs_redraw(None);
        }

        self.background_ticking = !self.visible;
        self.current_frame_time = None;
        tasks
    }

    /// Whether the last tick ran while invisible.
    #[must_use]
    pub fn is_background_ticking(&self) -> bool {
        self.background_ticking
    }

    /// The cached frame time, if a draw attempt set one since the last
    /// tick.
    #[must_use]
    pub fn current_frame_time(&self) -> Option<HostTime> {
        self.current_frame_time
    }

    // -- Frame production ---------------------------------------------------

    /// Prepares a frame: draw properties, damage, occlusion, and pass
    /// assembly, in that order.
    pub fn prepare_to_draw(&mut self, now: HostTime) -> (DrawResult, FrameData) {
        self.affinity.assert_impl();
        self.update_can_draw();
        if !self.can_draw() {
            self.tracer().draw_decision(&DrawDecisionEvent {
                has_no_damage: false,
                contains_incomplete_tile: false,
                aborted: Some(AbortReason::CantDraw),
                pass_count: 0,
            });
            return (DrawResult::AbortCantDraw, FrameData::default());
        }
        let _ = self.current_frame_time.get_or_insert(now);

        self.trees.active_mut().update_draw_properties();
        self.update_damage();

        let tree = self.trees.active();
        let root_surface = &tree.draw_data.surfaces[0];
        let root_stable = root_surface.owner_stable;
        let root_damage = self
            .damage
            .get(&root_stable)
            .map_or(root_surface.content_rect, DamageTracker::current_damage);

        // The no-damage skip: an undamaged frame with no forcing
        // conditions is a successful empty swap.
        let requires_full_redraw =
            self.settings.output_requires_full_redraw || self.debug.continuous_painting;
        if !root_surface.contributions.is_empty()
            && rect_is_empty(intersect_nonempty(root_damage, root_surface.content_rect))
            && self.copy_requests.is_empty()
            && !requires_full_redraw
        {
            let frame = FrameData {
                has_no_damage: true,
                ..FrameData::default()
            };
            self.tracer().draw_decision(&DrawDecisionEvent {
                has_no_damage: true,
                contains_incomplete_tile: false,
                aborted: None,
                pass_count: 0,
            });
            return (DrawResult::Success, frame);
        }

        // Checkerboard veto: an animating transform over missing tiles
        // keeps the previous frame on screen instead of flashing.
        if self.animating_layer_is_missing_tiles() {
            self.tracer().draw_decision(&DrawDecisionEvent {
                has_no_damage: false,
                contains_incomplete_tile: true,
                aborted: Some(AbortReason::CheckerboardAnimation),
                pass_count: 0,
            });
            return (DrawResult::AbortCheckerboardAnimation, FrameData::default());
        }

        let surface_damage: BTreeMap<StableId, Rect> = tree
            .draw_data
            .surfaces
            .iter()
            .skip(1)
            .filter_map(|surface| {
                self.damage
                    .get(&surface.owner_stable)
                    .map(|tracker| (surface.owner_stable, tracker.current_damage()))
            })
            .collect();
        let overhang_resource = self
            .overhang_resource
            .and_then(|id| self.ui_resources.resource_for(id));
        let scrollable_content_rect = tree
            .root_scroll_layer()
            .map_or(root_surface.content_rect, |id| {
                tree.store.screen_rect_at(id.index())
            });
        let resourceless_software = self
            .renderer
            .as_ref()
            .is_some_and(|renderer| renderer.capabilities().using_software);

        let inputs = BuildInputs {
            tree: self.trees.active(),
            tiles: self.tiles.as_ref(),
            tree_kind: TreeKind::Active,
            root_damage,
            surface_damage: &surface_damage,
            overhang_resource,
            scrollable_content_rect,
            resourceless_software,
        };
        let mut frame = build_render_passes(&inputs, &mut self.copy_requests);

        // Whatever assembly could not attach gets an explicit empty
        // answer; copy requests are never silently dropped.
        for (_, requests) in core::mem::take(&mut self.copy_requests) {
            for request in requests {
                request.send_empty();
            }
        }

        if self.debug.show_occluding_rects {
            self.overlay_occluding_rects(&mut frame);
        }

        self.tracer().draw_decision(&DrawDecisionEvent {
            has_no_damage: false,
            contains_incomplete_tile: frame.contains_incomplete_tile,
            aborted: None,
            pass_count: frame.passes.len(),
        });
        (DrawResult::Success, frame)
    }

    /// Draws a prepared frame. Returns whether the renderer consumed it
    /// (a no-damage frame is a successful empty swap and returns
    /// `false` without touching the renderer).
    pub fn draw(&mut self, mut frame: FrameData) -> bool {
        self.affinity.assert_impl();
        if frame.has_no_damage {
            return false;
        }
        let viewport = Rect::from_origin_size(Point::ZERO, self.trees.active().viewport);
        let params = DrawParams {
            device_scale: self.trees.active().device_scale,
            viewport,
            clip: viewport,
            allow_partial_swap: self.settings.allow_partial_swap
                && !self.debug.continuous_painting,
            disable_image_filtering: self.scroll.is_scrolling(),
        };
        let Some(renderer) = self.renderer.as_mut() else {
            for pass in &mut frame.passes {
                for request in pass.copy_requests.drain(..) {
                    request.send_empty();
                }
            }
            return false;
        };
        renderer.draw_frame(&frame, &params);
        self.init_state = RendererInitState::Active;

        // Service copy requests against their pass outputs.
        for pass in &mut frame.passes {
            let output = pass.output_rect;
            for request in pass.copy_requests.drain(..) {
                match renderer.framebuffer_pixels(output) {
                    Some(pixels) => {
                        #[expect(
                            clippy::cast_possible_truncation,
                            clippy::cast_sign_loss,
                            reason = "pass output rects are small positive pixel counts"
                        )]
                        request.send(CopyOutputResult::Bitmap {
                            width: output.width().max(0.0) as u32,
                            height: output.height().max(0.0) as u32,
                            pixels,
                        });
                    }
                    None => request.send_empty(),
                }
            }
        }

        // Did-draw bookkeeping: change tracking and damage reset, and
        // only after all of it do pending uploads stop blocking — a
        // later frame's uploads must not be throttled by this one.
        self.trees.active_mut().store.reset_change_tracking();
        for tracker in self.damage.values_mut() {
            tracker.clear_damage();
        }
        let _ = self.trees.active_mut().take_viewport_damage();
        self.pool.set_uploads_nonblocking(true);
        true
    }

    /// Presents the drawn frame with its metadata.
    pub fn swap_buffers(&mut self) {
        self.affinity.assert_impl();
        let metadata = self.frame_metadata();
        if let Some(renderer) = &mut self.renderer {
            renderer.swap_buffers(metadata);
        }
    }

    /// Acknowledges a presented frame.
    pub fn did_receive_swap_ack(&mut self) {
        if let Some(renderer) = &mut self.renderer {
            renderer.receive_swap_ack();
        }
    }

    /// Assembles the per-frame metadata for the presentation layer.
    #[must_use]
    pub fn frame_metadata(&self) -> FrameMetadata {
        let tree = self.trees.active();
        let page_scale = tree.page_scale.total();
        let scale = tree.device_scale * page_scale;
        let viewport_layout = if scale > 0.0 {
            Size::new(tree.viewport.width / scale, tree.viewport.height / scale)
        } else {
            Size::ZERO
        };
        let (root_scroll_offset, content_size) = match tree.root_scroll_layer() {
            Some(id) => {
                let max = tree.store.max_scroll_offset(id);
                (
                    tree.store.total_scroll_offset(id),
                    Size::new(viewport_layout.width + max.x, viewport_layout.height + max.y),
                )
            }
            None => (Vec2::ZERO, viewport_layout),
        };
        FrameMetadata {
            device_scale: tree.device_scale,
            page_scale,
            min_page_scale: tree.page_scale.min,
            max_page_scale: tree.page_scale.max,
            root_scroll_offset,
            scrollable_viewport_size: viewport_layout,
            content_size,
            top_controls_offset: self.scroll.top_controls.offset,
            keyboard_inset: self.keyboard_inset,
        }
    }

    // -- Internals ----------------------------------------------------------

    /// Updates every surface's damage tracker, leaf-to-root, before any
    /// quad generation happens.
    fn update_damage(&mut self) {
        let tree = self.trees.active();
        let explicit_root = tree.viewport_damage();
        for surface_index in (0..tree.draw_data.surfaces.len()).rev() {
            let surface = &tree.draw_data.surfaces[surface_index];
            let contributions: Vec<DamageContribution> = surface
                .contributions
                .iter()
                .map(|contribution| match *contribution {
                    stratum_core::layer::Contribution::Layer(slot) => DamageContribution {
                        stable: tree.store.stable_at(slot),
                        rect: tree.store.visible_rect_at(slot),
                        changed: tree.store.appearance_changed_at(slot),
                    },
                    stratum_core::layer::Contribution::Surface(child) => {
                        let child_surface = &tree.draw_data.surfaces[child];
                        let child_damaged = self
                            .damage
                            .get(&child_surface.owner_stable)
                            .is_some_and(DamageTracker::has_damage);
                        DamageContribution {
                            stable: child_surface.owner_stable,
                            rect: union_nonempty(
                                child_surface.content_rect,
                                child_surface.replica_screen_rect,
                            ),
                            changed: child_damaged
                                || tree.store.appearance_changed_at(child_surface.owner),
                        }
                    }
                })
                .collect();
            // Mask or filter churn invalidates the whole surface, not
            // just the rects that moved.
            let owner_changed = tree.store.appearance_changed_at(surface.owner);
            let full_damage = owner_changed
                && (surface.mask != INVALID
                    || tree.store.flags_at(surface.owner).has_filters);
            let explicit = if surface_index == 0 {
                explicit_root
            } else {
                Rect::ZERO
            };
            self.damage
                .entry(surface.owner_stable)
                .or_default()
                .update(surface.content_rect, &contributions, full_damage, explicit);
        }
    }

    fn animating_layer_is_missing_tiles(&self) -> bool {
        let tree = self.trees.active();
        tree.store.traversal_order().iter().any(|&slot| {
            let flags = tree.store.flags_at(slot);
            if !flags.transform_animating
                || !matches!(tree.store.content_at(slot), LayerContent::Tiled)
            {
                return false;
            }
            let visible = tree.store.visible_rect_at(slot);
            if rect_is_empty(visible) {
                return false;
            }
            match &self.tiles {
                None => true,
                Some(tiles) => {
                    tiles.has_missing_tiles_in(TreeKind::Active, tree.store.stable_at(slot), visible)
                }
            }
        })
    }

    /// Debug overlay: tints the visible rects of occluding content in
    /// the root pass.
    fn overlay_occluding_rects(&mut self, frame: &mut FrameData) {
        let tree = self.trees.active();
        let Some(root) = frame.passes.last_mut() else {
            return;
        };
        let shared = root.add_shared_state(SharedQuadState {
            transform: stratum_core::transform::Transform3d::IDENTITY,
            visible_rect: root.output_rect,
            clip: root.output_rect,
            opacity: 0.25,
            blend: true,
        });
        let mut overlays = Vec::new();
        for &slot in tree.store.traversal_order() {
            let flags = tree.store.flags_at(slot);
            let visible = tree.store.visible_rect_at(slot);
            if flags.draws_content && flags.contents_opaque && !rect_is_empty(visible) {
                overlays.push(DrawQuad::SolidColor {
                    shared,
                    rect: visible,
                    color: stratum_core::geom::Color::new(1.0, 0.0, 1.0, 1.0),
                });
            }
        }
        // Overlays sit in front of everything.
        for (index, quad) in overlays.into_iter().enumerate() {
            root.quads.insert(index, quad);
        }
    }
}

/// Collects the tiled layers of a tree for the tile manager.
fn tiled_layers_of(tree: &LayerTree) -> Vec<TiledLayer> {
    tree.store
        .traversal_order()
        .iter()
        .filter(|&&slot| matches!(tree.store.content_at(slot), LayerContent::Tiled))
        .map(|&slot| TiledLayer {
            stable: tree.store.stable_at(slot),
            screen_rect: tree.store.screen_rect_at(slot),
            visible_rect: tree.store.visible_rect_at(slot),
        })
        .collect()
}
