// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tile manager: priorities, raster scheduling, and budget
//! enforcement.
//!
//! The manager never runs expensive work eagerly. Policy or priority
//! changes only mark state dirty and *request* a manage pass; the owner
//! runs [`TileManager::manage`] once per batch of changes, and that pass
//! is itself a no-op unless priorities are dirty and the viewport is
//! currently valid for prioritization (validity is suppressed externally
//! during interactive resize).
//!
//! Raster work leaves as [`RasterTask`] values and completes through
//! [`TileManager::did_finish_raster`]; a task whose tile has since been
//! evicted or dropped completes into nothing. Budget exhaustion is not
//! an error: missing tiles checkerboard and the condition is reported
//! upward through draw flags.

use std::collections::BTreeMap;

use kurbo::Rect;
use stratum_core::geom::rect_is_empty;
use stratum_core::layer::StableId;
use stratum_core::policy::{ManagedMemoryPolicy, PriorityCutoff};

use crate::pool::{ResourceId, ResourcePool};
use crate::tiling::{TileBin, TileKey, TileState, Tiling};

/// Which tree a tiling (or raster task) belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TreeKind {
    /// The currently drawn tree.
    Active,
    /// The tree being prepared for activation.
    Pending,
}

/// Tunables for tile layout and budgeting.
#[derive(Clone, Copy, Debug)]
pub struct TileConfig {
    /// Tile edge length in screen pixels.
    pub tile_size: f64,
    /// Bytes per rasterized pixel.
    pub bytes_per_pixel: u64,
    /// Fraction of the byte budget that not-currently-needed
    /// (eventually-binned) tiles may occupy.
    pub unused_memory_fraction: f64,
    /// How far beyond the visible rect tiles count as prefetch.
    pub prefetch_margin: f64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: 256.0,
            bytes_per_pixel: 4,
            unused_memory_fraction: 0.25,
            prefetch_margin: 256.0,
        }
    }
}

/// A unit of raster work handed to the (external) raster workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterTask {
    /// Which tree wants the tile.
    pub tree: TreeKind,
    /// Layer the tile belongs to.
    pub layer: StableId,
    /// Tile within the layer's grid.
    pub key: TileKey,
}

/// What one manage pass did.
#[derive(Clone, Debug, Default)]
pub struct ManageResult {
    /// Raster work for missing tiles under the cutoff, in deterministic
    /// (tree, layer, tile) order.
    pub raster_tasks: Vec<RasterTask>,
    /// Bytes evicted by budget enforcement during the pass.
    pub evicted_bytes: u64,
}

/// A tiled layer's per-frame geometry, as fed into [`TileManager::manage`].
#[derive(Clone, Copy, Debug)]
pub struct TiledLayer {
    /// Stable identity of the layer.
    pub stable: StableId,
    /// Screen-space footprint (tile grid coverage).
    pub screen_rect: Rect,
    /// Screen-space visible rect (drives the `Now` bin).
    pub visible_rect: Rect,
}

/// Tile bookkeeping and memory budget enforcement.
#[derive(Debug)]
pub struct TileManager {
    config: TileConfig,
    tilings: BTreeMap<(TreeKind, StableId), Tiling>,
    effective_policy: ManagedMemoryPolicy,
    bin_cutoff: Option<TileBin>,
    unused_limit_bytes: u64,
    resident_bytes: u64,
    priorities_dirty: bool,
    manage_requested: bool,
    viewport_valid: bool,
    newly_ready_visible: bool,
}

impl TileManager {
    /// Creates a manager with an all-zero budget; callers install a real
    /// policy before the first manage pass.
    #[must_use]
    pub fn new(config: TileConfig) -> Self {
        Self {
            config,
            tilings: BTreeMap::new(),
            effective_policy: ManagedMemoryPolicy {
                bytes_limit_when_visible: 0,
                priority_cutoff_when_visible: PriorityCutoff::AllowNothing,
                num_resources_limit: 0,
            },
            bin_cutoff: None,
            unused_limit_bytes: 0,
            resident_bytes: 0,
            priorities_dirty: true,
            manage_requested: false,
            viewport_valid: true,
            newly_ready_visible: false,
        }
    }

    /// Installs a new effective policy.
    ///
    /// Recomputes the derived limits (bin cutoff, unused-memory
    /// sub-limit). Any change marks priorities dirty and requests a
    /// manage pass rather than running one synchronously, so rapid
    /// policy churn batches into a single pass.
    pub fn set_effective_policy(&mut self, policy: ManagedMemoryPolicy) {
        if policy == self.effective_policy {
            return;
        }
        self.effective_policy = policy;
        self.bin_cutoff = match policy.priority_cutoff_when_visible {
            PriorityCutoff::AllowNothing => None,
            PriorityCutoff::AllowRequiredOnly => Some(TileBin::Now),
            PriorityCutoff::AllowNiceToHave => Some(TileBin::Soon),
            PriorityCutoff::AllowAnything => Some(TileBin::Eventually),
        };
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_precision_loss,
            clippy::cast_sign_loss,
            reason = "budget fractions are far below f64 integer precision"
        )]
        {
            self.unused_limit_bytes = (policy.bytes_limit_when_visible as f64
                * self.config.unused_memory_fraction) as u64;
        }
        self.priorities_dirty = true;
        self.manage_requested = true;
    }

    /// Returns the currently installed effective policy.
    #[must_use]
    pub fn effective_policy(&self) -> ManagedMemoryPolicy {
        self.effective_policy
    }

    /// Requests a manage pass (e.g. after draw-property changes).
    pub fn request_manage(&mut self) {
        self.priorities_dirty = true;
        self.manage_requested = true;
    }

    /// Returns whether a manage pass has been requested and not yet run.
    #[must_use]
    pub fn needs_manage(&self) -> bool {
        self.manage_requested
    }

    /// Marks the viewport (in)valid for tile management. While invalid
    /// (e.g. mid-resize), manage passes are suppressed.
    pub fn set_viewport_valid(&mut self, valid: bool) {
        self.viewport_valid = valid;
    }

    /// Bytes currently resident in tile content.
    #[must_use]
    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    /// Runs one manage pass: syncs tilings to the given layers, assigns
    /// priority bins, enforces the budget, and schedules raster work.
    ///
    /// Returns `None` without doing anything unless priorities are dirty
    /// and the viewport is valid for management.
    pub fn manage(
        &mut self,
        pool: &mut ResourcePool,
        layers: &[(TreeKind, Vec<TiledLayer>)],
    ) -> Option<ManageResult> {
        if !(self.priorities_dirty || self.manage_requested) || !self.viewport_valid {
            return None;
        }

        // Sync tilings: create/update for current layers, drop stale.
        for (kind, tiled) in layers {
            let stale: Vec<StableId> = self
                .tilings
                .range((*kind, StableId(0))..=(*kind, StableId(u64::MAX)))
                .map(|((_, stable), _)| *stable)
                .filter(|stable| !tiled.iter().any(|layer| layer.stable == *stable))
                .collect();
            for stable in stale {
                if let Some(tiling) = self.tilings.remove(&(*kind, stable)) {
                    self.free_tiling(pool, tiling);
                }
            }
            for layer in tiled {
                let tiling = self
                    .tilings
                    .entry((*kind, layer.stable))
                    .or_insert_with(|| Tiling::new(self.config.tile_size));
                for resource in tiling.set_coverage(layer.screen_rect) {
                    let freed = pool.free(resource);
                    self.resident_bytes -= freed;
                }
                tiling.assign_bins(layer.visible_rect, self.config.prefetch_margin);
            }
        }

        let evicted_bytes = self.enforce_budget(pool);

        // Schedule raster for missing tiles under the cutoff.
        let mut raster_tasks = Vec::new();
        if let Some(cutoff) = self.bin_cutoff {
            for ((kind, stable), tiling) in &mut self.tilings {
                for (key, tile) in &mut tiling.tiles {
                    if tile.bin <= cutoff && tile.state == TileState::Missing {
                        tile.state = TileState::Scheduled;
                        raster_tasks.push(RasterTask {
                            tree: *kind,
                            layer: *stable,
                            key: *key,
                        });
                    }
                }
            }
        }

        self.priorities_dirty = false;
        self.manage_requested = false;
        Some(ManageResult {
            raster_tasks,
            evicted_bytes,
        })
    }

    /// Evicts until tile memory fits the effective policy.
    ///
    /// Eviction is lowest-priority-first: everything beyond the cutoff
    /// goes, then eventually-binned tiles beyond the unused sub-limit,
    /// then worst-bin-first until the byte and count limits hold.
    /// Returns the bytes evicted.
    pub fn enforce_budget(&mut self, pool: &mut ResourcePool) -> u64 {
        let mut evicted = 0;

        // Beyond-cutoff tiles are never kept.
        evicted += self.evict_matching(pool, |bin, cutoff| match cutoff {
            None => true,
            Some(cutoff) => bin > cutoff,
        });

        // Unused (eventually-binned) tiles respect their own sub-limit.
        let unused_limit = self.unused_limit_bytes;
        let unused_bytes = self.ready_bytes_in_bin(TileBin::Eventually);
        if unused_bytes > unused_limit {
            let over = unused_bytes - unused_limit;
            evicted += self.evict_up_to(pool, over, |bin| bin == TileBin::Eventually);
        }

        // Global byte and count limits, worst bins first.
        for bin in [TileBin::Eventually, TileBin::Soon, TileBin::Now] {
            while self.over_global_limit(pool) {
                let freed = self.evict_one_in_bin(pool, bin);
                if freed == 0 {
                    break;
                }
                evicted += freed;
            }
        }

        evicted
    }

    fn over_global_limit(&self, pool: &ResourcePool) -> bool {
        self.resident_bytes > self.effective_policy.bytes_limit_when_visible
            || pool.resource_count() > self.effective_policy.num_resources_limit
    }

    fn ready_bytes_in_bin(&self, target: TileBin) -> u64 {
        let tile_bytes = self.bytes_per_tile();
        self.tilings
            .values()
            .flat_map(|tiling| tiling.tiles.values())
            .filter(|tile| target == tile.bin && matches!(tile.state, TileState::Ready(_)))
            .map(|_| tile_bytes)
            .sum()
    }

    fn evict_matching(
        &mut self,
        pool: &mut ResourcePool,
        beyond: impl Fn(TileBin, Option<TileBin>) -> bool,
    ) -> u64 {
        let cutoff = self.bin_cutoff;
        let mut evicted = 0;
        for tiling in self.tilings.values_mut() {
            for tile in tiling.tiles.values_mut() {
                if let TileState::Ready(resource) = tile.state {
                    if beyond(tile.bin, cutoff) {
                        evicted += pool.free(resource);
                        tile.state = TileState::Missing;
                    }
                }
            }
        }
        self.resident_bytes -= evicted;
        evicted
    }

    fn evict_up_to(
        &mut self,
        pool: &mut ResourcePool,
        mut bytes: u64,
        in_bin: impl Fn(TileBin) -> bool,
    ) -> u64 {
        let mut evicted = 0;
        'outer: for tiling in self.tilings.values_mut() {
            for tile in tiling.tiles.values_mut() {
                if bytes == 0 {
                    break 'outer;
                }
                if let TileState::Ready(resource) = tile.state {
                    if in_bin(tile.bin) {
                        let freed = pool.free(resource);
                        tile.state = TileState::Missing;
                        evicted += freed;
                        bytes = bytes.saturating_sub(freed);
                    }
                }
            }
        }
        self.resident_bytes -= evicted;
        evicted
    }

    fn evict_one_in_bin(&mut self, pool: &mut ResourcePool, bin: TileBin) -> u64 {
        for tiling in self.tilings.values_mut() {
            for tile in tiling.tiles.values_mut() {
                if tile.bin == bin {
                    if let TileState::Ready(resource) = tile.state {
                        let freed = pool.free(resource);
                        tile.state = TileState::Missing;
                        self.resident_bytes -= freed;
                        return freed;
                    }
                }
            }
        }
        0
    }

    /// Completes a raster task: allocates the tile's resource and marks
    /// it ready.
    ///
    /// Returns `false` when the task's destination no longer exists or
    /// was re-prioritized away — the work simply completes into nothing,
    /// which is how abandoned pending trees discard in-flight raster.
    pub fn did_finish_raster(&mut self, pool: &mut ResourcePool, task: RasterTask) -> bool {
        let bytes = self.bytes_per_tile();
        let Some(tiling) = self.tilings.get_mut(&(task.tree, task.layer)) else {
            return false;
        };
        let Some(tile) = tiling.tiles.get_mut(&task.key) else {
            return false;
        };
        if tile.state != TileState::Scheduled {
            return false;
        }
        let resource = pool.allocate(bytes);
        tile.state = TileState::Ready(resource);
        self.resident_bytes += bytes;
        if tile.bin == TileBin::Now {
            self.newly_ready_visible = true;
        }
        true
    }

    /// Polls whether any visible tile became ready since the last poll.
    pub fn update_visible_tiles(&mut self) -> bool {
        core::mem::take(&mut self.newly_ready_visible)
    }

    /// Returns whether every required (`Now`-binned) tile of the given
    /// tree is resident — the ready-to-activate condition for pending.
    #[must_use]
    pub fn all_required_ready(&self, kind: TreeKind) -> bool {
        self.tilings
            .range((kind, StableId(0))..=(kind, StableId(u64::MAX)))
            .flat_map(|(_, tiling)| tiling.tiles.values())
            .filter(|tile| tile.bin == TileBin::Now)
            .all(|tile| matches!(tile.state, TileState::Ready(_)))
    }

    /// Tile rects and resources covering `rect` for quad generation.
    ///
    /// `None` entries are missing content (checkerboard). Returns `None`
    /// when the layer has no tiling at all (everything checkerboards).
    #[must_use]
    pub fn tiles_for(
        &self,
        kind: TreeKind,
        layer: StableId,
        rect: Rect,
    ) -> Option<Vec<(Rect, Option<ResourceId>)>> {
        let tiling = self.tilings.get(&(kind, layer))?;
        Some(
            tiling
                .keys_intersecting(rect)
                .into_iter()
                .map(|key| {
                    let resource = match tiling.state(key) {
                        TileState::Ready(resource) => Some(resource),
                        TileState::Missing | TileState::Scheduled => None,
                    };
                    (tiling.tile_rect(key), resource)
                })
                .collect(),
        )
    }

    /// Returns whether any tile of `layer` intersecting `rect` is not
    /// resident (the checkerboard-during-animation veto input).
    #[must_use]
    pub fn has_missing_tiles_in(&self, kind: TreeKind, layer: StableId, rect: Rect) -> bool {
        match self.tilings.get(&(kind, layer)) {
            None => !rect_is_empty(rect),
            Some(tiling) => tiling
                .keys_intersecting(rect)
                .into_iter()
                .any(|key| !matches!(tiling.state(key), TileState::Ready(_))),
        }
    }

    /// Moves the pending tree's tilings into the active slot, releasing
    /// the retiring active tree's tiles.
    pub fn promote_pending(&mut self, pool: &mut ResourcePool) {
        let pending_keys: Vec<StableId> = self
            .tilings
            .range((TreeKind::Pending, StableId(0))..=(TreeKind::Pending, StableId(u64::MAX)))
            .map(|((_, stable), _)| *stable)
            .collect();
        for stable in pending_keys {
            if let Some(old) = self.tilings.remove(&(TreeKind::Active, stable)) {
                self.free_tiling(pool, old);
            }
            if let Some(tiling) = self.tilings.remove(&(TreeKind::Pending, stable)) {
                self.tilings.insert((TreeKind::Active, stable), tiling);
            }
        }
        self.priorities_dirty = true;
        self.manage_requested = true;
    }

    /// Drops the pending tree's tilings (a discarded pending tree).
    pub fn drop_pending(&mut self, pool: &mut ResourcePool) {
        let pending_keys: Vec<StableId> = self
            .tilings
            .range((TreeKind::Pending, StableId(0))..=(TreeKind::Pending, StableId(u64::MAX)))
            .map(|((_, stable), _)| *stable)
            .collect();
        for stable in pending_keys {
            if let Some(tiling) = self.tilings.remove(&(TreeKind::Pending, stable)) {
                self.free_tiling(pool, tiling);
            }
        }
    }

    /// Releases every tiling and its resources (context loss/teardown).
    pub fn release_all(&mut self, pool: &mut ResourcePool) -> u64 {
        let mut freed = 0;
        let tilings = core::mem::take(&mut self.tilings);
        for tiling in tilings.into_values() {
            freed += self.free_tiling_counting(pool, tiling);
        }
        freed
    }

    fn free_tiling(&mut self, pool: &mut ResourcePool, tiling: Tiling) {
        let _ = self.free_tiling_counting(pool, tiling);
    }

    fn free_tiling_counting(&mut self, pool: &mut ResourcePool, tiling: Tiling) -> u64 {
        let mut freed = 0;
        for tile in tiling.tiles.values() {
            if let TileState::Ready(resource) = tile.state {
                freed += pool.free(resource);
            }
        }
        self.resident_bytes -= freed;
        freed
    }

    fn bytes_per_tile(&self) -> u64 {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "tile sizes are small positive integers in disguise"
        )]
        {
            (self.config.tile_size * self.config.tile_size) as u64 * self.config.bytes_per_pixel
        }
    }
}
