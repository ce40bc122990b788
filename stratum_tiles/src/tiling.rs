// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer tile grids.
//!
//! A [`Tiling`] covers a layer's screen-space footprint with a grid of
//! fixed-size tiles. Tiles carry a raster [`TileState`] and a priority
//! [`TileBin`] assigned from viewport distance; both drive eviction and
//! raster scheduling in the manager.

use std::collections::BTreeMap;

use kurbo::Rect;
use stratum_core::geom::{rect_is_empty, rects_intersect};

use crate::pool::ResourceId;

/// Grid coordinates of one tile within a tiling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKey {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
}

/// Raster lifecycle of one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    /// No content; drawing this tile checkerboards.
    Missing,
    /// Raster work has been handed out but has not completed.
    Scheduled,
    /// Rasterized content is resident.
    Ready(ResourceId),
}

/// Priority class of a tile, best first.
///
/// The memory-policy cutoff maps onto this ordering: a cutoff of
/// [`Soon`](Self::Soon) keeps `Now` and `Soon` tiles and evicts
/// `Eventually` ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileBin {
    /// Intersects currently visible content; required to draw.
    Now,
    /// Near the viewport; useful prefetch.
    Soon,
    /// Everything else.
    Eventually,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Tile {
    pub(crate) state: TileState,
    pub(crate) bin: TileBin,
}

/// The tile grid for one layer.
#[derive(Debug)]
pub struct Tiling {
    /// Screen-space rect the grid covers (the layer's screen rect).
    pub(crate) coverage: Rect,
    tile_size: f64,
    pub(crate) tiles: BTreeMap<TileKey, Tile>,
}

impl Tiling {
    /// Creates an empty tiling with the given tile edge length.
    #[must_use]
    pub fn new(tile_size: f64) -> Self {
        assert!(tile_size > 0.0, "tile size must be positive");
        Self {
            coverage: Rect::ZERO,
            tile_size,
            tiles: BTreeMap::new(),
        }
    }

    /// Updates the covered rect, dropping tiles that fell off the grid.
    ///
    /// Returns the resources of dropped tiles so the caller can free
    /// them through the budget path.
    pub fn set_coverage(&mut self, coverage: Rect) -> Vec<ResourceId> {
        self.coverage = coverage;
        let (cols, rows) = self.grid_size();
        let mut dropped = Vec::new();
        self.tiles.retain(|key, tile| {
            let keep = key.x < cols && key.y < rows;
            if !keep {
                if let TileState::Ready(resource) = tile.state {
                    dropped.push(resource);
                }
            }
            keep
        });
        dropped
    }

    /// Number of grid columns and rows for the current coverage.
    #[must_use]
    pub fn grid_size(&self) -> (u32, u32) {
        if rect_is_empty(self.coverage) {
            return (0, 0);
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tile grids are far below u32 range"
        )]
        {
            let cols = (self.coverage.width() / self.tile_size).ceil() as u32;
            let rows = (self.coverage.height() / self.tile_size).ceil() as u32;
            (cols.max(1), rows.max(1))
        }
    }

    /// Screen-space rect of one tile, clipped to the coverage.
    #[must_use]
    pub fn tile_rect(&self, key: TileKey) -> Rect {
        let x0 = self.coverage.x0 + f64::from(key.x) * self.tile_size;
        let y0 = self.coverage.y0 + f64::from(key.y) * self.tile_size;
        Rect::new(
            x0,
            y0,
            (x0 + self.tile_size).min(self.coverage.x1),
            (y0 + self.tile_size).min(self.coverage.y1),
        )
    }

    /// Keys of all tiles whose rects intersect `rect`.
    #[must_use]
    pub fn keys_intersecting(&self, rect: Rect) -> Vec<TileKey> {
        let (cols, rows) = self.grid_size();
        let mut keys = Vec::new();
        for y in 0..rows {
            for x in 0..cols {
                let key = TileKey { x, y };
                if rects_intersect(self.tile_rect(key), rect) {
                    keys.push(key);
                }
            }
        }
        keys
    }

    /// Current state of a tile (missing if never touched).
    #[must_use]
    pub fn state(&self, key: TileKey) -> TileState {
        self.tiles
            .get(&key)
            .map_or(TileState::Missing, |tile| tile.state)
    }

    /// Assigns priority bins from the layer's visible rect and a
    /// prefetch margin around it.
    ///
    /// Every key intersecting the coverage is materialized so eviction
    /// and scheduling see the whole grid.
    pub fn assign_bins(&mut self, visible: Rect, prefetch_margin: f64) {
        let (cols, rows) = self.grid_size();
        let near = if rect_is_empty(visible) {
            Rect::ZERO
        } else {
            visible.inflate(prefetch_margin, prefetch_margin)
        };
        for y in 0..rows {
            for x in 0..cols {
                let key = TileKey { x, y };
                let rect = self.tile_rect(key);
                let bin = if rects_intersect(rect, visible) {
                    TileBin::Now
                } else if rects_intersect(rect, near) {
                    TileBin::Soon
                } else {
                    TileBin::Eventually
                };
                self.tiles
                    .entry(key)
                    .and_modify(|tile| tile.bin = bin)
                    .or_insert(Tile {
                        state: TileState::Missing,
                        bin,
                    });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiling_100x100_tiles_32() -> Tiling {
        let mut tiling = Tiling::new(32.0);
        let _ = tiling.set_coverage(Rect::new(0.0, 0.0, 100.0, 100.0));
        tiling
    }

    #[test]
    fn grid_size_rounds_up() {
        let tiling = tiling_100x100_tiles_32();
        assert_eq!(tiling.grid_size(), (4, 4));
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let tiling = tiling_100x100_tiles_32();
        let rect = tiling.tile_rect(TileKey { x: 3, y: 3 });
        assert_eq!(rect, Rect::new(96.0, 96.0, 100.0, 100.0));
    }

    #[test]
    fn keys_intersecting_selects_covered_tiles() {
        let tiling = tiling_100x100_tiles_32();
        let keys = tiling.keys_intersecting(Rect::new(0.0, 0.0, 33.0, 33.0));
        assert_eq!(
            keys,
            vec![
                TileKey { x: 0, y: 0 },
                TileKey { x: 1, y: 0 },
                TileKey { x: 0, y: 1 },
                TileKey { x: 1, y: 1 },
            ]
        );
    }

    #[test]
    fn assign_bins_classifies_by_distance() {
        let mut tiling = Tiling::new(32.0);
        let _ = tiling.set_coverage(Rect::new(0.0, 0.0, 320.0, 32.0));
        tiling.assign_bins(Rect::new(0.0, 0.0, 32.0, 32.0), 64.0);

        assert_eq!(tiling.tiles[&TileKey { x: 0, y: 0 }].bin, TileBin::Now);
        assert_eq!(tiling.tiles[&TileKey { x: 2, y: 0 }].bin, TileBin::Soon);
        assert_eq!(
            tiling.tiles[&TileKey { x: 9, y: 0 }].bin,
            TileBin::Eventually
        );
    }

    #[test]
    fn empty_visible_rect_makes_everything_eventually() {
        let mut tiling = tiling_100x100_tiles_32();
        tiling.assign_bins(Rect::ZERO, 64.0);
        assert!(
            tiling
                .tiles
                .values()
                .all(|tile| tile.bin == TileBin::Eventually)
        );
    }

    #[test]
    fn shrinking_coverage_drops_out_of_range_tiles() {
        let mut tiling = tiling_100x100_tiles_32();
        tiling.assign_bins(Rect::new(0.0, 0.0, 100.0, 100.0), 0.0);
        assert_eq!(tiling.tiles.len(), 16);

        let dropped = tiling.set_coverage(Rect::new(0.0, 0.0, 33.0, 33.0));
        assert_eq!(tiling.grid_size(), (2, 2));
        assert_eq!(tiling.tiles.len(), 4);
        // Nothing was Ready, so nothing to free.
        assert!(dropped.is_empty());
    }

    #[test]
    fn bin_ordering_is_best_first() {
        assert!(TileBin::Now < TileBin::Soon);
        assert!(TileBin::Soon < TileBin::Eventually);
    }
}
