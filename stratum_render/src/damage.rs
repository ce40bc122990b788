// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-surface damage accumulation.
//!
//! One [`DamageTracker`] persists per render surface, keyed by the
//! surface owner's stable identity, and is updated once per frame in
//! leaf-to-root surface order before any quad generation starts. The
//! tracker retains each contributing layer's last-frame screen rect so
//! it can damage both the old and new positions of anything that moved,
//! the old positions of anything that disappeared, and the whole surface
//! when its own footprint or filtering changed.

use std::collections::BTreeMap;

use kurbo::Rect;
use stratum_core::geom::{intersect_nonempty, rect_is_empty, union_nonempty};
use stratum_core::layer::StableId;

/// One contributing layer's geometry for a damage update.
#[derive(Clone, Copy, Debug)]
pub struct DamageContribution {
    /// Stable identity of the contributing layer (or contributing
    /// surface's owner).
    pub stable: StableId,
    /// Current screen-space rect.
    pub rect: Rect,
    /// Whether the layer's appearance changed since the last frame.
    pub changed: bool,
}

/// Damage bookkeeping for one render surface.
#[derive(Debug, Default)]
pub struct DamageTracker {
    prev_rects: BTreeMap<StableId, Rect>,
    prev_surface_rect: Rect,
    current_damage: Rect,
}

impl DamageTracker {
    /// Creates a tracker with no history (first frame damages fully).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates this frame's damage for the surface.
    ///
    /// `surface_rect` is the surface's current content rect;
    /// `full_damage` forces whole-surface damage (mask/filter changes,
    /// first frame after a surface is re-promoted); `explicit` is
    /// caller-injected damage (viewport invalidations) in the same
    /// space. The result is clipped to the surface rect.
    pub fn update(
        &mut self,
        surface_rect: Rect,
        contributions: &[DamageContribution],
        full_damage: bool,
        explicit: Rect,
    ) {
        let mut damage = explicit;

        if full_damage || surface_rect != self.prev_surface_rect {
            damage = union_nonempty(damage, self.prev_surface_rect);
            damage = union_nonempty(damage, surface_rect);
        }

        let mut next_rects = BTreeMap::new();
        for contribution in contributions {
            let old = self.prev_rects.remove(&contribution.stable);
            match old {
                None => {
                    // Newly exposed content.
                    damage = union_nonempty(damage, contribution.rect);
                }
                Some(old_rect) => {
                    if contribution.changed {
                        damage = union_nonempty(damage, old_rect);
                        damage = union_nonempty(damage, contribution.rect);
                    }
                }
            }
            next_rects.insert(contribution.stable, contribution.rect);
        }

        // Whatever is left in prev_rects disappeared this frame; its old
        // position is newly exposed.
        for (_, old_rect) in core::mem::take(&mut self.prev_rects) {
            damage = union_nonempty(damage, old_rect);
        }

        self.prev_rects = next_rects;
        self.prev_surface_rect = surface_rect;
        // Accumulate rather than replace: an aborted draw must not lose
        // damage it already absorbed. [`clear_damage`](Self::clear_damage)
        // runs after a successful swap.
        self.current_damage =
            intersect_nonempty(union_nonempty(self.current_damage, damage), surface_rect);
    }

    /// The damage accumulated since the last [`clear_damage`](Self::clear_damage).
    #[must_use]
    pub fn current_damage(&self) -> Rect {
        self.current_damage
    }

    /// Returns whether any damage is accumulated.
    #[must_use]
    pub fn has_damage(&self) -> bool {
        !rect_is_empty(self.current_damage)
    }

    /// Clears accumulated damage after a successfully drawn frame,
    /// keeping the layer-rect history.
    pub fn clear_damage(&mut self) {
        self.current_damage = Rect::ZERO;
    }

    /// Forgets all history so the next update damages fully.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);

    fn contribution(id: u64, rect: Rect, changed: bool) -> DamageContribution {
        DamageContribution {
            stable: StableId(id),
            rect,
            changed,
        }
    }

    #[test]
    fn first_frame_damages_fully() {
        let mut tracker = DamageTracker::new();
        tracker.update(
            SURFACE,
            &[contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false)],
            false,
            Rect::ZERO,
        );
        // Surface rect changed from ZERO → full damage.
        assert_eq!(tracker.current_damage(), SURFACE);
    }

    #[test]
    fn unchanged_frame_has_no_damage() {
        let mut tracker = DamageTracker::new();
        let layers = [contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false)];
        tracker.update(SURFACE, &layers, false, Rect::ZERO);
        tracker.clear_damage();
        tracker.update(SURFACE, &layers, false, Rect::ZERO);
        assert!(!tracker.has_damage());
    }

    #[test]
    fn moved_layer_damages_old_and_new_position() {
        let mut tracker = DamageTracker::new();
        tracker.update(
            SURFACE,
            &[contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false)],
            false,
            Rect::ZERO,
        );
        tracker.clear_damage();
        tracker.update(
            SURFACE,
            &[contribution(1, Rect::new(200.0, 0.0, 300.0, 100.0), true)],
            false,
            Rect::ZERO,
        );
        let damage = tracker.current_damage();
        assert_eq!(damage, Rect::new(0.0, 0.0, 300.0, 100.0));
    }

    #[test]
    fn unchanged_layers_do_not_damage() {
        let mut tracker = DamageTracker::new();
        let a = contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        tracker.clear_damage();
        // Second frame: same rect, marked unchanged.
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        assert_eq!(tracker.current_damage(), Rect::ZERO);
    }

    #[test]
    fn removed_layer_exposes_its_old_rect() {
        let mut tracker = DamageTracker::new();
        let a = contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        let b = contribution(2, Rect::new(300.0, 300.0, 400.0, 400.0), false);
        tracker.update(SURFACE, &[a, b], false, Rect::ZERO);
        tracker.clear_damage();
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        assert_eq!(tracker.current_damage(), Rect::new(300.0, 300.0, 400.0, 400.0));
    }

    #[test]
    fn added_layer_damages_its_rect() {
        let mut tracker = DamageTracker::new();
        let a = contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        tracker.clear_damage();
        let b = contribution(2, Rect::new(300.0, 300.0, 400.0, 400.0), false);
        tracker.update(SURFACE, &[a, b], false, Rect::ZERO);
        assert_eq!(tracker.current_damage(), Rect::new(300.0, 300.0, 400.0, 400.0));
    }

    #[test]
    fn explicit_damage_is_clipped_to_surface() {
        let mut tracker = DamageTracker::new();
        let a = contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        tracker.clear_damage();
        tracker.update(
            SURFACE,
            &[a],
            false,
            Rect::new(700.0, 500.0, 900.0, 700.0),
        );
        assert_eq!(
            tracker.current_damage(),
            Rect::new(700.0, 500.0, 800.0, 600.0)
        );
    }

    #[test]
    fn full_damage_covers_the_surface() {
        let mut tracker = DamageTracker::new();
        let a = contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        tracker.clear_damage();
        tracker.update(SURFACE, &[a], true, Rect::ZERO);
        assert_eq!(tracker.current_damage(), SURFACE);
    }

    #[test]
    fn reset_forgets_history() {
        let mut tracker = DamageTracker::new();
        let a = contribution(1, Rect::new(0.0, 0.0, 100.0, 100.0), false);
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        tracker.reset();
        tracker.update(SURFACE, &[a], false, Rect::ZERO);
        assert_eq!(tracker.current_damage(), SURFACE);
    }
}
