// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor-thread scrolling, pinch zoom, and fling.
//!
//! Input is applied directly against the active tree, with no
//! main-thread round trip. The machinery here is a small state machine:
//!
//! ```text
//!   Idle ──scroll_begin──► Scrolling ──scroll_by*──► ──scroll_end──► Idle
//!                │                                        ▲
//!                └── OnMainThread / Ignored ──────────────┘
//! ```
//!
//! A parallel pinch flag can be active independently of scroll state.
//!
//! Delta handling differs by input unit: wheel deltas apply in the
//! layer's local space directly, while gesture deltas are projected
//! through the inverse screen-space transform so on-screen finger motion
//! matches on-screen content motion — including re-deriving the actually
//! applied screen delta by projecting forward again after the (possibly
//! clamped) scroll.
//!
//! A layer declining a gesture is an ordinary outcome, reported as
//! [`ScrollStatus::OnMainThread`] or [`ScrollStatus::Ignored`], never an
//! error.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Vec2};

use crate::layer::INVALID;
use crate::tree::LayerTree;

/// Tunable thresholds for scroll handling.
///
/// The defaults carry the empirically chosen values; they are knobs, not
/// contracts.
#[derive(Clone, Copy, Debug)]
pub struct ScrollConfig {
    /// Movement below this (in both axes, screen pixels) counts as "did
    /// not move" for latching and bubbling decisions.
    pub move_threshold: f64,
    /// When the applied delta is within this many degrees of the
    /// requested delta, the remainder is discarded instead of bubbling.
    pub bubble_angle_degrees: f64,
    /// When no layer accepts a gesture, latch the root scroll layer as a
    /// sink so overscroll is still reported.
    pub always_report_overscroll: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            move_threshold: 0.1,
            bubble_angle_degrees: 45.0,
            always_report_overscroll: false,
        }
    }
}

/// What kind of input produced a scroll delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollUnit {
    /// Mouse-wheel style: deltas are in content-local units and bubble.
    Wheel,
    /// Touch/gesture style: deltas are in screen pixels, projected
    /// through layer transforms, and latch to one layer.
    Gesture,
}

/// Outcome of starting a scroll gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollStatus {
    /// A layer accepted the gesture; subsequent deltas apply here.
    Started,
    /// A candidate explicitly defers to the main thread; the whole
    /// gesture must be handed off.
    OnMainThread,
    /// No layer accepted and no overscroll sink is configured.
    Ignored,
}

/// Outcome of one applied scroll delta.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollResult {
    /// Whether any layer moved at least the movement threshold.
    pub did_scroll: bool,
    /// Screen-space delta actually consumed by layers (and the
    /// top-controls manager).
    pub applied: Vec2,
    /// Screen-space delta left over after the chain; reported to the
    /// host as overscroll.
    pub unused: Vec2,
}

/// Mobile-style top controls (URL bar) that consume root scrolls.
///
/// `offset` runs from `0.0` (fully shown) to `height` (fully hidden).
/// Scrolling content down hides the controls before the root layer
/// moves; scrolling up reveals them first.
#[derive(Clone, Copy, Debug, Default)]
pub struct TopControlsManager {
    /// Control strip height in screen pixels. Zero disables the manager.
    pub height: f64,
    /// Current hidden amount, in `0.0..=height`.
    pub offset: f64,
}

impl TopControlsManager {
    /// Creates a manager for controls of the given height.
    #[must_use]
    pub fn new(height: f64) -> Self {
        Self {
            height,
            offset: 0.0,
        }
    }

    /// Consumes the vertical portion of `delta` that moves the controls;
    /// returns what is left for the layer chain.
    pub fn consume(&mut self, delta: Vec2) -> Vec2 {
        if self.height <= 0.0 {
            return delta;
        }
        if delta.y > 0.0 {
            let take = delta.y.min(self.height - self.offset);
            self.offset += take;
            Vec2::new(delta.x, delta.y - take)
        } else if delta.y < 0.0 {
            let give = delta.y.max(-self.offset);
            self.offset += give;
            Vec2::new(delta.x, delta.y - give)
        } else {
            delta
        }
    }

    /// Steps the controls toward their nearest resting state (fully
    /// shown or fully hidden). Returns whether the offset changed.
    pub fn animate(&mut self, step: f64) -> bool {
        if self.height <= 0.0 || self.offset == 0.0 || self.offset == self.height {
            return false;
        }
        let target = if self.offset * 2.0 >= self.height {
            self.height
        } else {
            0.0
        };
        let before = self.offset;
        if target > self.offset {
            self.offset = (self.offset + step).min(target);
        } else {
            self.offset = (self.offset - step).max(target);
        }
        before != self.offset
    }

    /// Height of the currently visible control strip.
    #[must_use]
    pub fn visible_height(&self) -> f64 {
        self.height - self.offset
    }
}

/// The scroll/pinch/fling state machine.
#[derive(Debug, Default)]
pub struct ScrollController {
    /// Threshold configuration.
    pub config: ScrollConfig,
    /// Top-controls manager consulted for root scrolls.
    pub top_controls: TopControlsManager,
    scrolling: Option<u32>,
    should_bubble: bool,
    unit: ScrollUnit,
    pinch_active: bool,
    fling_active: bool,
}

impl Default for ScrollUnit {
    fn default() -> Self {
        Self::Wheel
    }
}

impl ScrollController {
    /// Creates a controller with the given configuration.
    #[must_use]
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns whether a scroll gesture is in progress.
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.scrolling.is_some()
    }

    /// Returns whether a pinch gesture is in progress.
    #[must_use]
    pub fn is_pinching(&self) -> bool {
        self.pinch_active
    }

    /// Returns whether a fling is riding the current latch.
    #[must_use]
    pub fn is_flinging(&self) -> bool {
        self.fling_active
    }

    /// Drops any layer latch. Call when the tree the latch points into
    /// is replaced (activation) or torn down.
    pub fn clear_latch(&mut self) {
        self.scrolling = None;
        self.fling_active = false;
    }

    /// Starts a scroll gesture at `point` (screen space).
    ///
    /// Hit-tests front-to-back, then walks scroll-parent links (falling
    /// back to structural parents) until a candidate accepts. A
    /// candidate marked for main-thread scrolling aborts the whole
    /// gesture with [`ScrollStatus::OnMainThread`].
    pub fn scroll_begin(&mut self, tree: &LayerTree, point: Point, unit: ScrollUnit) -> ScrollStatus {
        self.scrolling = None;
        self.unit = unit;
        self.should_bubble = unit == ScrollUnit::Wheel;

        let mut candidate = hit_test(tree, point);
        while let Some(slot) = candidate {
            let flags = tree.store.flags_at(slot);
            if flags.main_thread_scrolling {
                return ScrollStatus::OnMainThread;
            }
            if flags.scrollable && can_scroll(tree, slot) {
                self.scrolling = Some(slot);
                return ScrollStatus::Started;
            }
            candidate = scroll_ancestor(tree, slot);
        }

        if self.config.always_report_overscroll {
            // Latch the root scroll layer purely as an overscroll sink.
            if let Some(root_scroll) = tree.root_scroll_layer() {
                self.scrolling = Some(root_scroll.index());
                return ScrollStatus::Started;
            }
        }
        ScrollStatus::Ignored
    }

    /// Applies a scroll delta to the latched chain.
    ///
    /// Bubbling (wheel input only) moves leftover delta to scrollable
    /// ancestors; the near-parallel early-out discards the remainder
    /// instead, so one gesture never produces visually conflicting
    /// multi-axis chains. Whatever the chain cannot consume is returned
    /// as `unused` for overscroll reporting.
    pub fn scroll_by(&mut self, tree: &mut LayerTree, screen_delta: Vec2) -> ScrollResult {
        let mut result = ScrollResult::default();
        let Some(mut slot) = self.scrolling else {
            result.unused = screen_delta;
            return result;
        };

        let root_scroll = tree.root_scroll_layer().map(|id| id.index());
        let threshold = self.config.move_threshold;
        let mut remaining = screen_delta;

        loop {
            if remaining.x.abs() <= threshold && remaining.y.abs() <= threshold {
                break;
            }

            if Some(slot) == root_scroll {
                let before = remaining;
                remaining = self.top_controls.consume(remaining);
                let consumed = before - remaining;
                if consumed != Vec2::ZERO {
                    result.applied += consumed;
                    result.did_scroll = true;
                }
                if remaining.x.abs() <= threshold && remaining.y.abs() <= threshold {
                    break;
                }
            }

            let applied = apply_to_layer(tree, slot, remaining, self.unit);
            let moved = applied.x.abs() > threshold || applied.y.abs() > threshold;

            if moved {
                // Lock onto the layer that moved.
                self.scrolling = Some(slot);
                result.did_scroll = true;
                result.applied += applied;
                remaining -= applied;

                if !self.should_bubble {
                    break;
                }
                if nearly_parallel(applied, screen_delta, self.config.bubble_angle_degrees) {
                    remaining = Vec2::ZERO;
                    break;
                }
            } else if !self.should_bubble {
                break;
            }

            match scroll_ancestor_scrollable(tree, slot) {
                Some(next) => slot = next,
                None => break,
            }
        }

        result.unused = remaining;
        result
    }

    /// Ends the scroll gesture.
    pub fn scroll_end(&mut self) {
        self.scrolling = None;
        self.fling_active = false;
    }

    /// Starts a fling: rides the current latch with bubbling disabled.
    ///
    /// Returns [`ScrollStatus::Ignored`] when there is nothing latched
    /// to fling.
    pub fn fling_begin(&mut self) -> ScrollStatus {
        if self.scrolling.is_none() {
            return ScrollStatus::Ignored;
        }
        self.fling_active = true;
        self.should_bubble = false;
        ScrollStatus::Started
    }

    /// Ends a fling, keeping the latch for a follow-on gesture.
    pub fn fling_end(&mut self) {
        self.fling_active = false;
    }

    /// Starts a pinch-zoom gesture.
    pub fn pinch_begin(&mut self) {
        self.pinch_active = true;
    }

    /// Applies one pinch update: scales the page around `anchor`.
    ///
    /// The anchor is held fixed on screen by solving for its pre- and
    /// post-scale content positions and applying the difference as a
    /// root scroll.
    pub fn pinch_update(&mut self, tree: &mut LayerTree, magnify: f64, anchor: Point) {
        debug_assert!(self.pinch_active, "pinch_update outside a pinch gesture");
        let applied = tree.page_scale.magnify_by(magnify);
        if applied == 1.0 {
            return;
        }
        let new_scale = tree.page_scale.total();
        let old_scale = new_scale / applied;
        let drift = Vec2::new(
            anchor.x / old_scale - anchor.x / new_scale,
            anchor.y / old_scale - anchor.y / new_scale,
        );
        if let Some(root_scroll) = tree.root_scroll_layer() {
            let _ = tree.store.scroll_by(root_scroll, drift);
        }
    }

    /// Ends the pinch gesture.
    pub fn pinch_end(&mut self) {
        self.pinch_active = false;
    }
}

/// Finds the front-most drawable layer containing `point`.
fn hit_test(tree: &LayerTree, point: Point) -> Option<u32> {
    tree.draw_data
        .layers_front_to_back()
        .into_iter()
        .find(|&slot| tree.store.visible_rect_at(slot).contains(point))
}

fn can_scroll(tree: &LayerTree, slot: u32) -> bool {
    let max = tree.store.max_scroll_offset[slot as usize];
    max.x > 0.0 || max.y > 0.0
}

/// Next candidate in the bubble walk: the scroll-parent link when set,
/// otherwise the structural parent.
fn scroll_ancestor(tree: &LayerTree, slot: u32) -> Option<u32> {
    let sp = tree.store.scroll_parent[slot as usize];
    if sp != INVALID && !tree.store.free_list.contains(&sp) {
        return Some(sp);
    }
    let p = tree.store.parent[slot as usize];
    (p != INVALID).then_some(p)
}

/// Next *scrollable* ancestor in the bubble walk.
fn scroll_ancestor_scrollable(tree: &LayerTree, slot: u32) -> Option<u32> {
    let mut current = scroll_ancestor(tree, slot);
    while let Some(s) = current {
        if tree.store.flags_at(s).scrollable && can_scroll(tree, s) {
            return Some(s);
        }
        current = scroll_ancestor(tree, s);
    }
    None
}

/// Applies `screen_delta` to one layer; returns the screen-space delta
/// actually applied.
fn apply_to_layer(tree: &mut LayerTree, slot: u32, screen_delta: Vec2, unit: ScrollUnit) -> Vec2 {
    // The latched layer can disappear under a commit that lands mid
    // gesture; the chain just stops consuming.
    let Some(id) = tree.store.by_stable(tree.store.stable_at(slot)) else {
        return Vec2::ZERO;
    };
    match unit {
        ScrollUnit::Wheel => {
            // Wheel deltas are already in content-local units.
            tree.store.scroll_by(id, screen_delta)
        }
        ScrollUnit::Gesture => {
            let Some(affine) = tree
                .store
                .screen_transform_at(slot)
                .to_invertible_affine_2d()
            else {
                // Cannot project through this transform; the layer
                // declines the delta and bubbling decides what is next.
                return Vec2::ZERO;
            };
            let inverse = affine.inverse();
            let local = linear_map(&inverse, screen_delta);
            let applied_local = tree.store.scroll_by(id, local);
            // Re-derive what actually moved on screen, accounting for
            // clamping against the scroll extents.
            linear_map(&affine, applied_local)
        }
    }
}

/// Applies only the linear (non-translating) part of an affine map.
fn linear_map(affine: &kurbo::Affine, v: Vec2) -> Vec2 {
    let c = affine.as_coeffs();
    Vec2::new(c[0] * v.x + c[2] * v.y, c[1] * v.x + c[3] * v.y)
}

/// Whether `applied` points within `angle_degrees` of `requested`.
fn nearly_parallel(applied: Vec2, requested: Vec2, angle_degrees: f64) -> bool {
    let na = applied.hypot();
    let nr = requested.hypot();
    if na == 0.0 || nr == 0.0 {
        return false;
    }
    let cos = applied.dot(requested) / (na * nr);
    cos >= angle_degrees.to_radians().cos()
}
