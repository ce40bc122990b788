// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disjoint-rect screen-space regions.
//!
//! The occlusion tracker and background fill both need exact coverage
//! arithmetic, not bounding boxes: two half-covering rects must combine
//! into full coverage. A [`Region`] keeps its rects disjoint by
//! construction, so coverage tests reduce to repeated rect subtraction.

use kurbo::Rect;
use stratum_core::geom::{intersect_nonempty, rect_is_empty, rects_intersect};

/// Subtracts `cut` from `r`, returning the up-to-four fragments left.
#[must_use]
pub fn subtract_rect(r: Rect, cut: Rect) -> Vec<Rect> {
    if !rects_intersect(r, cut) {
        return if rect_is_empty(r) { Vec::new() } else { vec![r] };
    }
    let overlap = r.intersect(cut);
    let mut out = Vec::new();
    // Bands above and below the overlap span the full width of `r`;
    // left/right fragments fill the remaining middle band.
    let top = Rect::new(r.x0, r.y0, r.x1, overlap.y0);
    let bottom = Rect::new(r.x0, overlap.y1, r.x1, r.y1);
    let left = Rect::new(r.x0, overlap.y0, overlap.x0, overlap.y1);
    let right = Rect::new(overlap.x1, overlap.y0, r.x1, overlap.y1);
    for fragment in [top, bottom, left, right] {
        if !rect_is_empty(fragment) {
            out.push(fragment);
        }
    }
    out
}

/// A screen-space region held as disjoint rects.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the region covers nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The disjoint rects making up the region.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Adds a rect, keeping the stored rects disjoint.
    pub fn add_rect(&mut self, rect: Rect) {
        if rect_is_empty(rect) {
            return;
        }
        // Insert only the parts not already covered.
        let mut fragments = vec![rect];
        for existing in &self.rects {
            let mut next = Vec::new();
            for fragment in fragments {
                next.extend(subtract_rect(fragment, *existing));
            }
            fragments = next;
            if fragments.is_empty() {
                return;
            }
        }
        self.rects.extend(fragments);
    }

    /// Merges another region into this one.
    pub fn add_region(&mut self, other: &Self) {
        for &rect in &other.rects {
            self.add_rect(rect);
        }
    }

    /// Intersects the region with `bounds` in place.
    pub fn intersect_with(&mut self, bounds: Rect) {
        self.rects = self
            .rects
            .iter()
            .map(|&r| intersect_nonempty(r, bounds))
            .filter(|r| !rect_is_empty(*r))
            .collect();
    }

    /// Removes the covered parts of `fragments`, returning what is left.
    #[must_use]
    pub fn subtract_many(&self, fragments: Vec<Rect>) -> Vec<Rect> {
        let mut remaining = fragments;
        for covered in &self.rects {
            let mut next = Vec::new();
            for fragment in remaining {
                next.extend(subtract_rect(fragment, *covered));
            }
            remaining = next;
            if remaining.is_empty() {
                break;
            }
        }
        remaining
    }

    /// Returns the uncovered parts of `rect`.
    #[must_use]
    pub fn subtract_from(&self, rect: Rect) -> Vec<Rect> {
        if rect_is_empty(rect) {
            return Vec::new();
        }
        self.subtract_many(vec![rect])
    }

    /// Returns whether the region fully covers `rect`.
    #[must_use]
    pub fn covers(&self, rect: Rect) -> bool {
        self.subtract_from(rect).is_empty() && !rect_is_empty(rect)
    }
}
