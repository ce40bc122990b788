// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small geometry helpers shared across the pipeline.
//!
//! Damage, occlusion, and pass assembly all operate on [`kurbo::Rect`]
//! values in screen space. An empty region is represented by
//! [`Rect::ZERO`]; the helpers here treat any rect with non-positive
//! width or height as empty and never union it into an accumulator.

use kurbo::Rect;

/// A premultiplied-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Color {
    /// Channels in `[r, g, b, a]` order, each in `0.0..=1.0`.
    pub rgba: [f32; 4],
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Creates a color from individual channels.
    #[inline]
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { rgba: [r, g, b, a] }
    }

    /// Returns whether the color is fully opaque.
    #[inline]
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.rgba[3] >= 1.0
    }
}

/// Returns whether `r` has positive area.
#[inline]
#[must_use]
pub fn rect_is_empty(r: Rect) -> bool {
    r.width() <= 0.0 || r.height() <= 0.0
}

/// Unions two rects, treating empty rects as the identity.
#[must_use]
pub fn union_nonempty(a: Rect, b: Rect) -> Rect {
    match (rect_is_empty(a), rect_is_empty(b)) {
        (true, true) => Rect::ZERO,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.union(b),
    }
}

/// Returns whether `a` and `b` overlap with positive area.
#[must_use]
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    !rect_is_empty(a) && !rect_is_empty(b) && !rect_is_empty(a.intersect(b))
}

/// Intersection that returns [`Rect::ZERO`] instead of a degenerate rect.
#[must_use]
pub fn intersect_nonempty(a: Rect, b: Rect) -> Rect {
    if rects_intersect(a, b) {
        a.intersect(b)
    } else {
        Rect::ZERO
    }
}

/// Returns whether `outer` fully contains `inner`.
///
/// An empty `inner` is contained by anything; an empty `outer` contains
/// nothing but the empty rect.
#[must_use]
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    if rect_is_empty(inner) {
        return true;
    }
    if rect_is_empty(outer) {
        return false;
    }
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rects_are_union_identity() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(union_nonempty(Rect::ZERO, r), r);
        assert_eq!(union_nonempty(r, Rect::ZERO), r);
        assert_eq!(union_nonempty(Rect::ZERO, Rect::ZERO), Rect::ZERO);
    }

    #[test]
    fn union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 30.0, 30.0);
        let u = union_nonempty(a, b);
        assert!(rect_contains(u, a));
        assert!(rect_contains(u, b));
    }

    #[test]
    fn intersection_of_disjoint_is_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 0.0, 30.0, 10.0);
        assert!(!rects_intersect(a, b));
        assert_eq!(intersect_nonempty(a, b), Rect::ZERO);
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(!rects_intersect(a, b));
    }

    #[test]
    fn containment() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let inner = Rect::new(10.0, 10.0, 20.0, 20.0);
        assert!(rect_contains(outer, inner));
        assert!(!rect_contains(inner, outer));
        assert!(rect_contains(outer, Rect::ZERO));
        assert!(!rect_contains(Rect::ZERO, inner));
    }

    #[test]
    fn opaque_color() {
        assert!(Color::WHITE.is_opaque());
        assert!(!Color::TRANSPARENT.is_opaque());
        assert!(!Color::new(1.0, 0.0, 0.0, 0.5).is_opaque());
    }
}
