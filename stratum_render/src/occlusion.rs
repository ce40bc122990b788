// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion tracking over the front-to-back walk.
//!
//! The tracker consumes the walk's enter/leave events and maintains one
//! opaque-coverage [`Region`] per open target surface. A layer is asked
//! about *before* its quads are appended; a fully covered layer is
//! skipped without quads but still registers its own opaque contribution
//! so ancestors see it.
//!
//! Coverage accumulated inside a contributing surface only leaks out to
//! the parent target when the surface composites opaquely (unit opacity,
//! no mask, no filters) — a translucent surface's interior hides nothing
//! behind the surface.

use kurbo::Rect;

use crate::region::Region;

#[derive(Debug, Default)]
struct Scope {
    own: Region,
}

/// Screen-space occlusion state for one frame walk.
#[derive(Debug, Default)]
pub struct OcclusionTracker {
    scopes: Vec<Scope>,
}

impl OcclusionTracker {
    /// Creates a tracker with no open scopes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope for a target surface.
    pub fn enter_target(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Closes the current target's scope.
    ///
    /// With `opaque_composite` set, the scope's coverage merges into the
    /// parent target; otherwise it is discarded.
    pub fn leave_target(&mut self, opaque_composite: bool) {
        let scope = self
            .scopes
            .pop()
            .expect("leave_target without matching enter_target");
        if opaque_composite {
            if let Some(parent) = self.scopes.last_mut() {
                parent.own.add_region(&scope.own);
            }
        }
    }

    /// Registers opaque screen-space coverage in the current target.
    pub fn add_opaque(&mut self, rect: Rect) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.own.add_rect(rect);
        }
    }

    /// Returns whether `rect` is fully covered by content already
    /// visited (across all open scopes).
    #[must_use]
    pub fn is_occluded(&self, rect: Rect) -> bool {
        !stratum_core::geom::rect_is_empty(rect) && self.unoccluded_fragments(rect).is_empty()
    }

    /// Returns the parts of `rect` not covered by visited content.
    #[must_use]
    pub fn unoccluded_fragments(&self, rect: Rect) -> Vec<Rect> {
        let mut fragments = vec![rect];
        for scope in &self.scopes {
            fragments = scope.own.subtract_many(fragments);
            if fragments.is_empty() {
                break;
            }
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_occluded_in_an_empty_scope() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        assert!(!tracker.is_occluded(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn opaque_content_occludes_what_it_covers() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        tracker.add_opaque(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(tracker.is_occluded(Rect::new(10.0, 10.0, 50.0, 50.0)));
        assert!(!tracker.is_occluded(Rect::new(50.0, 50.0, 150.0, 60.0)));
    }

    #[test]
    fn separate_rects_combine_for_coverage() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        tracker.add_opaque(Rect::new(0.0, 0.0, 50.0, 100.0));
        tracker.add_opaque(Rect::new(50.0, 0.0, 100.0, 100.0));
        assert!(tracker.is_occluded(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn opaque_surface_coverage_leaks_to_parent() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        tracker.enter_target();
        tracker.add_opaque(Rect::new(0.0, 0.0, 100.0, 100.0));
        tracker.leave_target(true);
        assert!(tracker.is_occluded(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn translucent_surface_coverage_is_discarded() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        tracker.enter_target();
        tracker.add_opaque(Rect::new(0.0, 0.0, 100.0, 100.0));
        tracker.leave_target(false);
        assert!(!tracker.is_occluded(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn coverage_spans_open_scopes() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        tracker.add_opaque(Rect::new(0.0, 0.0, 50.0, 100.0));
        tracker.enter_target();
        tracker.add_opaque(Rect::new(50.0, 0.0, 100.0, 100.0));
        // Both halves together cover the rect even though they live in
        // different scopes.
        assert!(tracker.is_occluded(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }

    #[test]
    fn unoccluded_fragments_fill_background() {
        let mut tracker = OcclusionTracker::new();
        tracker.enter_target();
        tracker.add_opaque(Rect::new(0.0, 0.0, 800.0, 300.0));
        let fragments = tracker.unoccluded_fragments(Rect::new(0.0, 0.0, 800.0, 600.0));
        assert_eq!(fragments, vec![Rect::new(0.0, 300.0, 800.0, 600.0)]);
    }

    #[test]
    #[should_panic(expected = "leave_target without matching enter_target")]
    fn unbalanced_leave_panics() {
        let mut tracker = OcclusionTracker::new();
        tracker.leave_target(false);
    }
}
