// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform with 2-D projection helpers.
//!
//! Layer positioning uses the full 4×4 form so commits can express the
//! same transforms a platform compositor accepts. Hit testing, gesture
//! delta projection, and damage mapping only need the 2-D affine part,
//! which [`Transform3d::to_affine_2d`] extracts — returning `None` for
//! perspective or otherwise non-projectable transforms, which is exactly
//! the "non-invertible transform" case the scroll machinery must handle.

use core::ops::Mul;

use kurbo::{Affine, Point, Rect, Vec2};

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column*, matching the layout GPU APIs use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Lifts a 2-D affine transform into the 4×4 form.
    #[must_use]
    pub fn from_affine_2d(a: Affine) -> Self {
        let c = a.as_coeffs();
        Self {
            cols: [
                [c[0], c[1], 0.0, 0.0],
                [c[2], c[3], 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [c[4], c[5], 0.0, 1.0],
            ],
        }
    }

    /// Extracts the 2-D affine part, or `None` if the transform cannot be
    /// represented as a plane-preserving 2-D affine map.
    ///
    /// Rejected forms: perspective components (`w` row other than
    /// `[0, 0, *, 1]`) and z-dependence feeding back into x/y for points
    /// in the z = 0 plane.
    #[must_use]
    pub fn to_affine_2d(&self) -> Option<Affine> {
        let c = &self.cols;
        let has_perspective = c[0][3] != 0.0 || c[1][3] != 0.0 || c[3][3] != 1.0;
        if has_perspective {
            return None;
        }
        Some(Affine::new([
            c[0][0], c[0][1], c[1][0], c[1][1], c[3][0], c[3][1],
        ]))
    }

    /// Extracts an *invertible* 2-D affine part.
    ///
    /// Like [`to_affine_2d`](Self::to_affine_2d), but also rejects
    /// transforms whose 2-D part collapses area to zero (determinant 0),
    /// for callers that are about to invert.
    #[must_use]
    pub fn to_invertible_affine_2d(&self) -> Option<Affine> {
        let a = self.to_affine_2d()?;
        if a.determinant() == 0.0 || !a.determinant().is_finite() {
            return None;
        }
        Some(a)
    }

    /// Maps a z = 0 point through the transform, dropping z.
    ///
    /// Falls back to full homogeneous math when the transform has
    /// perspective; returns `None` when the mapped `w` is zero or not
    /// finite (clipped point).
    #[must_use]
    pub fn map_point(&self, p: Point) -> Option<Point> {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w == 0.0 || !w.is_finite() || !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }

    /// Maps an axis-aligned rect to the bounding box of its mapped corners.
    ///
    /// Returns [`Rect::ZERO`] when any corner fails to map (perspective
    /// clipping) — callers treat that as "assume nothing is visible is
    /// wrong, so assume everything", which they express by substituting
    /// their own bounds.
    #[must_use]
    pub fn map_rect(&self, r: Rect) -> Rect {
        let corners = [
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x0, r.y1),
            Point::new(r.x1, r.y1),
        ];
        let mut out: Option<Rect> = None;
        for corner in corners {
            let Some(mapped) = self.map_point(corner) else {
                return Rect::ZERO;
            };
            out = Some(match out {
                Some(acc) => acc.union_pt(mapped),
                None => Rect::from_points(mapped, mapped),
            });
        }
        out.unwrap_or(Rect::ZERO)
    }

    /// Maps a direction vector through the linear (non-translating) part
    /// of the 2-D affine projection. `None` for perspective transforms.
    #[must_use]
    pub fn map_vector(&self, v: Vec2) -> Option<Vec2> {
        let a = self.to_affine_2d()?;
        let c = a.as_coeffs();
        Some(Vec2::new(c[0] * v.x + c[2] * v.y, c[1] * v.x + c[3] * v.y))
    }

    /// Is every element of this transform [finite](f64::is_finite)?
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols
            .iter()
            .all(|col| col.iter().all(|v| v.is_finite()))
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Transform3d::from_translation(1.0, 2.0, 3.0);
        assert_eq!(Transform3d::IDENTITY * t, t);
        assert_eq!(t * Transform3d::IDENTITY, t);
    }

    #[test]
    fn translation_composition() {
        let a = Transform3d::from_translation(1.0, 0.0, 0.0);
        let b = Transform3d::from_translation(0.0, 2.0, 0.0);
        let c = a * b;
        assert_eq!(c.cols[3], [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn affine_round_trip() {
        let a = Affine::new([2.0, 0.0, 0.0, 3.0, 5.0, 7.0]);
        let t = Transform3d::from_affine_2d(a);
        assert_eq!(t.to_affine_2d(), Some(a));
    }

    #[test]
    fn perspective_has_no_affine_part() {
        let mut t = Transform3d::IDENTITY;
        t.cols[0][3] = 0.001;
        assert_eq!(t.to_affine_2d(), None);
        assert_eq!(t.map_vector(Vec2::new(1.0, 0.0)), None);
    }

    #[test]
    fn singular_transform_is_not_invertible() {
        let t = Transform3d::from_scale(0.0, 1.0, 1.0);
        assert!(t.to_affine_2d().is_some());
        assert!(t.to_invertible_affine_2d().is_none());
    }

    #[test]
    fn map_point_translates() {
        let t = Transform3d::from_translation(10.0, -5.0, 0.0);
        assert_eq!(
            t.map_point(Point::new(1.0, 1.0)),
            Some(Point::new(11.0, -4.0))
        );
    }

    #[test]
    fn map_rect_scales() {
        let t = Transform3d::from_scale(2.0, 2.0, 1.0);
        let r = t.map_rect(Rect::new(0.0, 0.0, 10.0, 20.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 20.0, 40.0));
    }

    #[test]
    fn map_vector_ignores_translation() {
        let t = Transform3d::from_translation(100.0, 100.0, 0.0)
            * Transform3d::from_scale(2.0, 1.0, 1.0);
        assert_eq!(t.map_vector(Vec2::new(3.0, 4.0)), Some(Vec2::new(6.0, 4.0)));
    }

    #[test]
    fn nonfinite_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(Transform3d::IDENTITY.is_finite());
    }
}
