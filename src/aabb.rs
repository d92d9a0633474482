//! 2D Axis-Aligned Bounding Box
//!
//! Used by shapes for their world bounds, by the broadphases for fat proxies
//! and by the dynamic tree for its internal nodes.

use crate::math::Vec2;

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2,
    /// Maximum corner
    pub max: Vec2,
}

impl Aabb {
    /// Create a box from its corners.
    #[inline]
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box centered at `center` with the given half extents.
    #[inline]
    #[must_use]
    pub fn from_center_half_extents(center: Vec2, half: Vec2) -> Self {
        Self::new(center - half, center + half)
    }

    /// Overlap test. Boxes touching on a face count as overlapping.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// `true` if `other` lies entirely inside `self`.
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// `true` if the point lies inside or on the box.
    #[inline]
    #[must_use]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Smallest box enclosing both.
    #[inline]
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Grow by `margin` on every side.
    #[inline]
    #[must_use]
    pub fn inflate(&self, margin: f32) -> Self {
        let m = Vec2::splat(margin);
        Self::new(self.min - m, self.max + m)
    }

    /// Perimeter, the 2D analogue of surface area for the insertion heuristic.
    #[inline]
    #[must_use]
    pub fn perimeter(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x + d.y)
    }

    /// Center point.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Half extents.
    #[inline]
    #[must_use]
    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Slab test against a ray segment `origin + t * dir`, `t` in `[0, max_t]`.
    ///
    /// Returns the entry parameter (clamped to 0 when the origin is inside).
    #[must_use]
    pub fn ray_entry(&self, origin: Vec2, dir: Vec2, max_t: f32) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_t;

        for (o, d, lo, hi) in [
            (origin.x, dir.x, self.min.x, self.max.x),
            (origin.y, dir.y, self.min.y, self.max.y),
        ] {
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t1 = (lo - o) * inv;
            let mut t2 = (hi - o) * inv;
            if t1 > t2 {
                core::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

// ============================================================================
// Tests
// ============================================================================
