//! Raycasting
//!
//! Ray type and the per-body ray test shared by every broadphase.

use crate::body::{BodyHandle, RigidBody};
use crate::math::Vec2;

/// A ray defined by origin and unit direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Ray origin point
    pub origin: Vec2,
    /// Unit direction
    pub direction: Vec2,
}

impl Ray {
    /// Default maximum distance: unbounded.
    pub const T_MAX: f32 = f32::MAX;

    /// Create a ray, normalizing the direction.
    ///
    /// Returns `None` for a zero or non-finite direction. Any other direction
    /// is accepted, however short.
    #[must_use]
    pub fn new(origin: Vec2, direction: Vec2) -> Option<Self> {
        if !origin.is_finite() || !direction.is_finite() {
            return None;
        }
        // Rescale first so tiny directions survive squaring
        let scale = direction.x.abs().max(direction.y.abs());
        if scale == 0.0 {
            return None;
        }
        let direction = direction / scale;
        Some(Self {
            origin,
            direction: direction / direction.length(),
        })
    }

    /// Point along the ray at distance `t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f32) -> Vec2 {
        self.origin + self.direction * t
    }
}

/// Nearest hit of a ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastResult {
    /// World-space hit point
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Distance from the ray origin
    pub distance: f32,
    /// The body that was hit
    pub body: BodyHandle,
}

/// Exact ray test against one body's shape at its current pose.
#[must_use]
pub fn raycast_body(body: &RigidBody, ray: &Ray, max_distance: f32) -> Option<RaycastResult> {
    let (distance, normal) =
        body.shape()
            .raycast(&body.transform(), ray.origin, ray.direction, max_distance)?;
    Some(RaycastResult {
        point: ray.at(distance),
        normal,
        distance,
        body: body.handle(),
    })
}

/// Keep the nearer of two hits, ties going to the lower handle.
#[inline]
#[must_use]
pub fn nearer(best: Option<RaycastResult>, hit: RaycastResult) -> Option<RaycastResult> {
    match best {
        Some(b) if b.distance < hit.distance || (b.distance == hit.distance && b.body < hit.body) => {
            Some(b)
        }
        _ => Some(hit),
    }
}
