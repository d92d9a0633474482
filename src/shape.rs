//! Collision Shapes
//!
//! Circles and convex polygons, defined in body-local space around the center
//! of mass. Polygons are stored counter-clockwise and re-centered on their
//! centroid at construction, so a body's `position` is always its center of
//! mass.

use crate::aabb::Aabb;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{cross_vs, Transform, Vec2};

/// Maximum number of polygon vertices.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Smallest polygon area accepted as non-degenerate.
const MIN_POLYGON_AREA: f32 = 1.0e-6;

// ============================================================================
// Polygon
// ============================================================================

/// Convex polygon with cached outward edge normals.
///
/// `normals[i]` is the outward normal of the edge `vertices[i] -> vertices[i + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
}

impl Polygon {
    /// Build a convex polygon from points in either winding order.
    ///
    /// The points are reoriented to counter-clockwise and shifted so the
    /// centroid sits at the local origin.
    pub fn new(points: &[Vec2]) -> PhysicsResult<Self> {
        if points.len() < 3 {
            return Err(PhysicsError::InvalidShape {
                reason: "polygon needs at least 3 vertices",
            });
        }
        if points.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::InvalidShape {
                reason: "polygon has too many vertices",
            });
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::InvalidShape {
                reason: "polygon vertex is not finite",
            });
        }

        let mut vertices = points.to_vec();
        let area = signed_area(&vertices);
        if area.abs() < MIN_POLYGON_AREA {
            return Err(PhysicsError::InvalidShape {
                reason: "polygon is degenerate",
            });
        }
        if area < 0.0 {
            vertices.reverse();
        }

        let n = vertices.len();
        for i in 0..n {
            let e0 = vertices[(i + 1) % n] - vertices[i];
            let e1 = vertices[(i + 2) % n] - vertices[(i + 1) % n];
            if e0.cross(e1) <= f32::EPSILON {
                return Err(PhysicsError::InvalidShape {
                    reason: "polygon is not strictly convex",
                });
            }
        }

        let c = centroid(&vertices);
        for v in &mut vertices {
            *v -= c;
        }

        let normals = (0..n)
            .map(|i| cross_vs(vertices[(i + 1) % n] - vertices[i], 1.0).normalize())
            .collect();

        Ok(Self { vertices, normals })
    }

    /// Axis-aligned box polygon centered on the origin.
    #[must_use]
    pub fn rectangle(half_width: f32, half_height: f32) -> Self {
        let (hw, hh) = (half_width.abs(), half_height.abs());
        Self {
            vertices: vec![
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ],
            normals: vec![
                Vec2::new(0.0, -1.0),
                Vec2::UNIT_X,
                Vec2::UNIT_Y,
                Vec2::new(-1.0, 0.0),
            ],
        }
    }

    /// Local-space vertices, counter-clockwise.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Local-space outward edge normals.
    #[inline]
    #[must_use]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    /// Vertex count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always `false` for a constructed polygon.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Enclosed area.
    #[must_use]
    pub fn area(&self) -> f32 {
        signed_area(&self.vertices).abs()
    }
}

fn signed_area(verts: &[Vec2]) -> f32 {
    let n = verts.len();
    let mut sum = 0.0;
    for i in 0..n {
        sum += verts[i].cross(verts[(i + 1) % n]);
    }
    sum * 0.5
}

/// Area-weighted centroid (triangle fan around the first vertex).
fn centroid(verts: &[Vec2]) -> Vec2 {
    let origin = verts[0];
    let mut c = Vec2::ZERO;
    let mut area = 0.0;
    for i in 1..verts.len() - 1 {
        let e1 = verts[i] - origin;
        let e2 = verts[i + 1] - origin;
        let a = 0.5 * e1.cross(e2);
        c += (e1 + e2) * (a / 3.0);
        area += a;
    }
    origin + c / area
}

// ============================================================================
// Shape
// ============================================================================

/// 2D collision shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Circle centered on the body origin.
    Circle {
        /// Radius of the circle.
        radius: f32,
    },
    /// Convex polygon.
    Polygon(Polygon),
}

impl Shape {
    /// Circle of the given radius.
    #[inline]
    #[must_use]
    pub fn circle(radius: f32) -> Self {
        Self::Circle { radius }
    }

    /// Box with the given half extents.
    #[inline]
    #[must_use]
    pub fn rectangle(half_width: f32, half_height: f32) -> Self {
        Self::Polygon(Polygon::rectangle(half_width, half_height))
    }

    /// Convex polygon from points (validated, see [`Polygon::new`]).
    pub fn polygon(points: &[Vec2]) -> PhysicsResult<Self> {
        Polygon::new(points).map(Self::Polygon)
    }

    /// Check the shape is usable by the simulation.
    pub fn validate(&self) -> PhysicsResult<()> {
        match self {
            Self::Circle { radius } => {
                if !radius.is_finite() || *radius <= 0.0 {
                    return Err(PhysicsError::InvalidShape {
                        reason: "circle radius must be finite and > 0",
                    });
                }
            }
            Self::Polygon(poly) => {
                if poly.vertices.iter().any(|v| !v.is_finite()) || !(poly.area() >= MIN_POLYGON_AREA) {
                    return Err(PhysicsError::InvalidShape {
                        reason: "polygon is degenerate",
                    });
                }
            }
        }
        Ok(())
    }

    /// Moment of inertia about the center of mass for the given mass.
    #[must_use]
    pub fn inertia(&self, mass: f32) -> f32 {
        match self {
            Self::Circle { radius } => 0.5 * mass * radius * radius,
            Self::Polygon(poly) => {
                let verts = poly.vertices();
                let n = verts.len();
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for i in 0..n {
                    let a = verts[i];
                    let b = verts[(i + 1) % n];
                    let cross = a.cross(b).abs();
                    numerator += cross * (a.dot(a) + a.dot(b) + b.dot(b));
                    denominator += cross;
                }
                if denominator <= 0.0 {
                    return 0.0;
                }
                mass * numerator / (6.0 * denominator)
            }
        }
    }

    /// Tight world-space bounds under the transform.
    #[must_use]
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Self::Circle { radius } => {
                Aabb::from_center_half_extents(xf.position, Vec2::splat(*radius))
            }
            Self::Polygon(poly) => {
                let first = xf.apply(poly.vertices[0]);
                let (min, max) = poly.vertices[1..]
                    .iter()
                    .map(|v| xf.apply(*v))
                    .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
                Aabb::new(min, max)
            }
        }
    }

    /// Exact ray test in world space. `dir` must be unit length.
    ///
    /// Returns the distance along the ray and the surface normal. A ray whose
    /// origin is inside the shape reports no hit.
    #[must_use]
    pub fn raycast(&self, xf: &Transform, origin: Vec2, dir: Vec2, max_t: f32) -> Option<(f32, Vec2)> {
        match self {
            Self::Circle { radius } => {
                let oc = origin - xf.position;
                let c = oc.length_squared() - radius * radius;
                if c < 0.0 {
                    return None;
                }
                let b = oc.dot(dir);
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let t = -b - disc.sqrt();
                if t < 0.0 || t > max_t {
                    return None;
                }
                let normal = (oc + dir * t).normalize();
                Some((t, normal))
            }
            Self::Polygon(poly) => {
                let p = xf.apply_inv(origin);
                let d = xf.rot.apply_inv(dir);
                let mut lower = 0.0_f32;
                let mut upper = max_t;
                let mut face = None;

                for (v, n) in poly.vertices.iter().zip(&poly.normals) {
                    let numerator = n.dot(*v - p);
                    let denominator = n.dot(d);
                    if denominator == 0.0 {
                        if numerator < 0.0 {
                            return None;
                        }
                    } else if denominator < 0.0 && numerator < lower * denominator {
                        // Entering through this face
                        lower = numerator / denominator;
                        face = Some(*n);
                    } else if denominator > 0.0 && numerator < upper * denominator {
                        upper = numerator / denominator;
                    }
                    if upper < lower {
                        return None;
                    }
                }

                face.map(|n| (lower, xf.rot.apply(n)))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
