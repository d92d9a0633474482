//! Narrow Phase Contact Generation
//!
//! Exact contact points for every shape pair: circle/circle, polygon/circle
//! and polygon/polygon. Polygon pairs use the separating axis test to pick a
//! reference face, then clip the incident edge against the reference face's
//! side planes, giving at most two points.
//!
//! # Conventions
//!
//! - The normal points from body A to body B.
//! - `separation` is negative when the shapes overlap.
//! - Each point carries a [`FeatureId`] naming the geometric features that
//!   produced it, so the solver can match points across steps.

use crate::body::RigidBody;
use crate::math::{cross_vs, Transform, Vec2};
use crate::shape::{Polygon, Shape, MAX_POLYGON_VERTICES};

/// Maximum contact points produced for one pair.
pub const MAX_CONTACT_POINTS: usize = 2;

/// Reference-face hysteresis: prefer polygon A unless B separates by more.
const REFERENCE_FACE_TOLERANCE: f32 = 0.0005;

// ============================================================================
// Feature ids
// ============================================================================

/// Kind of geometric feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FeatureKind {
    /// A vertex
    Vertex = 0,
    /// An edge
    Face = 1,
}

/// Packed pair of features (index and kind on each shape) that generated a
/// contact point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FeatureId(u32);

impl FeatureId {
    /// Pack the features of both shapes.
    #[inline]
    #[must_use]
    pub const fn new(index_a: u8, index_b: u8, kind_a: FeatureKind, kind_b: FeatureKind) -> Self {
        Self(
            index_a as u32
                | (index_b as u32) << 8
                | (kind_a as u32) << 16
                | (kind_b as u32) << 24,
        )
    }

    /// Same features seen from the other shape.
    #[inline]
    #[must_use]
    pub const fn swapped(self) -> Self {
        let ia = self.0 & 0xff;
        let ib = (self.0 >> 8) & 0xff;
        let ka = (self.0 >> 16) & 0xff;
        let kb = (self.0 >> 24) & 0xff;
        Self(ib | ia << 8 | kb << 16 | ka << 24)
    }

    /// Raw packed value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

// ============================================================================
// Contact output
// ============================================================================

/// One contact point produced by the narrow phase.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContactPoint {
    /// World-space point midway between the two surfaces
    pub position: Vec2,
    /// Unit normal from A to B
    pub normal: Vec2,
    /// Signed distance between the surfaces (negative = penetrating)
    pub separation: f32,
    /// Generating features
    pub feature: FeatureId,
}

/// Up to [`MAX_CONTACT_POINTS`] contact points for one pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContactPoints {
    points: [ContactPoint; MAX_CONTACT_POINTS],
    count: usize,
}

impl ContactPoints {
    #[inline]
    fn push(&mut self, point: ContactPoint) {
        debug_assert!(self.count < MAX_CONTACT_POINTS);
        if self.count < MAX_CONTACT_POINTS {
            self.points[self.count] = point;
            self.count += 1;
        }
    }

    fn flip(mut self) -> Self {
        for p in &mut self.points[..self.count] {
            p.normal = -p.normal;
            p.feature = p.feature.swapped();
        }
        self
    }

    /// Generated points.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[ContactPoint] {
        &self.points[..self.count]
    }

    /// Number of points.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// `true` if the shapes are not touching.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Generate contacts between two bodies at their current poses.
#[must_use]
pub fn collide(a: &RigidBody, b: &RigidBody) -> ContactPoints {
    let xf_a = a.transform();
    let xf_b = b.transform();
    match (a.shape(), b.shape()) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(xf_a.position, *ra, xf_b.position, *rb)
        }
        (Shape::Polygon(pa), Shape::Circle { radius: rb }) => {
            polygon_circle(pa, &xf_a, xf_b.position, *rb)
        }
        (Shape::Circle { radius: ra }, Shape::Polygon(pb)) => {
            polygon_circle(pb, &xf_b, xf_a.position, *ra).flip()
        }
        (Shape::Polygon(pa), Shape::Polygon(pb)) => polygon_polygon(pa, &xf_a, pb, &xf_b),
    }
}

// ============================================================================
// Circle vs circle
// ============================================================================

/// Circle vs circle. Coincident centers fall back to a +Y normal.
#[must_use]
pub fn circle_circle(center_a: Vec2, radius_a: f32, center_b: Vec2, radius_b: f32) -> ContactPoints {
    let mut out = ContactPoints::default();
    let d = center_b - center_a;
    let dist_sq = d.length_squared();
    let r = radius_a + radius_b;
    if dist_sq > r * r {
        return out;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > f32::EPSILON { d / dist } else { Vec2::UNIT_Y };
    let surface_a = center_a + normal * radius_a;
    let surface_b = center_b - normal * radius_b;
    out.push(ContactPoint {
        position: (surface_a + surface_b) * 0.5,
        normal,
        separation: dist - r,
        feature: FeatureId::default(),
    });
    out
}

// ============================================================================
// Polygon vs circle
// ============================================================================

/// Polygon (A) vs circle (B), normal from the polygon toward the circle.
#[must_use]
pub fn polygon_circle(poly: &Polygon, xf: &Transform, center: Vec2, radius: f32) -> ContactPoints {
    let mut out = ContactPoints::default();
    let c = xf.apply_inv(center);
    let verts = poly.vertices();
    let normals = poly.normals();
    let n = verts.len();

    // Face of maximum separation
    let mut face = 0;
    let mut separation = f32::MIN;
    for i in 0..n {
        let s = normals[i].dot(c - verts[i]);
        if s > radius {
            return out;
        }
        if s > separation {
            separation = s;
            face = i;
        }
    }

    let v1 = verts[face];
    let v2 = verts[(face + 1) % n];

    // (local normal, distance from the polygon surface to the center, feature)
    let (normal, dist, kind, index) = if separation < f32::EPSILON {
        // Center inside the polygon
        (normals[face], separation, FeatureKind::Face, face)
    } else if (c - v1).dot(v2 - v1) <= 0.0 {
        let d = c - v1;
        if d.length_squared() > radius * radius {
            return out;
        }
        (d.normalize(), d.length(), FeatureKind::Vertex, face)
    } else if (c - v2).dot(v1 - v2) <= 0.0 {
        let d = c - v2;
        if d.length_squared() > radius * radius {
            return out;
        }
        (d.normalize(), d.length(), FeatureKind::Vertex, (face + 1) % n)
    } else {
        let s = (c - (v1 + v2) * 0.5).dot(normals[face]);
        if s > radius {
            return out;
        }
        (normals[face], s, FeatureKind::Face, face)
    };

    let surface_a = c - normal * dist;
    let surface_b = c - normal * radius;
    out.push(ContactPoint {
        position: xf.apply((surface_a + surface_b) * 0.5),
        normal: xf.rot.apply(normal),
        separation: dist - radius,
        feature: FeatureId::new(index as u8, 0, kind, FeatureKind::Vertex),
    });
    out
}

// ============================================================================
// Polygon vs polygon
// ============================================================================

/// Polygon with vertices and normals already in world space.
struct WorldPolygon {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
}

impl WorldPolygon {
    fn new(poly: &Polygon, xf: &Transform) -> Self {
        let mut out = Self {
            vertices: [Vec2::ZERO; MAX_POLYGON_VERTICES],
            normals: [Vec2::ZERO; MAX_POLYGON_VERTICES],
            count: poly.len(),
        };
        for (i, (v, n)) in poly.vertices().iter().zip(poly.normals()).enumerate() {
            out.vertices[i] = xf.apply(*v);
            out.normals[i] = xf.rot.apply(*n);
        }
        out
    }

    #[inline]
    fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    #[inline]
    fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }
}

/// Edge of `p1` whose normal separates the polygons the most, and that separation.
fn find_max_separation(p1: &WorldPolygon, p2: &WorldPolygon) -> (usize, f32) {
    let mut best_index = 0;
    let mut max_separation = f32::MIN;
    for (i, (n, v1)) in p1.normals().iter().zip(p1.vertices()).enumerate() {
        let si = p2
            .vertices()
            .iter()
            .map(|v2| n.dot(*v2 - *v1))
            .fold(f32::MAX, f32::min);
        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

#[derive(Clone, Copy, Debug)]
struct ClipVertex {
    v: Vec2,
    /// (index_a, index_b, kind_a, kind_b) in reference/incident order
    id: (u8, u8, FeatureKind, FeatureKind),
}

/// Incident edge of `inc`: the edge most anti-parallel to the reference normal.
fn find_incident_edge(ref_poly: &WorldPolygon, edge: usize, inc: &WorldPolygon) -> [ClipVertex; 2] {
    let normal = ref_poly.normals[edge];
    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in inc.normals().iter().enumerate() {
        let dot = normal.dot(*n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }
    let i1 = index;
    let i2 = (index + 1) % inc.count;
    [
        ClipVertex {
            v: inc.vertices[i1],
            id: (edge as u8, i1 as u8, FeatureKind::Face, FeatureKind::Vertex),
        },
        ClipVertex {
            v: inc.vertices[i2],
            id: (edge as u8, i2 as u8, FeatureKind::Face, FeatureKind::Vertex),
        },
    ]
}

/// Sutherland-Hodgman clip of a segment against the half-plane `normal·x <= offset`.
fn clip_segment_to_line(
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index: usize,
) -> Option<[ClipVertex; 2]> {
    let mut out = [input[0]; 2];
    let mut count = 0;

    let d0 = normal.dot(input[0].v) - offset;
    let d1 = normal.dot(input[1].v) - offset;

    if d0 <= 0.0 {
        out[count] = input[0];
        count += 1;
    }
    if d1 <= 0.0 {
        out[count] = input[1];
        count += 1;
    }

    if d0 * d1 < 0.0 && count < 2 {
        let t = d0 / (d0 - d1);
        out[count] = ClipVertex {
            v: input[0].v + (input[1].v - input[0].v) * t,
            id: (
                vertex_index as u8,
                input[0].id.1,
                FeatureKind::Vertex,
                FeatureKind::Face,
            ),
        };
        count += 1;
    }

    (count == 2).then_some(out)
}

/// Convex polygon vs convex polygon.
#[must_use]
pub fn polygon_polygon(
    poly_a: &Polygon,
    xf_a: &Transform,
    poly_b: &Polygon,
    xf_b: &Transform,
) -> ContactPoints {
    let mut out = ContactPoints::default();
    let a = WorldPolygon::new(poly_a, xf_a);
    let b = WorldPolygon::new(poly_b, xf_b);

    let (edge_a, separation_a) = find_max_separation(&a, &b);
    if separation_a > 0.0 {
        return out;
    }
    let (edge_b, separation_b) = find_max_separation(&b, &a);
    if separation_b > 0.0 {
        return out;
    }

    let (ref_poly, inc_poly, edge, flip) =
        if separation_b > separation_a + REFERENCE_FACE_TOLERANCE {
            (&b, &a, edge_b, true)
        } else {
            (&a, &b, edge_a, false)
        };

    let incident = find_incident_edge(ref_poly, edge, inc_poly);

    let iv1 = edge;
    let iv2 = (edge + 1) % ref_poly.count;
    let v11 = ref_poly.vertices[iv1];
    let v12 = ref_poly.vertices[iv2];

    let tangent = (v12 - v11).normalize();
    let normal = cross_vs(tangent, 1.0);
    let front_offset = normal.dot(v11);
    let side_offset1 = -tangent.dot(v11);
    let side_offset2 = tangent.dot(v12);

    let Some(clip1) = clip_segment_to_line(&incident, -tangent, side_offset1, iv1) else {
        return out;
    };
    let Some(clip2) = clip_segment_to_line(&clip1, tangent, side_offset2, iv2) else {
        return out;
    };

    for cv in &clip2 {
        let separation = normal.dot(cv.v) - front_offset;
        if separation > 0.0 {
            continue;
        }
        let (ia, ib, ka, kb) = cv.id;
        let feature = if flip {
            FeatureId::new(ib, ia, kb, ka)
        } else {
            FeatureId::new(ia, ib, ka, kb)
        };
        out.push(ContactPoint {
            position: cv.v - normal * (0.5 * separation),
            normal: if flip { -normal } else { normal },
            separation,
            feature,
        });
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
