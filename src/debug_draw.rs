//! Debug Visualization API
//!
//! Backend-agnostic wireframe output. Implement [`DebugDrawer`] for your
//! graphics layer, or collect a frame into [`DebugDrawData`] and render it
//! later.

use crate::aabb::Aabb;
use crate::math::Vec2;

/// RGBA color for debug rendering (0-255 per channel)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugColor {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl DebugColor {
    /// Create a new color
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Contact points
    pub const RED: Self = Self::new(255, 50, 50, 255);
    /// Dynamic bodies
    pub const GREEN: Self = Self::new(50, 255, 50, 255);
    /// Kinematic bodies
    pub const BLUE: Self = Self::new(50, 50, 255, 255);
    /// Contact normals
    pub const YELLOW: Self = Self::new(255, 255, 50, 255);
    /// Broadphase proxies
    pub const CYAN: Self = Self::new(50, 255, 255, 255);
    /// Static bodies
    pub const GRAY: Self = Self::new(128, 128, 128, 255);
}

/// Sink for wireframe primitives.
pub trait DebugDrawer {
    /// Draw a line segment.
    fn draw_line(&mut self, start: Vec2, end: Vec2, color: DebugColor);

    /// Draw a point marker.
    fn draw_point(&mut self, position: Vec2, size: f32, color: DebugColor);

    /// Draw an AABB outline (4 edges).
    fn draw_aabb(&mut self, aabb: &Aabb, color: DebugColor) {
        let (min, max) = (aabb.min, aabb.max);
        let corners = [
            min,
            Vec2::new(max.x, min.y),
            max,
            Vec2::new(min.x, max.y),
        ];
        for i in 0..4 {
            self.draw_line(corners[i], corners[(i + 1) % 4], color);
        }
    }

    /// Draw a circle outline as a segmented ring.
    fn draw_circle(&mut self, center: Vec2, radius: f32, color: DebugColor) {
        const SEGMENTS: usize = 16;
        let mut prev = center + Vec2::new(radius, 0.0);
        for i in 1..=SEGMENTS {
            let angle = core::f32::consts::TAU * i as f32 / SEGMENTS as f32;
            let (s, c) = angle.sin_cos();
            let point = center + Vec2::new(c, s) * radius;
            self.draw_line(prev, point, color);
            prev = point;
        }
    }
}

/// A debug line segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugLine {
    /// Start point
    pub start: Vec2,
    /// End point
    pub end: Vec2,
    /// Color
    pub color: DebugColor,
}

/// A debug point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DebugPoint {
    /// Position
    pub position: Vec2,
    /// Size (for rendering)
    pub size: f32,
    /// Color
    pub color: DebugColor,
}

/// Collected debug geometry for a frame
#[derive(Clone, Debug, Default)]
pub struct DebugDrawData {
    /// Line segments to draw
    pub lines: Vec<DebugLine>,
    /// Points to draw
    pub points: Vec<DebugPoint>,
}

impl DebugDrawData {
    /// Create empty draw data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all geometry
    pub fn clear(&mut self) {
        self.lines.clear();
        self.points.clear();
    }

    /// Total primitive count
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.lines.len() + self.points.len()
    }
}

impl DebugDrawer for DebugDrawData {
    #[inline]
    fn draw_line(&mut self, start: Vec2, end: Vec2, color: DebugColor) {
        self.lines.push(DebugLine { start, end, color });
    }

    #[inline]
    fn draw_point(&mut self, position: Vec2, size: f32, color: DebugColor) {
        self.points.push(DebugPoint {
            position,
            size,
            color,
        });
    }
}
