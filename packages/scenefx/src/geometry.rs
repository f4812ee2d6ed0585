//! Shared geometry: bounding boxes, triangles and uniform surface sampling.

use glam::{Vec2, Vec3};

use crate::rng::SeededRandom;

/// Triangles smaller than this (in world units squared) are treated as slivers.
pub const MIN_TRIANGLE_AREA: f32 = 0.001;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    /// An inverted box that any point expands.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    /// Compute the bounding box of a set of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand(*p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Center of the box, or the origin for an empty box.
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        self.max - self.min
    }

    /// Half the length of the box diagonal.
    pub fn radius(&self) -> f32 {
        self.size().length() * 0.5
    }
}

/// A world-space triangle with its area precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub area: f32,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let area = (v1 - v0).cross(v2 - v0).length() * 0.5;
        Self { v0, v1, v2, area }
    }

    /// Unit face normal from the winding order, or zero for degenerate triangles.
    pub fn normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize_or_zero()
    }

    pub fn centroid(&self) -> Vec3 {
        (self.v0 + self.v1 + self.v2) / 3.0
    }

    /// Uniformly distributed point inside the triangle.
    ///
    /// Draws two uniforms and reflects them around the diagonal when they fall
    /// outside the unit simplex, so points are not biased toward a corner.
    pub fn sample_point(&self, rng: &mut SeededRandom) -> Vec3 {
        let mut r1 = rng.next_f32();
        let mut r2 = rng.next_f32();
        if r1 + r2 > 1.0 {
            r1 = 1.0 - r1;
            r2 = 1.0 - r2;
        }
        let r3 = 1.0 - r1 - r2;
        self.v0 * r1 + self.v1 * r2 + self.v2 * r3
    }

    /// Height of the triangle at the vertical line through `xz`, if the line
    /// passes through it.
    pub fn height_at(&self, xz: Vec2) -> Option<f32> {
        let a = Vec2::new(self.v0.x, self.v0.z);
        let b = Vec2::new(self.v1.x, self.v1.z);
        let c = Vec2::new(self.v2.x, self.v2.z);

        let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if denom.abs() < 1e-12 {
            // Vertical triangle: no single height
            return None;
        }

        let w0 = ((b.y - c.y) * (xz.x - c.x) + (c.x - b.x) * (xz.y - c.y)) / denom;
        let w1 = ((c.y - a.y) * (xz.x - c.x) + (a.x - c.x) * (xz.y - c.y)) / denom;
        let w2 = 1.0 - w0 - w1;

        const EDGE_EPS: f32 = -1e-5;
        if w0 < EDGE_EPS || w1 < EDGE_EPS || w2 < EDGE_EPS {
            return None;
        }

        Some(self.v0.y * w0 + self.v1.y * w1 + self.v2.y * w2)
    }
}

/// Uniform point in a disk of `max_radius` around `center` on the XZ plane.
///
/// Uses `sqrt` of the radial draw so density is uniform by area rather than
/// clumping at the center.
pub fn sample_disk(rng: &mut SeededRandom, center: Vec2, max_radius: f32) -> Vec2 {
    let angle = rng.angle();
    let radius = rng.next_f32().sqrt() * max_radius;
    center + Vec2::new(angle.cos(), angle.sin()) * radius
}
