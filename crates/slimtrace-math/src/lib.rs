#![warn(missing_docs)]

//! Math types for the slimtrace renderer.
//!
//! Thin wrappers around nalgebra providing single-precision vectors,
//! rotation matrices and axis-aligned boxes. Everything is `f32` so that the
//! CPU path performs the same arithmetic as the WGSL kernel.

use nalgebra::{Matrix3, Vector2, Vector3};

/// A point or vector in 3D space.
pub type Vec3 = Vector3<f32>;

/// A 2D vector (texture coordinates, screen positions).
pub type Vec2 = Vector2<f32>;

/// A 3x3 matrix, used for rotations.
pub type Mat3 = Matrix3<f32>;

/// Linear RGB color with components nominally in `[0, 1]`.
pub type Color = Vector3<f32>;

/// Small distance used to offset secondary rays and reject grazing hits.
pub const EPSILON: f32 = 0.0001;

/// Clamp a scalar to `[0, 1]`.
#[inline]
pub fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Component-wise reciprocal.
///
/// Zero components map to signed infinity, which the slab test relies on.
#[inline]
pub fn reciprocal(v: &Vec3) -> Vec3 {
    Vec3::new(1.0 / v.x, 1.0 / v.y, 1.0 / v.z)
}

/// Rotation about the X axis by `angle` radians.
pub fn rotation_x(angle: f32) -> Mat3 {
    let (s, c) = angle.sin_cos();
    Mat3::new(
        1.0, 0.0, 0.0, //
        0.0, c, -s, //
        0.0, s, c,
    )
}

/// Rotation about the Y axis by `angle` radians.
pub fn rotation_y(angle: f32) -> Mat3 {
    let (s, c) = angle.sin_cos();
    Mat3::new(
        c, 0.0, s, //
        0.0, 1.0, 0.0, //
        -s, 0.0, c,
    )
}

/// Build an orthonormal basis whose columns are right, up and forward.
///
/// Returns `None` when `forward` is degenerate or parallel to `up`.
pub fn basis_from_forward(forward: &Vec3, up: &Vec3) -> Option<Mat3> {
    let f = forward.try_normalize(1e-12)?;
    let r = up.cross(&f).try_normalize(1e-12)?;
    let u = f.cross(&r);
    Some(Mat3::from_columns(&[r, u, f]))
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Box of half-size `extent` around `center`.
    pub fn around(center: &Vec3, extent: f32) -> Self {
        let e = Vec3::repeat(extent);
        Self::new(center - e, center + e)
    }

    /// Whether no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Vec3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Expand this AABB to include another box.
    pub fn include_aabb(&mut self, other: &Aabb3) {
        if other.is_empty() {
            return;
        }
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Center of the box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area, zero for empty boxes.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.extent();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// The eight corners, indexed by bit pattern `zyx` (bit set = max side).
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::zeros(); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
        }
        corners
    }

    /// The twelve edges as pairs of corner indices into [`Aabb3::corners`].
    pub const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (2, 3),
        (4, 5),
        (6, 7),
        (0, 2),
        (1, 3),
        (4, 6),
        (5, 7),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}
