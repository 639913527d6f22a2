//! Per-pixel primary ray directions.

use slimtrace_math::{reciprocal, Vec3};

use crate::camera::Camera;
use crate::error::{try_alloc, Result};
use crate::frame::Dimensions;

/// World-space direction and reciprocal for every pixel.
///
/// Directions depend on resolution, focal length and camera rotation; they
/// must be regenerated whenever any of those changes and at no other time.
#[derive(Debug, Clone)]
pub struct RayDirectionCache {
    directions: Vec<Vec3>,
    directions_rcp: Vec<Vec3>,
    len: usize,
    generation: u64,
}

impl RayDirectionCache {
    /// Allocate storage for `capacity` pixels.
    pub fn new(capacity: usize) -> Result<Self> {
        Ok(Self {
            directions: try_alloc("ray directions", capacity, Vec3::z())?,
            directions_rcp: try_alloc("reciprocal ray directions", capacity, Vec3::z())?,
            len: 0,
            generation: 0,
        })
    }

    /// Recompute every direction for the active resolution.
    ///
    /// For pixel `(x, y)` the view-space direction is
    /// `normalize(sx, sy, focal_length)` with
    /// `sx = (2(x + 0.5) - W) / H` and `sy = (H - 2(y + 0.5)) / H`,
    /// rotated into world space by the camera rotation.
    pub fn generate(&mut self, dims: &Dimensions, camera: &Camera) {
        let len = dims.pixel_count().min(self.directions.len());
        let rotation = camera.transform.rotation;
        let focal_length = camera.focal_length;
        let width = usize::from(dims.width);
        let inv_height = 1.0 / dims.f_height;

        for (i, (dir, rcp)) in self.directions[..len]
            .iter_mut()
            .zip(&mut self.directions_rcp[..len])
            .enumerate()
        {
            let x = (i % width) as f32;
            let y = (i / width) as f32;
            let sx = (2.0 * (x + 0.5) - dims.f_width) * inv_height;
            let sy = (dims.f_height - 2.0 * (y + 0.5)) * inv_height;
            *dir = rotation * Vec3::new(sx, sy, focal_length).normalize();
            *rcp = reciprocal(dir);
        }

        self.len = len;
        self.generation += 1;
        tracing::trace!(pixels = len, generation = self.generation, "ray directions generated");
    }

    /// Directions of the active resolution, row-major.
    pub fn directions(&self) -> &[Vec3] {
        &self.directions[..self.len]
    }

    /// Reciprocal directions of the active resolution, row-major.
    pub fn directions_rcp(&self) -> &[Vec3] {
        &self.directions_rcp[..self.len]
    }

    /// Number of pixels covered by the last generation.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no directions have been generated yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated pixel capacity.
    pub fn capacity(&self) -> usize {
        self.directions.len()
    }

    /// Counter bumped on every regeneration; accelerator copies compare it to
    /// decide whether to re-upload.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
