//! Camera transform and change notifications.
//!
//! The camera is owned by the application. Controllers mutate it through
//! [`Camera::translate`], [`Camera::turn`] and [`Camera::zoom`], which raise
//! the `moved`, `turned` and `zoomed` flags; the renderer's invalidation hooks
//! consume them. The renderer also owns the refresh of
//! [`Transform::rotation_inverted`], which is only brought up to date by
//! `RayTracer::on_turn`.

use slimtrace_math::{basis_from_forward, rotation_x, rotation_y, Mat3, Vec3};

/// Smallest focal length [`Camera::zoom`] allows.
pub const MIN_FOCAL_LENGTH: f32 = 0.1;

/// Position and orientation.
///
/// Rotation columns are the camera's right, up and forward axes
/// (left-handed: x right, y up, z forward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// World-space position.
    pub position: Vec3,
    /// View-to-world rotation.
    pub rotation: Mat3,
    /// World-to-view rotation, cached by the renderer.
    pub rotation_inverted: Mat3,
}

impl Transform {
    /// Transform at `position` with the given rotation.
    pub fn new(position: Vec3, rotation: Mat3) -> Self {
        Self {
            position,
            rotation,
            rotation_inverted: rotation.transpose(),
        }
    }

    /// Express a world-space point in view space using the cached inverse.
    #[inline]
    pub fn to_view(&self, world: &Vec3) -> Vec3 {
        self.rotation_inverted * (world - self.position)
    }
}

/// Pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Position and orientation.
    pub transform: Transform,
    /// Distance from the eye to the image plane, in units of half the
    /// image height.
    pub focal_length: f32,
    /// Position changed since the last refresh.
    pub moved: bool,
    /// Orientation changed since the last refresh.
    pub turned: bool,
    /// Focal length changed since the last refresh.
    pub zoomed: bool,
}

impl Camera {
    /// Camera at `position` looking down +z.
    pub fn new(position: Vec3, focal_length: f32) -> Self {
        Self {
            transform: Transform::new(position, Mat3::identity()),
            focal_length,
            moved: false,
            turned: false,
            zoomed: false,
        }
    }

    /// Camera at `position` looking at `target`.
    ///
    /// Uses +y as up, or +z when looking straight up or down.
    pub fn look_at(position: Vec3, target: Vec3, focal_length: f32) -> Self {
        let forward = target - position;
        let rotation = basis_from_forward(&forward, &Vec3::y())
            .or_else(|| basis_from_forward(&forward, &Vec3::z()))
            .unwrap_or_else(Mat3::identity);
        Self {
            transform: Transform::new(position, rotation),
            ..Self::new(position, focal_length)
        }
    }

    /// Translate in world space.
    pub fn translate(&mut self, delta: Vec3) {
        self.transform.position += delta;
        self.moved = true;
    }

    /// Translate along the camera's own axes.
    pub fn translate_local(&mut self, delta: Vec3) {
        let world = self.transform.rotation * delta;
        self.translate(world);
    }

    /// Yaw about world up, then pitch about the camera's right axis.
    pub fn turn(&mut self, yaw: f32, pitch: f32) {
        let rotation = rotation_y(yaw) * self.transform.rotation * rotation_x(pitch);
        self.transform.rotation = orthonormalize(&rotation);
        self.turned = true;
    }

    /// Change the focal length by `delta`.
    pub fn zoom(&mut self, delta: f32) {
        self.focal_length = (self.focal_length + delta).max(MIN_FOCAL_LENGTH);
        self.zoomed = true;
    }

    /// Whether any change notification is waiting to be consumed.
    pub fn has_pending_changes(&self) -> bool {
        self.moved || self.turned || self.zoomed
    }
}

/// Re-orthonormalize a rotation drifting from repeated multiplication.
fn orthonormalize(m: &Mat3) -> Mat3 {
    let forward = m.column(2).into_owned();
    let up = m.column(1).into_owned();
    basis_from_forward(&forward, &up).unwrap_or(*m)
}
