//! Screen-space bounds.
//!
//! Every masked instance is enclosed in a bounding sphere around its node
//! position. Its view-space center is cached on camera moves, and the exact
//! screen-space extent of the sphere is projected to a conservative pixel
//! rectangle. Primary rays only test objects whose rectangle covers the
//! pixel.

use slimtrace_math::Vec3;

use crate::camera::Transform;
use crate::frame::Dimensions;
use crate::masks::{bit, GeometryMasks};
use crate::scene::{GeometryKind, Scene, MAX_GEOMETRY_PER_TYPE};

/// View-space depth of the near clipping plane.
pub const NEAR: f32 = 0.01;

/// Inclusive pixel rectangle, clamped to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds2D {
    /// First covered column.
    pub left: u16,
    /// Last covered column.
    pub right: u16,
    /// First covered row.
    pub top: u16,
    /// Last covered row.
    pub bottom: u16,
}

impl Bounds2D {
    /// The whole viewport.
    pub fn full(dims: &Dimensions) -> Self {
        Self {
            left: 0,
            right: dims.width.saturating_sub(1),
            top: 0,
            bottom: dims.height.saturating_sub(1),
        }
    }

    /// Whether pixel `(x, y)` lies inside.
    #[inline]
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// Fixed-size storage with one slot per possible instance of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerKind<T> {
    /// Cube slots.
    pub cubes: [T; MAX_GEOMETRY_PER_TYPE],
    /// Sphere slots.
    pub spheres: [T; MAX_GEOMETRY_PER_TYPE],
    /// Tetrahedron slots.
    pub tetrahedra: [T; MAX_GEOMETRY_PER_TYPE],
}

impl<T> PerKind<T> {
    /// Slots of one kind.
    pub fn of(&self, kind: GeometryKind) -> &[T; MAX_GEOMETRY_PER_TYPE] {
        match kind {
            GeometryKind::Cube => &self.cubes,
            GeometryKind::Sphere => &self.spheres,
            GeometryKind::Tetrahedron => &self.tetrahedra,
        }
    }

    /// Mutable slots of one kind.
    pub fn of_mut(&mut self, kind: GeometryKind) -> &mut [T; MAX_GEOMETRY_PER_TYPE] {
        match kind {
            GeometryKind::Cube => &mut self.cubes,
            GeometryKind::Sphere => &mut self.spheres,
            GeometryKind::Tetrahedron => &mut self.tetrahedra,
        }
    }
}

/// Cached view positions and projected pixel bounds of every instance.
#[derive(Debug, Clone, Default)]
pub struct ScreenSpaceBounds {
    view_positions: PerKind<Vec3>,
    bounds: PerKind<Option<Bounds2D>>,
    on_screen: GeometryMasks,
}

impl ScreenSpaceBounds {
    /// Empty bounds; nothing is on screen until the first update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute view positions as `R⁻¹ (node.position − camera.position)`.
    pub fn update_view_positions(&mut self, scene: &Scene, transform: &Transform) {
        for kind in GeometryKind::ALL {
            let count = scene.count(kind).min(MAX_GEOMETRY_PER_TYPE);
            let slots = self.view_positions.of_mut(kind);
            for (i, slot) in slots.iter_mut().enumerate().take(count) {
                *slot = transform.to_view(&scene.node(kind, i).position);
            }
        }
    }

    /// Project every instance's bounding sphere and return the mask of
    /// instances that reach the viewport.
    pub fn update_bounds(
        &mut self,
        scene: &Scene,
        focal_length: f32,
        dims: &Dimensions,
    ) -> GeometryMasks {
        let mut on_screen = GeometryMasks::default();
        for kind in GeometryKind::ALL {
            let count = scene.count(kind).min(MAX_GEOMETRY_PER_TYPE);
            let positions = *self.view_positions.of(kind);
            let bounds = self.bounds.of_mut(kind);
            for (i, slot) in bounds.iter_mut().enumerate() {
                *slot = if i < count {
                    let radius = scene.bounding_radius(kind, i);
                    project_sphere(&positions[i], radius, focal_length, dims)
                } else {
                    None
                };
                if slot.is_some() {
                    *on_screen.get_mut(kind) |= bit(i);
                }
            }
        }
        self.on_screen = on_screen;
        on_screen
    }

    /// Instances whose bounds cover pixel `(x, y)`.
    pub fn pixel_mask(&self, x: u16, y: u16) -> GeometryMasks {
        let mut mask = GeometryMasks::default();
        for kind in GeometryKind::ALL {
            let mut bits = self.on_screen.get(kind);
            let bounds = self.bounds.of(kind);
            let mut kind_mask = 0u8;
            while bits != 0 {
                let i = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                if bounds[i].is_some_and(|b| b.contains(x, y)) {
                    kind_mask |= bit(i);
                }
            }
            *mask.get_mut(kind) = kind_mask;
        }
        mask
    }

    /// Cached view-space position of an instance.
    pub fn view_position(&self, kind: GeometryKind, index: usize) -> Vec3 {
        self.view_positions.of(kind)[index]
    }

    /// Pixel bounds of an instance, `None` when it is off screen.
    pub fn bounds(&self, kind: GeometryKind, index: usize) -> Option<Bounds2D> {
        self.bounds.of(kind)[index]
    }

    /// Instances with bounds from the last update.
    pub fn on_screen(&self) -> GeometryMasks {
        self.on_screen
    }
}

/// Screen-space interval `[min, max]` covered by a circle of radius `r`
/// centered at lateral offset `x` and depth `z`, with `z > r`.
fn tangent_extent(x: f32, z: f32, r: f32, focal_length: f32) -> (f32, f32) {
    let denom = z * z - r * r;
    let root = r * (x * x + denom).sqrt();
    let min = focal_length * (x * z - root) / denom;
    let max = focal_length * (x * z + root) / denom;
    (min, max)
}

/// Pixel bounds of a view-space sphere.
///
/// Spheres entirely behind the near plane return `None`; spheres straddling
/// it cover the whole viewport.
pub fn project_sphere(
    center: &Vec3,
    radius: f32,
    focal_length: f32,
    dims: &Dimensions,
) -> Option<Bounds2D> {
    if center.z + radius <= NEAR {
        return None;
    }
    if center.z - radius <= NEAR {
        return Some(Bounds2D::full(dims));
    }

    let (min_sx, max_sx) = tangent_extent(center.x, center.z, radius, focal_length);
    let (min_sy, max_sy) = tangent_extent(center.y, center.z, radius, focal_length);

    let left = (dims.h_width + min_sx * dims.h_height).floor();
    let right = (dims.h_width + max_sx * dims.h_height).ceil();
    let top = (dims.h_height - max_sy * dims.h_height).floor();
    let bottom = (dims.h_height - min_sy * dims.h_height).ceil();

    let last_x = dims.f_width - 1.0;
    let last_y = dims.f_height - 1.0;
    if right < 0.0 || bottom < 0.0 || left > last_x || top > last_y {
        return None;
    }

    Some(Bounds2D {
        left: left.max(0.0) as u16,
        right: right.min(last_x) as u16,
        top: top.max(0.0) as u16,
        bottom: bottom.min(last_y) as u16,
    })
}
