//! Ray representation and the hit record.

use slimtrace_math::{reciprocal, Aabb3, Vec2, Vec3};

/// Distance reported by a ray that hit nothing.
pub const MAX_DISTANCE: f32 = 10_000.0;

/// Nearest intersection found so far along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space hit position.
    pub position: Vec3,
    /// Unit surface normal facing the ray origin's side.
    pub normal: Vec3,
    /// Surface parameter coordinates in `[0, 1]`.
    pub uv: Vec2,
    /// Distance along the (unit) ray direction.
    pub distance: f32,
    /// Material of the hit surface.
    pub material_id: usize,
}

impl RayHit {
    /// The miss sentinel: `MAX_DISTANCE` and `uv = (1, 1)`.
    pub fn miss() -> Self {
        Self {
            position: Vec3::zeros(),
            normal: Vec3::zeros(),
            uv: Vec2::new(1.0, 1.0),
            distance: MAX_DISTANCE,
            material_id: 0,
        }
    }

    /// Whether nothing was hit.
    #[inline]
    pub fn is_miss(&self) -> bool {
        self.distance >= MAX_DISTANCE
    }
}

impl Default for RayHit {
    fn default() -> Self {
        Self::miss()
    }
}

/// A ray with a borrowed origin and precomputed reciprocal direction.
///
/// Primary rays borrow their direction and reciprocal from the direction
/// cache; secondary rays build theirs with [`Ray::new`].
#[derive(Debug, Clone, Copy)]
pub struct Ray<'a> {
    /// Shared origin (the camera position for primary rays).
    pub origin: &'a Vec3,
    /// Unit direction.
    pub direction: Vec3,
    /// Per-component reciprocal of `direction`.
    pub direction_rcp: Vec3,
    /// Nearest hit so far.
    pub hit: RayHit,
}

impl<'a> Ray<'a> {
    /// Ray from cached direction data.
    #[inline]
    pub fn from_cache(origin: &'a Vec3, direction: Vec3, direction_rcp: Vec3) -> Self {
        Self {
            origin,
            direction,
            direction_rcp,
            hit: RayHit::miss(),
        }
    }

    /// Ray with the direction normalized and its reciprocal computed.
    pub fn new(origin: &'a Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize();
        Self::from_cache(origin, direction, reciprocal(&direction))
    }

    /// Reset the hit record to the miss sentinel.
    #[inline]
    pub fn reset(&mut self) {
        self.hit = RayHit::miss();
    }

    /// Evaluate the ray at distance `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns the entry and exit distances, with entry clamped to zero when
    /// the origin is inside the box.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f32, f32)> {
        slab(self.origin, &self.direction_rcp, &aabb.min, &aabb.max)
    }
}

/// Slab test against `[min, max]` with a precomputed reciprocal direction.
#[inline]
pub(crate) fn slab(origin: &Vec3, rcp: &Vec3, min: &Vec3, max: &Vec3) -> Option<(f32, f32)> {
    let t1 = (min - origin).component_mul(rcp);
    let t2 = (max - origin).component_mul(rcp);
    let t_min = t1.inf(&t2).max();
    let t_max = t1.sup(&t2).min();
    if t_max >= t_min && t_max >= 0.0 {
        Some((t_min.max(0.0), t_max))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb3 {
        Aabb3::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_miss_sentinel() {
        let hit = RayHit::miss();
        assert!(hit.is_miss());
        assert_eq!(hit.distance, MAX_DISTANCE);
        assert_eq!(hit.uv, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_ray_at() {
        let origin = Vec3::zeros();
        let ray = Ray::new(&origin, Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(ray.at(5.0), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_aabb_hit() {
        let origin = Vec3::new(-5.0, 0.5, 0.5);
        let ray = Ray::new(&origin, Vec3::new(1.0, 0.0, 0.0));
        let (t_min, t_max) = ray.intersect_aabb(&unit_box()).unwrap();
        assert_relative_eq!(t_min, 5.0, epsilon = 1e-5);
        assert_relative_eq!(t_max, 6.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ray_aabb_miss() {
        let origin = Vec3::new(-5.0, 5.0, 5.0);
        let ray = Ray::new(&origin, Vec3::new(1.0, 0.0, 0.0));
        assert!(ray.intersect_aabb(&unit_box()).is_none());
    }

    #[test]
    fn test_ray_inside_aabb() {
        let origin = Vec3::new(0.5, 0.5, 0.5);
        let ray = Ray::new(&origin, Vec3::new(1.0, 0.0, 0.0));
        let (t_min, t_max) = ray.intersect_aabb(&unit_box()).unwrap();
        assert_eq!(t_min, 0.0);
        assert_relative_eq!(t_max, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_ray_aabb_behind() {
        let origin = Vec3::new(-5.0, 0.5, 0.5);
        let ray = Ray::new(&origin, Vec3::new(-1.0, 0.0, 0.0));
        assert!(ray.intersect_aabb(&unit_box()).is_none());
    }

    #[test]
    fn test_reset_restores_sentinel() {
        let origin = Vec3::zeros();
        let mut ray = Ray::new(&origin, Vec3::z());
        ray.hit.distance = 3.0;
        ray.hit.material_id = 2;
        ray.reset();
        assert_eq!(ray.hit, RayHit::miss());
    }
}
