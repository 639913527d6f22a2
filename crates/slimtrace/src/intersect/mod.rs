//! Ray-primitive intersection algorithms.
//!
//! Each primitive has a closed-form intersector returning a [`SurfaceHit`],
//! and a `hit_*` routine that runs it over a whole geometry array and folds
//! the results into the ray's hit record with closest-hit semantics.

mod cube;
mod plane;
mod sphere;
mod tetrahedron;

pub use cube::{hit_cubes, intersect_cube};
pub use plane::{hit_planes, intersect_plane, plane_basis};
pub use sphere::{hit_spheres, intersect_sphere};
pub use tetrahedron::{hit_tetrahedra, intersect_tetrahedron};

use slimtrace_math::{Vec2, Vec3};

use crate::ray::Ray;
use crate::scene::{GeometryKind, Scene};

/// Result of a ray-primitive intersection, before it is committed to the
/// ray's hit record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    /// Distance along the ray.
    pub t: f32,
    /// Unit normal facing the ray origin's side.
    pub normal: Vec3,
    /// Surface coordinates in `[0, 1]`.
    pub uv: Vec2,
}

/// Intersect a ray with one masked instance.
pub fn intersect_geometry(
    ray: &Ray,
    scene: &Scene,
    kind: GeometryKind,
    index: usize,
) -> Option<SurfaceHit> {
    match kind {
        GeometryKind::Cube => intersect_cube(ray, &scene.cubes()[index]),
        GeometryKind::Sphere => intersect_sphere(ray, &scene.spheres()[index]),
        GeometryKind::Tetrahedron => intersect_tetrahedron(ray, &scene.tetrahedra()[index]),
    }
}

/// Commit `hit` if it is strictly closer than the current record.
#[inline]
pub(crate) fn record(ray: &mut Ray, hit: &SurfaceHit, material_id: usize) -> bool {
    if hit.t >= ray.hit.distance {
        return false;
    }
    ray.hit.position = ray.at(hit.t);
    ray.hit.normal = hit.normal;
    ray.hit.uv = hit.uv;
    ray.hit.distance = hit.t;
    ray.hit.material_id = material_id;
    true
}

/// Flip `normal` to the side the ray arrives from.
#[inline]
pub(crate) fn facing(normal: Vec3, direction: &Vec3) -> Vec3 {
    if normal.dot(direction) > 0.0 {
        -normal
    } else {
        normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Cube, Material, Sphere, Tetrahedron};
    use approx::assert_relative_eq;

    fn row_scene() -> Scene {
        let mut scene = Scene::new(vec![Material::default(); 3]);
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 4.0), 1.0, 0)).unwrap();
        scene.add_cube(Cube::new(Vec3::new(0.0, 0.0, 8.0), 1.0, 1)).unwrap();
        scene
            .add_tetrahedron(Tetrahedron::regular(Vec3::new(0.0, 0.0, 12.0), 1.0, 2))
            .unwrap();
        scene
    }

    #[test]
    fn test_closest_hit_is_order_independent() {
        let scene = row_scene();
        let origin = Vec3::zeros();

        let mut forward = Ray::new(&origin, Vec3::z());
        hit_spheres(scene.spheres(), 0xFF, &mut forward);
        hit_cubes(scene.cubes(), 0xFF, &mut forward);
        hit_tetrahedra(scene.tetrahedra(), 0xFF, &mut forward);

        let mut backward = Ray::new(&origin, Vec3::z());
        hit_tetrahedra(scene.tetrahedra(), 0xFF, &mut backward);
        hit_cubes(scene.cubes(), 0xFF, &mut backward);
        hit_spheres(scene.spheres(), 0xFF, &mut backward);

        assert_eq!(forward.hit, backward.hit);
        assert_relative_eq!(forward.hit.distance, 3.0, epsilon = 1e-5);
        assert_eq!(forward.hit.material_id, 0);
    }

    #[test]
    fn test_record_requires_strictly_closer() {
        let origin = Vec3::zeros();
        let mut ray = Ray::new(&origin, Vec3::z());
        let hit = SurfaceHit {
            t: 2.0,
            normal: -Vec3::z(),
            uv: Vec2::new(0.5, 0.5),
        };
        assert!(record(&mut ray, &hit, 1));
        assert!(!record(&mut ray, &hit, 2));
        assert_eq!(ray.hit.material_id, 1);
        assert_relative_eq!(ray.hit.position, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_dispatch_by_kind() {
        let scene = row_scene();
        let origin = Vec3::zeros();
        let ray = Ray::new(&origin, Vec3::z());
        let cube = intersect_geometry(&ray, &scene, GeometryKind::Cube, 0).unwrap();
        assert_relative_eq!(cube.t, 7.0, epsilon = 1e-5);
        let tet = intersect_geometry(&ray, &scene, GeometryKind::Tetrahedron, 0);
        assert!(tet.is_some());
    }

    #[test]
    fn test_facing_flips_towards_origin() {
        let d = Vec3::z();
        assert_eq!(facing(Vec3::z(), &d), -Vec3::z());
        assert_eq!(facing(-Vec3::z(), &d), -Vec3::z());
    }
}
