//! Ray-plane intersection (closed-form).

use slimtrace_math::{Vec2, Vec3};

use super::{facing, record, SurfaceHit};
use crate::ray::Ray;
use crate::scene::Plane;

/// Tangent and bitangent spanning a plane with unit normal `normal`.
pub fn plane_basis(normal: &Vec3) -> (Vec3, Vec3) {
    let helper = if normal.y.abs() < 0.999 { Vec3::y() } else { Vec3::x() };
    let tangent = helper.cross(normal).normalize();
    let bitangent = normal.cross(&tangent);
    (tangent, bitangent)
}

/// Intersect a ray with a plane.
///
/// Returns `None` if the ray is parallel to the plane or meets it behind the
/// origin. UVs tile with period one along the plane basis.
pub fn intersect_plane(ray: &Ray, plane: &Plane) -> Option<SurfaceHit> {
    let denom = ray.direction.dot(&plane.normal);
    if denom.abs() < 1e-6 {
        return None;
    }

    let t = (plane.position - ray.origin).dot(&plane.normal) / denom;
    if t <= 0.0 {
        return None;
    }

    let local = ray.at(t) - plane.position;
    let (tangent, bitangent) = plane_basis(&plane.normal);
    let u = local.dot(&tangent);
    let v = local.dot(&bitangent);

    Some(SurfaceHit {
        t,
        normal: facing(plane.normal, &ray.direction),
        uv: Vec2::new(u - u.floor(), v - v.floor()),
    })
}

/// Test every plane. Planes have no mask and are always candidates.
pub fn hit_planes(planes: &[Plane], ray: &mut Ray) -> bool {
    let mut found = false;
    for plane in planes {
        if let Some(hit) = intersect_plane(ray, plane) {
            found |= record(ray, &hit, plane.material_id);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor() -> Plane {
        Plane {
            position: Vec3::zeros(),
            normal: Vec3::y(),
            material_id: 0,
        }
    }

    #[test]
    fn test_ray_plane_perpendicular() {
        let origin = Vec3::new(0.25, 5.0, 0.5);
        let ray = Ray::new(&origin, -Vec3::y());
        let hit = intersect_plane(&ray, &floor()).unwrap();
        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, Vec3::y());
        assert!(hit.uv.x >= 0.0 && hit.uv.x < 1.0);
        assert!(hit.uv.y >= 0.0 && hit.uv.y < 1.0);
    }

    #[test]
    fn test_ray_plane_from_below_flips_normal() {
        let origin = Vec3::new(0.0, -2.0, 0.0);
        let ray = Ray::new(&origin, Vec3::y());
        let hit = intersect_plane(&ray, &floor()).unwrap();
        assert_relative_eq!(hit.normal, -Vec3::y());
    }

    #[test]
    fn test_ray_plane_parallel() {
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(&origin, Vec3::x());
        assert!(intersect_plane(&ray, &floor()).is_none());
    }

    #[test]
    fn test_ray_plane_behind() {
        let origin = Vec3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(&origin, Vec3::y());
        assert!(intersect_plane(&ray, &floor()).is_none());
    }

    #[test]
    fn test_ray_plane_angled() {
        let origin = Vec3::new(0.0, 10.0, 0.0);
        let ray = Ray::new(&origin, Vec3::new(1.0, -1.0, 0.0));
        let hit = intersect_plane(&ray, &floor()).unwrap();
        assert_relative_eq!(hit.t, 10.0 * 2.0_f32.sqrt(), epsilon = 1e-4);
    }

    #[test]
    fn test_basis_is_orthonormal() {
        for n in [Vec3::y(), Vec3::x(), Vec3::new(0.3, 0.4, -0.5).normalize()] {
            let (t, b) = plane_basis(&n);
            assert_relative_eq!(t.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(t.dot(&n), 0.0, epsilon = 1e-6);
            assert_relative_eq!(b.dot(&t), 0.0, epsilon = 1e-6);
        }
    }
}
