//! Ray-tetrahedron intersection (Möller-Trumbore per face).

use slimtrace_math::Vec2;

use super::{facing, record, SurfaceHit};
use crate::masks::bit;
use crate::ray::Ray;
use crate::scene::{Tetrahedron, MAX_GEOMETRY_PER_TYPE};

/// Intersect a ray with the four faces of a tetrahedron.
///
/// UVs are the barycentric coordinates on the face that was hit.
pub fn intersect_tetrahedron(ray: &Ray, tetrahedron: &Tetrahedron) -> Option<SurfaceHit> {
    let mut best: Option<SurfaceHit> = None;

    for face in Tetrahedron::FACES {
        let v0 = tetrahedron.vertices[face[0]];
        let e1 = tetrahedron.vertices[face[1]] - v0;
        let e2 = tetrahedron.vertices[face[2]] - v0;

        let p = ray.direction.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < 1e-8 {
            continue;
        }
        let inv_det = 1.0 / det;

        let s = ray.origin - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            continue;
        }
        let q = s.cross(&e1);
        let v = ray.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            continue;
        }
        let t = e2.dot(&q) * inv_det;
        if t <= 0.0 || best.is_some_and(|b| t >= b.t) {
            continue;
        }

        best = Some(SurfaceHit {
            t,
            normal: facing(e1.cross(&e2).normalize(), &ray.direction),
            uv: Vec2::new(u, v),
        });
    }

    best
}

/// Test the tetrahedra whose bit is set in `mask`.
pub fn hit_tetrahedra(tetrahedra: &[Tetrahedron], mask: u8, ray: &mut Ray) -> bool {
    let mut found = false;
    for (i, tetrahedron) in tetrahedra.iter().enumerate().take(MAX_GEOMETRY_PER_TYPE) {
        if mask & bit(i) == 0 {
            continue;
        }
        if let Some(hit) = intersect_tetrahedron(ray, tetrahedron) {
            found |= record(ray, &hit, tetrahedron.material_id);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use slimtrace_math::Vec3;

    /// Corner at the origin with legs along the axes, shifted to z = 5.
    fn corner() -> Tetrahedron {
        let o = Vec3::new(0.0, 0.0, 5.0);
        Tetrahedron {
            vertices: [o, o + Vec3::x(), o + Vec3::y(), o + Vec3::z()],
            material_id: 0,
            casts_shadow: true,
        }
    }

    #[test]
    fn test_hits_base_face() {
        let origin = Vec3::new(0.25, 0.25, 0.0);
        let ray = Ray::new(&origin, Vec3::z());
        let hit = intersect_tetrahedron(&ray, &corner()).unwrap();
        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-5);
        assert_relative_eq!(hit.normal, -Vec3::z(), epsilon = 1e-5);
        assert!(hit.uv.x >= 0.0 && hit.uv.y >= 0.0 && hit.uv.x + hit.uv.y <= 1.0);
    }

    #[test]
    fn test_hits_slanted_face_from_outside() {
        let origin = Vec3::new(2.0, 0.2, 5.2);
        let ray = Ray::new(&origin, -Vec3::x());
        let hit = intersect_tetrahedron(&ray, &corner()).unwrap();
        // Slanted face x + y + z' = 1 at y = 0.2, z' = 0.2 gives x = 0.6.
        assert_relative_eq!(hit.t, 1.4, epsilon = 1e-5);
        assert!(hit.normal.x > 0.0);
    }

    #[test]
    fn test_miss() {
        let origin = Vec3::new(0.9, 0.9, 0.0);
        let ray = Ray::new(&origin, Vec3::z());
        assert!(intersect_tetrahedron(&ray, &corner()).is_none());
    }

    #[test]
    fn test_regular_tetrahedron_hit_from_any_axis() {
        let tet = Tetrahedron::regular(Vec3::zeros(), 1.0, 0);
        for dir in [Vec3::x(), -Vec3::x(), Vec3::y(), -Vec3::y(), Vec3::z(), -Vec3::z()] {
            let origin = -dir * 5.0;
            let ray = Ray::new(&origin, dir);
            let hit = intersect_tetrahedron(&ray, &tet).unwrap();
            assert!(hit.t > 4.0 && hit.t < 5.0);
            assert!(hit.normal.dot(&dir) < 0.0);
        }
    }
}
