//! Ray-cube intersection (slab method on the cube's bounds).

use slimtrace_math::{saturate, Vec2, Vec3};

use super::{facing, record, SurfaceHit};
use crate::masks::bit;
use crate::ray::Ray;
use crate::scene::{Cube, MAX_GEOMETRY_PER_TYPE};

/// Intersect a ray with an axis-aligned cube.
///
/// Uses the ray's cached reciprocal direction. From inside the cube the exit
/// face is reported. UVs span each face from corner to corner.
pub fn intersect_cube(ray: &Ray, cube: &Cube) -> Option<SurfaceHit> {
    let half = Vec3::repeat(cube.half_size);
    let t1 = (cube.center - half - ray.origin).component_mul(&ray.direction_rcp);
    let t2 = (cube.center + half - ray.origin).component_mul(&ray.direction_rcp);
    let t_near = t1.inf(&t2).max();
    let t_far = t1.sup(&t2).min();
    if t_far < t_near || t_far <= 0.0 {
        return None;
    }
    let t = if t_near > 0.0 { t_near } else { t_far };

    let local = (ray.at(t) - cube.center) / cube.half_size;
    let axis = local.iamax();
    let mut outward = Vec3::zeros();
    outward[axis] = local[axis].signum();

    let (a, b) = match axis {
        0 => (2, 1),
        1 => (0, 2),
        _ => (0, 1),
    };
    let uv = Vec2::new(
        saturate(0.5 * (local[a] + 1.0)),
        saturate(0.5 * (local[b] + 1.0)),
    );

    Some(SurfaceHit {
        t,
        normal: facing(outward, &ray.direction),
        uv,
    })
}

/// Test the cubes whose bit is set in `mask`.
pub fn hit_cubes(cubes: &[Cube], mask: u8, ray: &mut Ray) -> bool {
    let mut found = false;
    for (i, cube) in cubes.iter().enumerate().take(MAX_GEOMETRY_PER_TYPE) {
        if mask & bit(i) == 0 {
            continue;
        }
        if let Some(hit) = intersect_cube(ray, cube) {
            found |= record(ray, &hit, cube.material_id);
        }
    }
    found
}
