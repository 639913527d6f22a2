//! Ray-sphere intersection (quadratic equation).

use std::f32::consts::PI;

use slimtrace_math::{Vec2, Vec3};

use super::{facing, record, SurfaceHit};
use crate::masks::bit;
use crate::ray::Ray;
use crate::scene::{Sphere, MAX_GEOMETRY_PER_TYPE};

/// Intersect a ray with a sphere.
///
/// Returns the nearest intersection in front of the origin; from inside the
/// sphere that is the exit point.
pub fn intersect_sphere(ray: &Ray, sphere: &Sphere) -> Option<SurfaceHit> {
    let oc = ray.origin - sphere.center;

    // Unit direction: |oc + t*d|^2 = r^2 reduces to t^2 + 2bt + c = 0
    let b = oc.dot(&ray.direction);
    let c = oc.dot(&oc) - sphere.radius * sphere.radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let mut t = -b - sqrt_disc;
    if t <= 0.0 {
        t = -b + sqrt_disc;
    }
    if t <= 0.0 {
        return None;
    }

    let outward = (ray.at(t) - sphere.center) / sphere.radius;
    Some(SurfaceHit {
        t,
        normal: facing(outward, &ray.direction),
        uv: sphere_uv(&outward),
    })
}

/// Longitude and latitude of a unit outward normal, scaled to `[0, 1]`.
fn sphere_uv(n: &Vec3) -> Vec2 {
    let u = 0.5 + n.z.atan2(n.x) / (2.0 * PI);
    let v = 0.5 - n.y.clamp(-1.0, 1.0).asin() / PI;
    Vec2::new(u, v)
}

/// Test the spheres whose bit is set in `mask`.
///
/// Only the first [`MAX_GEOMETRY_PER_TYPE`] entries are addressable.
pub fn hit_spheres(spheres: &[Sphere], mask: u8, ray: &mut Ray) -> bool {
    let mut found = false;
    for (i, sphere) in spheres.iter().enumerate().take(MAX_GEOMETRY_PER_TYPE) {
        if mask & bit(i) == 0 {
            continue;
        }
        if let Some(hit) = intersect_sphere(ray, sphere) {
            found |= record(ray, &hit, sphere.material_id);
        }
    }
    found
}
