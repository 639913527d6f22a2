//! Primary ray tracing for a single pixel.

use crate::intersect::{hit_cubes, hit_planes, hit_spheres, hit_tetrahedra};
use crate::masks::Masks;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::ssb::ScreenSpaceBounds;

/// Resolve the nearest hit of the primary ray through pixel `(x, y)`.
///
/// Planes are always tested. Cubes, spheres and tetrahedra are tested only
/// where both the global visibility mask and the pixel's screen-space mask
/// have their bit set. Returns whether anything was hit.
#[inline]
pub fn trace_primary_ray(
    ray: &mut Ray,
    scene: &Scene,
    ssb: &ScreenSpaceBounds,
    masks: &Masks,
    x: u16,
    y: u16,
) -> bool {
    ray.reset();
    let mask = masks.visibility.and(&ssb.pixel_mask(x, y));

    let mut found = hit_planes(&scene.planes, ray);
    if mask.cubes != 0 {
        found |= hit_cubes(scene.cubes(), mask.cubes, ray);
    }
    if mask.spheres != 0 {
        found |= hit_spheres(scene.spheres(), mask.spheres, ray);
    }
    if mask.tetrahedra != 0 {
        found |= hit_tetrahedra(scene.tetrahedra(), mask.tetrahedra, ray);
    }
    found
}
