//! Shading functions and the render-mode dispatcher.
//!
//! Shaders are pure: they read the hit record and the scene and return a
//! linear color. Phong or Blinn terms and recursive reflection would slot in
//! as further [`RenderMode`] variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slimtrace_math::{Color, Vec2, Vec3, EPSILON};

use crate::bvh::Bvh;
use crate::masks::Masks;
use crate::ray::{Ray, RayHit};
use crate::scene::Scene;

/// Distance mapped to white in depth mode.
pub const DEPTH_RANGE: f32 = 64.0;

/// Which quantity a frame visualizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Lambert diffuse with shadows.
    #[default]
    Beauty,
    /// Hit distance as grayscale.
    Depth,
    /// Surface normal as color.
    Normals,
    /// Surface coordinates as color.
    Uvs,
}

impl RenderMode {
    /// Every mode, in tag order.
    pub const ALL: [RenderMode; 4] = [Self::Beauty, Self::Depth, Self::Normals, Self::Uvs];

    /// Numeric tag shared with the GPU kernel.
    pub fn tag(self) -> u32 {
        match self {
            Self::Beauty => 0,
            Self::Depth => 1,
            Self::Normals => 2,
            Self::Uvs => 3,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Beauty => "beauty",
            Self::Depth => "depth",
            Self::Normals => "normals",
            Self::Uvs => "uvs",
        })
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown render mode '{s}'"))
    }
}

/// Ambient plus lambert diffuse from every unshadowed point light.
///
/// Each light contributes `N·L / d²` scaled by its intensity and color and
/// by the material's diffuse color and intensity. A miss is black.
pub fn shade_lambert(hit: &RayHit, scene: &Scene, bvh: &Bvh, masks: &Masks) -> Color {
    if hit.is_miss() {
        return Color::zeros();
    }

    let material = &scene.materials[hit.material_id];
    let mut color = scene.ambient_light.color;
    let origin = hit.position + hit.normal * EPSILON;

    for light in &scene.point_lights {
        let to_light = light.position - hit.position;
        let distance_squared = to_light.norm_squared();
        let distance = distance_squared.sqrt();
        let direction = to_light / distance;

        let n_dot_l = hit.normal.dot(&direction);
        if n_dot_l <= 0.0 {
            continue;
        }

        let shadow_ray = Ray::new(&origin, direction);
        if bvh.occluded(&shadow_ray, distance, scene, &masks.shadowing, &masks.transparency) {
            continue;
        }

        let strength = n_dot_l / distance_squared * light.intensity * material.diffuse_intensity;
        color += light.color.component_mul(&material.diffuse_color) * strength;
    }

    color
}

/// Distance as grayscale, saturating at [`DEPTH_RANGE`]; a miss is white.
#[inline]
pub fn shade_depth(hit: &RayHit) -> Color {
    Color::repeat((hit.distance / DEPTH_RANGE).min(1.0))
}

/// Unit direction remapped from `[-1, 1]` to `[0, 1]`.
#[inline]
pub fn shade_direction(direction: &Vec3) -> Color {
    (direction + Vec3::repeat(1.0)) * 0.5
}

/// Surface coordinates as red and green.
#[inline]
pub fn shade_uv(uv: &Vec2) -> Color {
    Color::new(uv.x, uv.y, 0.0)
}

/// Shade a hit record with the function selected by `mode`.
#[inline]
pub fn shade(mode: RenderMode, hit: &RayHit, scene: &Scene, bvh: &Bvh, masks: &Masks) -> Color {
    match mode {
        RenderMode::Beauty => shade_lambert(hit, scene, bvh, masks),
        RenderMode::Depth => shade_depth(hit),
        RenderMode::Normals => shade_direction(&hit.normal),
        RenderMode::Uvs => shade_uv(&hit.uv),
    }
}
