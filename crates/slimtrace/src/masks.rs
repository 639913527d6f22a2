//! Per-geometry-type bitmasks.
//!
//! Every masked geometry type gets a `u8` per mask, bit `i` addressing
//! instance `i`. Static masks are computed once from scene properties;
//! the effective visibility mask is refreshed on every camera move from the
//! screen-space bounds.

use crate::frame::Dimensions;
use crate::scene::{GeometryKind, Scene, MAX_GEOMETRY_PER_TYPE};
use crate::ssb::ScreenSpaceBounds;

/// One `u8` per masked geometry type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GeometryMasks {
    /// Cube bits.
    pub cubes: u8,
    /// Sphere bits.
    pub spheres: u8,
    /// Tetrahedron bits.
    pub tetrahedra: u8,
}

impl GeometryMasks {
    /// All bits of every type set.
    pub const FULL: Self = Self {
        cubes: 0xFF,
        spheres: 0xFF,
        tetrahedra: 0xFF,
    };

    /// Bits of one type.
    #[inline]
    pub fn get(&self, kind: GeometryKind) -> u8 {
        match kind {
            GeometryKind::Cube => self.cubes,
            GeometryKind::Sphere => self.spheres,
            GeometryKind::Tetrahedron => self.tetrahedra,
        }
    }

    /// Mutable bits of one type.
    #[inline]
    pub fn get_mut(&mut self, kind: GeometryKind) -> &mut u8 {
        match kind {
            GeometryKind::Cube => &mut self.cubes,
            GeometryKind::Sphere => &mut self.spheres,
            GeometryKind::Tetrahedron => &mut self.tetrahedra,
        }
    }

    /// Whether instance `index` of `kind` is set.
    #[inline]
    pub fn contains(&self, kind: GeometryKind, index: usize) -> bool {
        self.get(kind) & bit(index) != 0
    }

    /// Bitwise AND per type.
    #[inline]
    pub fn and(&self, other: &Self) -> Self {
        Self {
            cubes: self.cubes & other.cubes,
            spheres: self.spheres & other.spheres,
            tetrahedra: self.tetrahedra & other.tetrahedra,
        }
    }

    /// Bitwise AND with the complement of `other`.
    #[inline]
    pub fn without(&self, other: &Self) -> Self {
        Self {
            cubes: self.cubes & !other.cubes,
            spheres: self.spheres & !other.spheres,
            tetrahedra: self.tetrahedra & !other.tetrahedra,
        }
    }

    /// Whether any bit is set.
    #[inline]
    pub fn any(&self) -> bool {
        (self.cubes | self.spheres | self.tetrahedra) != 0
    }

    /// Pack into one word as `cubes | spheres << 8 | tetrahedra << 16`,
    /// the layout the GPU kernel unpacks.
    pub fn pack(&self) -> u32 {
        u32::from(self.cubes) | u32::from(self.spheres) << 8 | u32::from(self.tetrahedra) << 16
    }
}

/// The three masks consulted by tracing and shading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Masks {
    /// Eligible for primary rays under the current camera.
    pub visibility: GeometryMasks,
    /// Blocks light in beauty shading.
    pub shadowing: GeometryMasks,
    /// Material uses transparency; fixed after init.
    pub transparency: GeometryMasks,
}

/// Mask bit of instance `index`.
#[inline]
pub fn bit(index: usize) -> u8 {
    debug_assert!(index < MAX_GEOMETRY_PER_TYPE);
    1u8 << index
}

/// Mask with the low `count` bits set.
#[inline]
pub fn full_mask(count: usize) -> u8 {
    if count >= MAX_GEOMETRY_PER_TYPE {
        0xFF
    } else {
        (1u8 << count) - 1
    }
}

/// Compute the static masks of a scene.
///
/// Visibility covers every instance, transparency mirrors the material
/// flag, and shadowing covers every instance whose `casts_shadow` override
/// is set.
pub fn init_scene_masks(scene: &Scene) -> Masks {
    let mut masks = Masks::default();
    for kind in GeometryKind::ALL {
        let count = scene.count(kind).min(MAX_GEOMETRY_PER_TYPE);
        let mut shadowing = 0u8;
        let mut transparency = 0u8;
        for i in 0..count {
            let material_id = scene.material_id(kind, i);
            if scene.materials[material_id].uses_transparency {
                transparency |= bit(i);
            }
            if scene.casts_shadow(kind, i) {
                shadowing |= bit(i);
            }
        }
        *masks.visibility.get_mut(kind) = full_mask(count);
        *masks.shadowing.get_mut(kind) = shadowing;
        *masks.transparency.get_mut(kind) = transparency;
    }
    masks
}

/// Refresh the effective masks for the current camera.
///
/// Recomputes the screen-space bounds from the cached view positions and
/// keeps a visibility bit only for objects whose bounds reach the viewport.
pub fn update_scene_masks(
    scene: &Scene,
    ssb: &mut ScreenSpaceBounds,
    static_masks: &Masks,
    masks: &mut Masks,
    focal_length: f32,
    dims: &Dimensions,
) {
    let on_screen = ssb.update_bounds(scene, focal_length, dims);
    masks.visibility = static_masks.visibility.and(&on_screen);
    masks.shadowing = static_masks.shadowing;
    masks.transparency = static_masks.transparency;
}
