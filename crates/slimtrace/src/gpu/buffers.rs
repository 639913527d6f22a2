//! Host-side packing of a frame into GPU buffer layouts.
//!
//! Every struct here mirrors a WGSL struct in `raytrace.wgsl` and is
//! uploaded with `bytemuck`.

use bytemuck::{Pod, Zeroable};
use slimtrace_math::Vec3;

use crate::bvh::GeometryRef;
use crate::render::FrameContext;
use crate::scene::{GeometryKind, MAX_GEOMETRY_PER_TYPE};

/// Per-frame constants.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct FrameUniforms {
    /// Camera position, `w` unused.
    pub origin: [f32; 4],
    /// Ambient light color, `w` unused.
    pub ambient: [f32; 4],
    /// Active width in pixels.
    pub width: u32,
    /// Active height in pixels.
    pub height: u32,
    /// Render mode tag.
    pub mode: u32,
    /// Number of planes.
    pub plane_count: u32,
    /// Number of cubes.
    pub cube_count: u32,
    /// Number of spheres.
    pub sphere_count: u32,
    /// Number of tetrahedra.
    pub tetrahedron_count: u32,
    /// Number of point lights.
    pub light_count: u32,
    /// Number of BVH nodes.
    pub node_count: u32,
    /// Packed effective visibility mask.
    pub visibility: u32,
    /// Packed shadowing mask.
    pub shadowing: u32,
    /// Packed transparency mask.
    pub transparency: u32,
}

/// One primitive as four `vec4`s.
///
/// - plane: `a = (position, material)`, `b = (normal, 0)`
/// - cube: `a = (center, half_size)`, `b.x = material`
/// - sphere: `a = (center, radius)`, `b.x = material`
/// - tetrahedron: `a..d` are the vertices, `a.w = material`
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct GpuPrimitive {
    /// First word.
    pub a: [f32; 4],
    /// Second word.
    pub b: [f32; 4],
    /// Third word.
    pub c: [f32; 4],
    /// Fourth word.
    pub d: [f32; 4],
}

/// Point light.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct GpuLight {
    /// Position and intensity.
    pub position: [f32; 4],
    /// Color, `w` unused.
    pub color: [f32; 4],
}

/// Flattened BVH node.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct GpuBvhNode {
    /// Box minimum, `w` unused.
    pub min: [f32; 4],
    /// Box maximum, `w` unused.
    pub max: [f32; 4],
    /// Left child or first reference.
    pub left_or_first: u32,
    /// Right child or reference count.
    pub right_or_count: u32,
    /// Non-zero for leaves.
    pub is_leaf: u32,
    /// Padding.
    pub _pad: u32,
}

/// Bounds slot of an off-screen instance; `left > right` never contains a pixel.
pub const OFF_SCREEN: [u32; 4] = [1, 0, 1, 0];

/// All per-frame buffers except directions and output.
#[derive(Debug, Clone)]
pub struct GpuFrame {
    /// Uniform block.
    pub uniforms: FrameUniforms,
    /// Planes, cubes, spheres and tetrahedra, in that order.
    pub primitives: Vec<GpuPrimitive>,
    /// Material table as `(diffuse color, intensity)`.
    pub materials: Vec<[f32; 4]>,
    /// Point lights.
    pub lights: Vec<GpuLight>,
    /// Screen-space bounds as `(left, right, top, bottom)`, one slot per
    /// possible instance, indexed by `kind * 8 + index`.
    pub bounds: Vec<[u32; 4]>,
    /// BVH nodes.
    pub nodes: Vec<GpuBvhNode>,
    /// Leaf references as `kind << 8 | index`.
    pub refs: Vec<u32>,
}

fn vec4(v: &Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

/// Encode a leaf reference.
pub fn pack_ref(geometry: &GeometryRef) -> u32 {
    geometry.kind.tag() << 8 | geometry.index as u32
}

impl GpuFrame {
    /// Pack everything the kernel reads from a frame context.
    pub fn pack(frame: &FrameContext<'_>) -> Self {
        let scene = frame.scene;
        let mut primitives = Vec::with_capacity(
            scene.planes.len() + scene.cubes().len() + scene.spheres().len() + scene.tetrahedra().len(),
        );
        primitives.extend(scene.planes.iter().map(|p| GpuPrimitive {
            a: vec4(&p.position, p.material_id as f32),
            b: vec4(&p.normal, 0.0),
            ..Default::default()
        }));
        primitives.extend(scene.cubes().iter().map(|c| GpuPrimitive {
            a: vec4(&c.center, c.half_size),
            b: [c.material_id as f32, 0.0, 0.0, 0.0],
            ..Default::default()
        }));
        primitives.extend(scene.spheres().iter().map(|s| GpuPrimitive {
            a: vec4(&s.center, s.radius),
            b: [s.material_id as f32, 0.0, 0.0, 0.0],
            ..Default::default()
        }));
        primitives.extend(scene.tetrahedra().iter().map(|t| GpuPrimitive {
            a: vec4(&t.vertices[0], t.material_id as f32),
            b: vec4(&t.vertices[1], 0.0),
            c: vec4(&t.vertices[2], 0.0),
            d: vec4(&t.vertices[3], 0.0),
        }));

        let materials = scene
            .materials
            .iter()
            .map(|m| vec4(&m.diffuse_color, m.diffuse_intensity))
            .collect();
        let lights: Vec<GpuLight> = scene
            .point_lights
            .iter()
            .map(|l| GpuLight {
                position: vec4(&l.position, l.intensity),
                color: vec4(&l.color, 0.0),
            })
            .collect();

        let mut bounds = vec![OFF_SCREEN; GeometryKind::ALL.len() * MAX_GEOMETRY_PER_TYPE];
        for kind in GeometryKind::ALL {
            for i in 0..scene.count(kind).min(MAX_GEOMETRY_PER_TYPE) {
                if let Some(b) = frame.ssb.bounds(kind, i) {
                    bounds[kind.tag() as usize * MAX_GEOMETRY_PER_TYPE + i] = [
                        u32::from(b.left),
                        u32::from(b.right),
                        u32::from(b.top),
                        u32::from(b.bottom),
                    ];
                }
            }
        }

        let (bvh_nodes, bvh_refs) = frame.bvh.flatten();
        let nodes: Vec<GpuBvhNode> = bvh_nodes
            .iter()
            .map(|n| GpuBvhNode {
                min: vec4(&n.aabb.min, 0.0),
                max: vec4(&n.aabb.max, 0.0),
                left_or_first: n.left_or_first,
                right_or_count: n.right_or_count,
                is_leaf: u32::from(n.is_leaf),
                _pad: 0,
            })
            .collect();
        let refs = bvh_refs.iter().map(pack_ref).collect();

        let uniforms = FrameUniforms {
            origin: vec4(frame.origin, 0.0),
            ambient: vec4(&scene.ambient_light.color, 0.0),
            width: u32::from(frame.dimensions.width),
            height: u32::from(frame.dimensions.height),
            mode: frame.mode.tag(),
            plane_count: scene.planes.len() as u32,
            cube_count: scene.cubes().len().min(MAX_GEOMETRY_PER_TYPE) as u32,
            sphere_count: scene.spheres().len().min(MAX_GEOMETRY_PER_TYPE) as u32,
            tetrahedron_count: scene.tetrahedra().len().min(MAX_GEOMETRY_PER_TYPE) as u32,
            light_count: lights.len() as u32,
            node_count: nodes.len() as u32,
            visibility: frame.masks.visibility.pack(),
            shadowing: frame.masks.shadowing.pack(),
            transparency: frame.masks.transparency.pack(),
        };

        Self {
            uniforms,
            primitives,
            materials,
            lights,
            bounds,
            nodes,
            refs,
        }
    }
}

/// Directions as `vec4`s for upload; the kernel derives reciprocals.
pub fn pack_directions(directions: &[Vec3]) -> Vec<[f32; 4]> {
    directions.iter().map(|d| vec4(d, 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::Bvh;
    use crate::camera::Camera;
    use crate::directions::RayDirectionCache;
    use crate::frame::Dimensions;
    use crate::masks::{init_scene_masks, update_scene_masks};
    use crate::scene::{Cube, Material, Plane, Scene, Sphere, Tetrahedron};
    use crate::shade::RenderMode;
    use crate::ssb::ScreenSpaceBounds;

    #[test]
    fn test_struct_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 80);
        assert_eq!(std::mem::size_of::<GpuPrimitive>(), 64);
        assert_eq!(std::mem::size_of::<GpuLight>(), 32);
        assert_eq!(std::mem::size_of::<GpuBvhNode>(), 48);
    }

    #[test]
    fn test_pack_frame() {
        let mut scene = Scene::new(vec![Material::default(); 3]);
        scene
            .add_plane(Plane {
                position: Vec3::new(0.0, -1.0, 0.0),
                normal: Vec3::y(),
                material_id: 2,
            })
            .unwrap();
        scene.add_cube(Cube::new(Vec3::new(1.0, 0.0, 6.0), 0.5, 1)).unwrap();
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, 0)).unwrap();
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 0)).unwrap();
        scene
            .add_tetrahedron(Tetrahedron::regular(Vec3::new(-1.0, 0.0, 6.0), 0.5, 1))
            .unwrap();

        let camera = Camera::new(Vec3::zeros(), 1.5);
        let dims = Dimensions::new(16, 12);
        let mut directions = RayDirectionCache::new(dims.pixel_count()).unwrap();
        directions.generate(&dims, &camera);
        let mut ssb = ScreenSpaceBounds::new();
        ssb.update_view_positions(&scene, &camera.transform);
        let static_masks = init_scene_masks(&scene);
        let mut masks = static_masks;
        update_scene_masks(&scene, &mut ssb, &static_masks, &mut masks, 1.5, &dims);
        let mut bvh = Bvh::new(4).unwrap();
        bvh.update(&scene);

        let frame = FrameContext {
            scene: &scene,
            origin: &camera.transform.position,
            directions: &directions,
            ssb: &ssb,
            bvh: &bvh,
            masks: &masks,
            dimensions: &dims,
            mode: RenderMode::Normals,
        };
        let packed = GpuFrame::pack(&frame);

        assert_eq!(packed.primitives.len(), 5);
        assert_eq!(packed.primitives[0].a[3], 2.0);
        assert_eq!(packed.primitives[1].a, [1.0, 0.0, 6.0, 0.5]);
        assert_eq!(packed.primitives[1].b[0], 1.0);
        assert_eq!(packed.primitives[4].a[3], 1.0);
        assert_eq!(packed.uniforms.mode, 2);
        assert_eq!(packed.uniforms.sphere_count, 2);
        // Only the sphere in front of the camera is visible.
        assert_eq!(packed.uniforms.visibility >> 8 & 0xFF, 0b01);
        assert_eq!(packed.bounds.len(), 24);
        assert_eq!(packed.bounds[MAX_GEOMETRY_PER_TYPE + 1], OFF_SCREEN);
        assert_ne!(packed.bounds[MAX_GEOMETRY_PER_TYPE], OFF_SCREEN);
        assert_eq!(packed.refs.len(), 4);
        assert_eq!(packed.nodes.len(), bvh.nodes().len());
    }

    #[test]
    fn test_pack_ref() {
        let r = GeometryRef {
            kind: GeometryKind::Tetrahedron,
            index: 5,
        };
        assert_eq!(pack_ref(&r), 0x205);
    }
}
