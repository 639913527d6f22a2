//! Scene data: primitive geometry, materials, lights and transform nodes.
//!
//! The renderer only reads a [`Scene`]; populating one is the job of the
//! application. Masked geometry is only reachable through `add_*` and
//! [`Scene::move_geometry`], which enforce the per-type capacity of the 8-bit
//! masks and keep every node on its geometry's center.

use std::fmt;

use slimtrace_math::{Aabb3, Color, Vec3};

use crate::error::SceneError;

/// Maximum number of cubes, spheres or tetrahedra in a scene.
///
/// Each masked geometry type gets one bit per instance in a `u8` mask.
pub const MAX_GEOMETRY_PER_TYPE: usize = 8;

/// Geometry types that are addressed by mask bits.
///
/// Planes are always candidates for primary rays and have no kind here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Axis-aligned cube.
    Cube,
    /// Sphere.
    Sphere,
    /// Tetrahedron.
    Tetrahedron,
}

impl GeometryKind {
    /// All masked kinds, in the order the tracer tests them.
    pub const ALL: [GeometryKind; 3] = [Self::Cube, Self::Sphere, Self::Tetrahedron];

    /// Numeric tag shared with the GPU buffers.
    pub fn tag(self) -> u32 {
        match self {
            Self::Cube => 0,
            Self::Sphere => 1,
            Self::Tetrahedron => 2,
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cube => "cubes",
            Self::Sphere => "spheres",
            Self::Tetrahedron => "tetrahedra",
        })
    }
}

/// Surface material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Diffuse albedo.
    pub diffuse_color: Color,
    /// Scale applied to the lambert term.
    pub diffuse_intensity: f32,
    /// Whether light passes through objects using this material.
    pub uses_transparency: bool,
}

impl Material {
    /// Opaque lambert material.
    pub fn diffuse(color: Color) -> Self {
        Self {
            diffuse_color: color,
            diffuse_intensity: 1.0,
            uses_transparency: false,
        }
    }

    /// Transparent material.
    pub fn transparent(color: Color) -> Self {
        Self {
            uses_transparency: true,
            ..Self::diffuse(color)
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::repeat(1.0))
    }
}

/// Omnidirectional light with inverse-square falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World-space position.
    pub position: Vec3,
    /// Light color.
    pub color: Color,
    /// Intensity scale.
    pub intensity: f32,
}

/// Constant light added to every lit surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    /// Ambient color.
    pub color: Color,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::repeat(0.02),
        }
    }
}

/// Transform node owning one geometry instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// World-space position, the center of the owned geometry.
    pub position: Vec3,
    /// Kind of the owned geometry.
    pub kind: GeometryKind,
    /// Index of the owned geometry within its type's array.
    pub index: usize,
}

/// Infinite plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Any point on the plane.
    pub position: Vec3,
    /// Unit normal.
    pub normal: Vec3,
    /// Index into [`Scene::materials`].
    pub material_id: usize,
}

/// Axis-aligned cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cube {
    /// World-space center.
    pub center: Vec3,
    /// Half of the edge length.
    pub half_size: f32,
    /// Index into [`Scene::materials`].
    pub material_id: usize,
    /// Whether the cube blocks light in beauty shading.
    pub casts_shadow: bool,
}

impl Cube {
    /// Shadow-casting cube.
    pub fn new(center: Vec3, half_size: f32, material_id: usize) -> Self {
        Self {
            center,
            half_size,
            material_id,
            casts_shadow: true,
        }
    }
}

/// Sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// World-space center.
    pub center: Vec3,
    /// Radius.
    pub radius: f32,
    /// Index into [`Scene::materials`].
    pub material_id: usize,
    /// Whether the sphere blocks light in beauty shading.
    pub casts_shadow: bool,
}

impl Sphere {
    /// Shadow-casting sphere.
    pub fn new(center: Vec3, radius: f32, material_id: usize) -> Self {
        Self {
            center,
            radius,
            material_id,
            casts_shadow: true,
        }
    }
}

/// Tetrahedron given by its four corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tetrahedron {
    /// World-space corners.
    pub vertices: [Vec3; 4],
    /// Index into [`Scene::materials`].
    pub material_id: usize,
    /// Whether the tetrahedron blocks light in beauty shading.
    pub casts_shadow: bool,
}

impl Tetrahedron {
    /// Corner indices of the four triangular faces. Winding is not
    /// significant; intersection orients normals towards the ray.
    pub const FACES: [[usize; 3]; 4] = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];

    /// Regular tetrahedron with circumradius `radius` around `center`.
    pub fn regular(center: Vec3, radius: f32, material_id: usize) -> Self {
        let s = radius / 3.0_f32.sqrt();
        let vertices = [
            center + Vec3::new(s, s, s),
            center + Vec3::new(s, -s, -s),
            center + Vec3::new(-s, s, -s),
            center + Vec3::new(-s, -s, s),
        ];
        Self {
            vertices,
            material_id,
            casts_shadow: true,
        }
    }

    /// Average of the corners.
    pub fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2] + self.vertices[3]) * 0.25
    }

    /// Distance from the centroid to the farthest corner.
    pub fn circumradius(&self) -> f32 {
        let c = self.centroid();
        self.vertices
            .iter()
            .map(|v| (v - c).norm())
            .fold(0.0, f32::max)
    }
}

/// Per-type back-references from geometry instances to their nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeIds {
    /// Node index of each cube.
    pub cubes: Vec<usize>,
    /// Node index of each sphere.
    pub spheres: Vec<usize>,
    /// Node index of each tetrahedron.
    pub tetrahedra: Vec<usize>,
}

impl NodeIds {
    /// Node indices for one geometry kind.
    pub fn of(&self, kind: GeometryKind) -> &[usize] {
        match kind {
            GeometryKind::Cube => &self.cubes,
            GeometryKind::Sphere => &self.spheres,
            GeometryKind::Tetrahedron => &self.tetrahedra,
        }
    }

    fn of_mut(&mut self, kind: GeometryKind) -> &mut Vec<usize> {
        match kind {
            GeometryKind::Cube => &mut self.cubes,
            GeometryKind::Sphere => &mut self.spheres,
            GeometryKind::Tetrahedron => &mut self.tetrahedra,
        }
    }
}

/// Everything the renderer draws.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Infinite planes; always tested by primary rays.
    pub planes: Vec<Plane>,
    cubes: Vec<Cube>,
    spheres: Vec<Sphere>,
    tetrahedra: Vec<Tetrahedron>,
    /// Material table indexed by `material_id`.
    pub materials: Vec<Material>,
    /// Point lights.
    pub point_lights: Vec<PointLight>,
    /// Ambient light.
    pub ambient_light: AmbientLight,
    nodes: Vec<Node>,
    node_ids: NodeIds,
}

impl Scene {
    /// Empty scene with the given material table.
    pub fn new(materials: Vec<Material>) -> Self {
        Self {
            materials,
            ..Self::default()
        }
    }

    /// Append a material and return its id.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Append a point light.
    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    /// Append a plane and return its index.
    pub fn add_plane(&mut self, plane: Plane) -> Result<usize, SceneError> {
        self.check_material(plane.material_id)?;
        self.planes.push(Plane {
            normal: plane.normal.normalize(),
            ..plane
        });
        Ok(self.planes.len() - 1)
    }

    /// Append a cube and return its index.
    pub fn add_cube(&mut self, cube: Cube) -> Result<usize, SceneError> {
        self.check_material(cube.material_id)?;
        let index = self.reserve_node(GeometryKind::Cube, cube.center)?;
        self.cubes.push(cube);
        Ok(index)
    }

    /// Append a sphere and return its index.
    pub fn add_sphere(&mut self, sphere: Sphere) -> Result<usize, SceneError> {
        self.check_material(sphere.material_id)?;
        let index = self.reserve_node(GeometryKind::Sphere, sphere.center)?;
        self.spheres.push(sphere);
        Ok(index)
    }

    /// Append a tetrahedron and return its index.
    pub fn add_tetrahedron(&mut self, tetrahedron: Tetrahedron) -> Result<usize, SceneError> {
        self.check_material(tetrahedron.material_id)?;
        let index = self.reserve_node(GeometryKind::Tetrahedron, tetrahedron.centroid())?;
        self.tetrahedra.push(tetrahedron);
        Ok(index)
    }

    /// Cubes, at most [`MAX_GEOMETRY_PER_TYPE`].
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    /// Spheres, at most [`MAX_GEOMETRY_PER_TYPE`].
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    /// Tetrahedra, at most [`MAX_GEOMETRY_PER_TYPE`].
    pub fn tetrahedra(&self) -> &[Tetrahedron] {
        &self.tetrahedra
    }

    /// Transform nodes, one per masked geometry instance.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Back-references from geometry to nodes.
    pub fn node_ids(&self) -> &NodeIds {
        &self.node_ids
    }

    /// Number of instances of a geometry kind.
    pub fn count(&self, kind: GeometryKind) -> usize {
        match kind {
            GeometryKind::Cube => self.cubes.len(),
            GeometryKind::Sphere => self.spheres.len(),
            GeometryKind::Tetrahedron => self.tetrahedra.len(),
        }
    }

    /// Material id of an instance.
    pub fn material_id(&self, kind: GeometryKind, index: usize) -> usize {
        match kind {
            GeometryKind::Cube => self.cubes[index].material_id,
            GeometryKind::Sphere => self.spheres[index].material_id,
            GeometryKind::Tetrahedron => self.tetrahedra[index].material_id,
        }
    }

    /// Whether an instance blocks light.
    pub fn casts_shadow(&self, kind: GeometryKind, index: usize) -> bool {
        match kind {
            GeometryKind::Cube => self.cubes[index].casts_shadow,
            GeometryKind::Sphere => self.spheres[index].casts_shadow,
            GeometryKind::Tetrahedron => self.tetrahedra[index].casts_shadow,
        }
    }

    /// Radius of a sphere around the instance's node position that
    /// encloses the whole instance.
    pub fn bounding_radius(&self, kind: GeometryKind, index: usize) -> f32 {
        match kind {
            GeometryKind::Cube => self.cubes[index].half_size * 3.0_f32.sqrt(),
            GeometryKind::Sphere => self.spheres[index].radius,
            GeometryKind::Tetrahedron => self.tetrahedra[index].circumradius(),
        }
    }

    /// World-space bounding box of an instance.
    pub fn aabb(&self, kind: GeometryKind, index: usize) -> Aabb3 {
        match kind {
            GeometryKind::Cube => {
                let cube = &self.cubes[index];
                Aabb3::around(&cube.center, cube.half_size)
            }
            GeometryKind::Sphere => {
                let sphere = &self.spheres[index];
                Aabb3::around(&sphere.center, sphere.radius)
            }
            GeometryKind::Tetrahedron => {
                let mut aabb = Aabb3::empty();
                for v in &self.tetrahedra[index].vertices {
                    aabb.include_point(v);
                }
                aabb
            }
        }
    }

    /// Node that owns an instance.
    pub fn node(&self, kind: GeometryKind, index: usize) -> &Node {
        &self.nodes[self.node_ids.of(kind)[index]]
    }

    /// Move an instance so that its node sits at `position`.
    ///
    /// Callers must follow up with `RayTracer::on_scene_changed` before the
    /// next frame.
    pub fn move_geometry(&mut self, kind: GeometryKind, index: usize, position: Vec3) {
        let node_id = self.node_ids.of(kind)[index];
        let offset = position - self.nodes[node_id].position;
        self.nodes[node_id].position = position;
        match kind {
            GeometryKind::Cube => self.cubes[index].center += offset,
            GeometryKind::Sphere => self.spheres[index].center += offset,
            GeometryKind::Tetrahedron => {
                for v in &mut self.tetrahedra[index].vertices {
                    *v += offset;
                }
            }
        }
    }

    /// Change whether an instance blocks light.
    ///
    /// Takes effect on the next `RayTracer::on_scene_changed`.
    pub fn set_casts_shadow(&mut self, kind: GeometryKind, index: usize, casts_shadow: bool) {
        match kind {
            GeometryKind::Cube => self.cubes[index].casts_shadow = casts_shadow,
            GeometryKind::Sphere => self.spheres[index].casts_shadow = casts_shadow,
            GeometryKind::Tetrahedron => self.tetrahedra[index].casts_shadow = casts_shadow,
        }
    }

    /// Change the material of an instance.
    ///
    /// Takes effect on the next `RayTracer::on_scene_changed`.
    pub fn set_material_id(
        &mut self,
        kind: GeometryKind,
        index: usize,
        material_id: usize,
    ) -> Result<(), SceneError> {
        self.check_material(material_id)?;
        match kind {
            GeometryKind::Cube => self.cubes[index].material_id = material_id,
            GeometryKind::Sphere => self.spheres[index].material_id = material_id,
            GeometryKind::Tetrahedron => self.tetrahedra[index].material_id = material_id,
        }
        Ok(())
    }

    fn check_material(&self, material_id: usize) -> Result<(), SceneError> {
        if material_id >= self.materials.len() {
            return Err(SceneError::UnknownMaterial {
                material_id,
                count: self.materials.len(),
            });
        }
        Ok(())
    }

    fn reserve_node(&mut self, kind: GeometryKind, position: Vec3) -> Result<usize, SceneError> {
        let index = self.count(kind);
        if index >= MAX_GEOMETRY_PER_TYPE {
            return Err(SceneError::CapacityExceeded {
                kind,
                max: MAX_GEOMETRY_PER_TYPE,
            });
        }
        self.nodes.push(Node {
            position,
            kind,
            index,
        });
        let node_id = self.nodes.len() - 1;
        self.node_ids.of_mut(kind).push(node_id);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scene() -> Scene {
        Scene::new(vec![Material::default()])
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut scene = scene();
        for i in 0..MAX_GEOMETRY_PER_TYPE {
            let idx = scene
                .add_sphere(Sphere::new(Vec3::new(i as f32, 0.0, 0.0), 0.5, 0))
                .unwrap();
            assert_eq!(idx, i);
        }
        let err = scene
            .add_sphere(Sphere::new(Vec3::zeros(), 0.5, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::CapacityExceeded {
                kind: GeometryKind::Sphere,
                max: MAX_GEOMETRY_PER_TYPE
            }
        ));
        assert_eq!(scene.spheres().len(), MAX_GEOMETRY_PER_TYPE);
        assert_eq!(scene.nodes().len(), MAX_GEOMETRY_PER_TYPE);

        // Other kinds have their own budget.
        assert!(scene.add_cube(Cube::new(Vec3::zeros(), 1.0, 0)).is_ok());
    }

    #[test]
    fn test_unknown_material_is_rejected() {
        let mut scene = scene();
        let err = scene.add_cube(Cube::new(Vec3::zeros(), 1.0, 3)).unwrap_err();
        assert!(matches!(err, SceneError::UnknownMaterial { material_id: 3, count: 1 }));
        assert!(scene.nodes().is_empty());

        scene.add_cube(Cube::new(Vec3::zeros(), 1.0, 0)).unwrap();
        let err = scene.set_material_id(GeometryKind::Cube, 0, 5).unwrap_err();
        assert!(matches!(err, SceneError::UnknownMaterial { material_id: 5, .. }));
        assert_eq!(scene.material_id(GeometryKind::Cube, 0), 0);
    }

    #[test]
    fn test_node_back_references() {
        let mut scene = scene();
        scene.add_cube(Cube::new(Vec3::new(1.0, 0.0, 0.0), 1.0, 0)).unwrap();
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 2.0, 0.0), 1.0, 0)).unwrap();
        scene
            .add_tetrahedron(Tetrahedron::regular(Vec3::new(0.0, 0.0, 3.0), 1.0, 0))
            .unwrap();

        assert_eq!(scene.node(GeometryKind::Cube, 0).position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.node(GeometryKind::Sphere, 0).kind, GeometryKind::Sphere);
        let tet_node = scene.node(GeometryKind::Tetrahedron, 0);
        assert_relative_eq!(tet_node.position, Vec3::new(0.0, 0.0, 3.0), epsilon = 1e-6);
    }

    #[test]
    fn test_regular_tetrahedron() {
        let tet = Tetrahedron::regular(Vec3::new(1.0, 2.0, 3.0), 2.0, 0);
        assert_relative_eq!(tet.centroid(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
        assert_relative_eq!(tet.circumradius(), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_move_geometry_keeps_node_in_sync() {
        let mut scene = scene();
        scene
            .add_tetrahedron(Tetrahedron::regular(Vec3::zeros(), 1.0, 0))
            .unwrap();
        scene.move_geometry(GeometryKind::Tetrahedron, 0, Vec3::new(0.0, 5.0, 0.0));
        assert_relative_eq!(
            scene.tetrahedra()[0].centroid(),
            scene.node(GeometryKind::Tetrahedron, 0).position,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_move_geometry_moves_every_kind() {
        let mut scene = scene();
        scene.add_cube(Cube::new(Vec3::zeros(), 0.5, 0)).unwrap();
        scene.add_sphere(Sphere::new(Vec3::zeros(), 0.5, 0)).unwrap();
        let target = Vec3::new(1.0, -2.0, 7.0);
        scene.move_geometry(GeometryKind::Cube, 0, target);
        scene.move_geometry(GeometryKind::Sphere, 0, target);

        assert_eq!(scene.cubes()[0].center, target);
        assert_eq!(scene.spheres()[0].center, target);
        assert_eq!(scene.node(GeometryKind::Cube, 0).position, target);
        assert_eq!(scene.node(GeometryKind::Sphere, 0).position, target);
        assert_relative_eq!(scene.aabb(GeometryKind::Sphere, 0).centroid(), target);
    }
}
