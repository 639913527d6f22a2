//! Frame invalidation hooks.
//!
//! Each camera or viewport change refreshes exactly the caches it affects:
//!
//! | event  | directions | inverse rotation | view positions + masks |
//! |--------|------------|------------------|------------------------|
//! | zoom   | yes        |                  | via `moved`            |
//! | turn   | yes        | yes              | via `moved`            |
//! | move   |            |                  | yes                    |
//! | resize | yes        |                  | yes                    |

use crate::camera::Camera;
use crate::error::{RenderError, Result};
use crate::frame::Dimensions;
use crate::masks::{init_scene_masks, update_scene_masks};
use crate::render::RayTracer;
use crate::scene::Scene;

impl RayTracer {
    /// Focal length changed: regenerate directions and mark the camera as
    /// moved so the bounds are reprojected.
    pub fn on_zoom(&mut self, camera: &mut Camera) {
        tracing::debug!(focal_length = camera.focal_length, "zoom");
        self.directions.generate(&self.dimensions, camera);
        camera.moved = true;
        camera.zoomed = false;
    }

    /// Orientation changed: refresh the cached inverse rotation and the
    /// directions, and mark the camera as moved.
    pub fn on_turn(&mut self, camera: &mut Camera) {
        tracing::debug!("turn");
        camera.transform.rotation_inverted = camera.transform.rotation.transpose();
        self.directions.generate(&self.dimensions, camera);
        camera.moved = true;
        camera.turned = false;
    }

    /// Position changed: recompute view positions and masks.
    pub fn on_move(&mut self, scene: &Scene, camera: &mut Camera) {
        tracing::debug!(position = ?camera.transform.position, "move");
        self.refresh_view(scene, camera);
        camera.moved = false;
    }

    /// Viewport changed: regenerate directions, then run [`RayTracer::on_move`].
    ///
    /// Fails if `dimensions` exceeds the resolution the caches were
    /// allocated for.
    pub fn on_resize(&mut self, scene: &Scene, camera: &mut Camera, dimensions: &Dimensions) -> Result<()> {
        tracing::debug!(width = dimensions.width, height = dimensions.height, "resize");
        self.set_dimensions(dimensions)?;
        self.directions.generate(&self.dimensions, camera);
        self.on_move(scene, camera);
        Ok(())
    }

    /// Settle every pending camera flag, in the order zoom, turn, move.
    pub fn apply_pending(&mut self, scene: &Scene, camera: &mut Camera) {
        if camera.zoomed {
            self.on_zoom(camera);
        }
        if camera.turned {
            self.on_turn(camera);
        }
        if camera.moved {
            self.on_move(scene, camera);
        }
    }

    /// Geometry, materials or shadow flags changed: rebuild the BVH and the
    /// static masks, then run [`RayTracer::on_move`].
    pub fn on_scene_changed(&mut self, scene: &Scene, camera: &mut Camera) {
        tracing::debug!(nodes = scene.nodes().len(), "scene changed");
        self.bvh.update(scene);
        self.static_masks = init_scene_masks(scene);
        self.on_move(scene, camera);
    }

    /// Resize path used by the renderer when it notices a new resolution;
    /// leaves the camera flags alone.
    pub(crate) fn refresh_resolution(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        dimensions: &Dimensions,
    ) -> Result<()> {
        self.set_dimensions(dimensions)?;
        self.directions.generate(&self.dimensions, camera);
        self.refresh_view(scene, camera);
        Ok(())
    }

    fn set_dimensions(&mut self, dimensions: &Dimensions) -> Result<()> {
        let max_width = self.settings.max_width;
        let max_height = self.settings.max_height;
        if dimensions.width == 0
            || dimensions.height == 0
            || dimensions.width > max_width
            || dimensions.height > max_height
        {
            return Err(RenderError::Resolution {
                width: dimensions.width,
                height: dimensions.height,
                max_width,
                max_height,
            });
        }
        self.dimensions = *dimensions;
        Ok(())
    }

    fn refresh_view(&mut self, scene: &Scene, camera: &Camera) {
        self.ssb.update_view_positions(scene, &camera.transform);
        update_scene_masks(
            scene,
            &mut self.ssb,
            &self.static_masks,
            &mut self.masks,
            camera.focal_length,
            &self.dimensions,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersect::{hit_cubes, hit_planes, hit_spheres, hit_tetrahedra};
    use crate::ray::Ray;
    use crate::scene::{Cube, GeometryKind, Material, Sphere, Tetrahedron};
    use crate::trace::trace_primary_ray;
    use crate::settings::RenderSettings;
    use approx::assert_relative_eq;
    use slimtrace_math::{Color, Vec3};

    fn scene() -> Scene {
        let mut scene = Scene::new(vec![
            Material::default(),
            Material::transparent(Color::repeat(0.5)),
        ]);
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 6.0), 1.0, 0)).unwrap();
        scene.add_sphere(Sphere::new(Vec3::new(3.0, 1.0, 9.0), 1.0, 1)).unwrap();
        scene.add_cube(Cube::new(Vec3::new(-2.0, 0.0, 7.0), 0.5, 1)).unwrap();
        scene
            .add_tetrahedron(Tetrahedron::regular(Vec3::new(0.0, 2.0, 8.0), 1.0, 0))
            .unwrap();
        scene
    }

    fn setup(scene: &Scene) -> (RayTracer, Camera) {
        let settings = RenderSettings {
            max_width: 40,
            max_height: 30,
            ..RenderSettings::default()
        };
        let mut tracer = RayTracer::init(scene, settings).unwrap();
        let mut camera = Camera::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), 1.5);
        tracer
            .on_resize(scene, &mut camera, &Dimensions::new(40, 30))
            .unwrap();
        (tracer, camera)
    }

    fn assert_view_positions(tracer: &RayTracer, scene: &Scene, camera: &Camera) {
        let r_inv = camera.transform.rotation.transpose();
        for kind in GeometryKind::ALL {
            for i in 0..scene.count(kind) {
                let expected = r_inv * (scene.node(kind, i).position - camera.transform.position);
                assert_relative_eq!(tracer.ssb().view_position(kind, i), expected, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_on_move_updates_view_positions() {
        let scene = scene();
        let (mut tracer, mut camera) = setup(&scene);
        camera.translate(Vec3::new(1.0, -0.5, 2.0));
        tracer.apply_pending(&scene, &mut camera);
        assert!(!camera.moved);
        assert_view_positions(&tracer, &scene, &camera);
    }

    #[test]
    fn test_on_turn_then_move() {
        let scene = scene();
        let (mut tracer, mut camera) = setup(&scene);
        camera.turn(0.35, -0.1);
        camera.translate(Vec3::new(0.5, 0.0, 0.0));
        tracer.apply_pending(&scene, &mut camera);
        assert!(!camera.has_pending_changes());
        assert_relative_eq!(
            camera.transform.rotation_inverted,
            camera.transform.rotation.transpose(),
            epsilon = 1e-6
        );
        assert_view_positions(&tracer, &scene, &camera);
    }

    #[test]
    fn test_on_zoom_changes_only_directions() {
        let scene = scene();
        let (mut tracer, mut camera) = setup(&scene);
        let directions = tracer.directions().directions().to_vec();
        let positions: Vec<Vec3> = (0..2)
            .map(|i| tracer.ssb().view_position(GeometryKind::Sphere, i))
            .collect();
        let masks = *tracer.masks();

        camera.zoom(0.5);
        tracer.on_zoom(&mut camera);

        assert!(camera.moved);
        assert!(!camera.zoomed);
        assert_eq!(*tracer.masks(), masks);
        for (i, p) in positions.iter().enumerate() {
            assert_eq!(tracer.ssb().view_position(GeometryKind::Sphere, i), *p);
        }
        for (old, new) in directions.iter().zip(tracer.directions().directions()) {
            assert_ne!(old, new);
        }
    }

    #[test]
    fn test_transparency_is_invariant_across_camera_events() {
        let scene = scene();
        let (mut tracer, mut camera) = setup(&scene);
        let transparency = tracer.masks().transparency;
        assert_eq!(transparency.spheres, 0b10);
        assert_eq!(transparency.cubes, 0b1);
        assert_eq!(transparency.tetrahedra, 0);

        camera.turn(3.0, 0.0);
        tracer.apply_pending(&scene, &mut camera);
        assert_eq!(tracer.masks().transparency, transparency);
        // Facing away, nothing is visible.
        assert!(!tracer.masks().visibility.any());

        camera.zoom(2.0);
        camera.translate(Vec3::new(0.0, 0.0, 20.0));
        tracer.apply_pending(&scene, &mut camera);
        tracer
            .on_resize(&scene, &mut camera, &Dimensions::new(20, 10))
            .unwrap();
        assert_eq!(tracer.masks().transparency, transparency);
    }

    #[test]
    fn test_visibility_bits_stay_below_counts() {
        let scene = scene();
        let (tracer, _) = setup(&scene);
        let v = tracer.masks().visibility;
        assert_eq!(v.spheres & !0b11, 0);
        assert_eq!(v.cubes & !0b1, 0);
        assert_eq!(v.tetrahedra & !0b1, 0);
        assert_eq!(v.spheres, 0b11);
    }

    #[test]
    fn test_on_scene_changed_rebuilds() {
        let mut scene = scene();
        let (mut tracer, mut camera) = setup(&scene);
        scene.add_cube(Cube::new(Vec3::new(0.0, -2.0, 6.0), 0.5, 0)).unwrap();
        scene.set_casts_shadow(GeometryKind::Sphere, 0, false);
        tracer.on_scene_changed(&scene, &mut camera);

        assert_eq!(tracer.static_masks().visibility.cubes, 0b11);
        assert_eq!(tracer.masks().shadowing.spheres, 0b10);
        assert_eq!(tracer.bvh().refs().len(), 5);
        assert_view_positions(&tracer, &scene, &camera);
    }

    #[test]
    fn test_resize_beyond_allocation_fails() {
        let scene = scene();
        let (mut tracer, mut camera) = setup(&scene);
        let err = tracer
            .on_resize(&scene, &mut camera, &Dimensions::new(41, 30))
            .unwrap_err();
        assert!(matches!(err, RenderError::Resolution { width: 41, .. }));
        assert_eq!(tracer.dimensions().width, 40);
    }

    #[test]
    fn test_moved_geometry_is_traced_after_scene_change() {
        let mut scene = Scene::new(vec![Material::default()]);
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, -50.0), 1.0, 0)).unwrap();
        let (mut tracer, mut camera) = setup(&scene);
        assert_eq!(tracer.masks().visibility.spheres, 0);

        scene.move_geometry(GeometryKind::Sphere, 0, Vec3::new(0.0, 0.0, 5.0));
        tracer.on_scene_changed(&scene, &mut camera);
        assert_eq!(tracer.masks().visibility.spheres, 0b1);

        let origin = camera.transform.position;
        let directions = tracer.directions();
        let mut hits = 0;
        for (i, (d, r)) in directions
            .directions()
            .iter()
            .zip(directions.directions_rcp())
            .enumerate()
        {
            let (x, y) = ((i % 40) as u16, (i / 40) as u16);
            let mut culled = Ray::from_cache(&origin, *d, *r);
            trace_primary_ray(&mut culled, &scene, tracer.ssb(), tracer.masks(), x, y);

            let mut brute = Ray::from_cache(&origin, *d, *r);
            hit_planes(&scene.planes, &mut brute);
            hit_cubes(scene.cubes(), 0xFF, &mut brute);
            hit_spheres(scene.spheres(), 0xFF, &mut brute);
            hit_tetrahedra(scene.tetrahedra(), 0xFF, &mut brute);

            assert_eq!(culled.hit, brute.hit, "pixel ({x}, {y})");
            if !culled.hit.is_miss() {
                hits += 1;
            }
        }
        assert!(hits > 0);
    }
}
