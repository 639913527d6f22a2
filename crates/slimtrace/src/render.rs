//! Frame rendering and backend selection.
//!
//! [`RayTracer`] is the renderer's explicit context: it owns the direction
//! cache, screen-space bounds, masks and BVH, and hands a read-only
//! [`FrameContext`] to a [`FrameExecutor`] once per frame.

use rayon::prelude::*;
use slimtrace_math::Vec3;

use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::directions::RayDirectionCache;
use crate::error::Result;
use crate::frame::{Dimensions, FrameBuffer, Pixel};
use crate::masks::{init_scene_masks, Masks};
use crate::overlay;
use crate::ray::Ray;
use crate::scene::Scene;
use crate::settings::{Backend, RenderSettings};
use crate::shade::{shade, RenderMode};
use crate::ssb::ScreenSpaceBounds;
use crate::trace::trace_primary_ray;

#[cfg(all(feature = "gpu", not(target_arch = "wasm32")))]
use crate::gpu::GpuExecutor;

/// Everything a frame reads, borrowed from the renderer and the application.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    /// Scene being drawn.
    pub scene: &'a Scene,
    /// Camera position, shared by every primary ray.
    pub origin: &'a Vec3,
    /// Per-pixel directions.
    pub directions: &'a RayDirectionCache,
    /// Screen-space bounds of the masked geometry.
    pub ssb: &'a ScreenSpaceBounds,
    /// Shadow acceleration structure.
    pub bvh: &'a Bvh,
    /// Effective masks.
    pub masks: &'a Masks,
    /// Active resolution.
    pub dimensions: &'a Dimensions,
    /// Shading function.
    pub mode: RenderMode,
}

impl FrameContext<'_> {
    /// Trace and shade one pixel.
    #[inline]
    pub fn render_pixel(&self, x: u16, y: u16) -> Pixel {
        let i = usize::from(y) * usize::from(self.dimensions.width) + usize::from(x);
        let mut ray = Ray::from_cache(
            self.origin,
            self.directions.directions()[i],
            self.directions.directions_rcp()[i],
        );
        trace_primary_ray(&mut ray, self.scene, self.ssb, self.masks, x, y);
        let color = shade(self.mode, &ray.hit, self.scene, self.bvh, self.masks);
        Pixel::from_color(&color)
    }
}

/// Runs the per-pixel work of one frame.
pub trait FrameExecutor {
    /// Backend this executor implements.
    fn backend(&self) -> Backend;

    /// Write exactly one pixel per slot of `pixels`, row-major.
    ///
    /// On error `pixels` must be left untouched.
    fn execute(&mut self, frame: &FrameContext<'_>, pixels: &mut [Pixel]) -> Result<()>;
}

/// Host executor, optionally splitting rows across rayon workers.
#[derive(Debug, Clone, Copy)]
pub struct CpuExecutor {
    parallel: bool,
}

impl CpuExecutor {
    /// New executor.
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }
}

impl FrameExecutor for CpuExecutor {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn execute(&mut self, frame: &FrameContext<'_>, pixels: &mut [Pixel]) -> Result<()> {
        let width = usize::from(frame.dimensions.width);
        let render_row = |(y, row): (usize, &mut [Pixel])| {
            for (x, pixel) in row.iter_mut().enumerate() {
                *pixel = frame.render_pixel(x as u16, y as u16);
            }
        };

        if self.parallel {
            pixels.par_chunks_mut(width).enumerate().for_each(&render_row);
        } else {
            pixels.chunks_mut(width).enumerate().for_each(&render_row);
        }
        Ok(())
    }
}

/// The renderer.
pub struct RayTracer {
    pub(crate) settings: RenderSettings,
    pub(crate) dimensions: Dimensions,
    pub(crate) directions: RayDirectionCache,
    pub(crate) ssb: ScreenSpaceBounds,
    pub(crate) bvh: Bvh,
    pub(crate) static_masks: Masks,
    pub(crate) masks: Masks,
    cpu: CpuExecutor,
    #[cfg(all(feature = "gpu", not(target_arch = "wasm32")))]
    gpu: Option<GpuExecutor>,
    backend: Backend,
}

impl RayTracer {
    /// Allocate caches for the maximum resolution, build the BVH and the
    /// static masks, and select the backend.
    ///
    /// Directions and view positions are computed on the first
    /// [`RayTracer::on_resize`] or, failing that, the first frame.
    pub fn init(scene: &Scene, settings: RenderSettings) -> Result<Self> {
        settings.validate()?;

        let capacity = usize::from(settings.max_width) * usize::from(settings.max_height);
        let directions = RayDirectionCache::new(capacity)?;
        let mut bvh = Bvh::new(settings.bvh_max_depth)?;
        bvh.update(scene);
        let static_masks = init_scene_masks(scene);

        let mut tracer = Self {
            dimensions: Dimensions::new(settings.max_width, settings.max_height),
            directions,
            ssb: ScreenSpaceBounds::new(),
            bvh,
            static_masks,
            masks: static_masks,
            cpu: CpuExecutor::new(settings.parallel),
            #[cfg(all(feature = "gpu", not(target_arch = "wasm32")))]
            gpu: None,
            backend: Backend::Cpu,
            settings,
        };
        let backend = tracer.set_backend(tracer.settings.backend);

        tracing::info!(
            max_width = tracer.settings.max_width,
            max_height = tracer.settings.max_height,
            mode = %tracer.settings.render_mode,
            ?backend,
            bvh_nodes = tracer.bvh.nodes().len(),
            "ray tracer initialized"
        );
        Ok(tracer)
    }

    /// Switch backends and return the one now active.
    ///
    /// Requesting the GPU falls back to the CPU with a warning when the
    /// `gpu` feature is disabled or no adapter is available. Switching to
    /// the GPU always re-uploads the direction cache.
    pub fn set_backend(&mut self, backend: Backend) -> Backend {
        self.backend = match backend {
            Backend::Cpu => Backend::Cpu,
            Backend::Gpu => self.activate_gpu(),
        };
        tracing::debug!(backend = ?self.backend, "backend selected");
        self.backend
    }

    #[cfg(all(feature = "gpu", not(target_arch = "wasm32")))]
    fn activate_gpu(&mut self) -> Backend {
        if self.gpu.is_none() {
            match GpuExecutor::new() {
                Ok(executor) => {
                    tracing::info!(adapter = executor.context().adapter_name(), "GPU backend ready");
                    self.gpu = Some(executor);
                }
                Err(err) => {
                    tracing::warn!(%err, "GPU backend unavailable, falling back to CPU");
                    return Backend::Cpu;
                }
            }
        }
        match self.gpu.as_mut() {
            Some(gpu) => {
                gpu.invalidate_directions();
                Backend::Gpu
            }
            None => Backend::Cpu,
        }
    }

    #[cfg(not(all(feature = "gpu", not(target_arch = "wasm32"))))]
    fn activate_gpu(&mut self) -> Backend {
        tracing::warn!("no GPU backend in this build, falling back to CPU");
        Backend::Cpu
    }

    /// Change the shading function.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.settings.render_mode = mode;
    }

    /// Render one frame into `frame`.
    ///
    /// A resolution change since the last frame is handled as a resize.
    /// Camera flags are not consumed here; call [`RayTracer::apply_pending`]
    /// (or the individual hooks) first. On a GPU failure the frame buffer
    /// is left as it was.
    pub fn on_render(&mut self, scene: &Scene, camera: &Camera, frame: &mut FrameBuffer) -> Result<()> {
        if *frame.dimensions() != self.dimensions || self.directions.is_empty() {
            tracing::debug!(
                width = frame.dimensions().width,
                height = frame.dimensions().height,
                "frame resolution changed, refreshing caches"
            );
            self.refresh_resolution(scene, camera, frame.dimensions())?;
        }
        if camera.has_pending_changes() {
            tracing::debug!("rendering with unsettled camera changes");
        }

        let context = FrameContext {
            scene,
            origin: &camera.transform.position,
            directions: &self.directions,
            ssb: &self.ssb,
            bvh: &self.bvh,
            masks: &self.masks,
            dimensions: &self.dimensions,
            mode: self.settings.render_mode,
        };

        let executor: &mut dyn FrameExecutor = match self.backend {
            #[cfg(all(feature = "gpu", not(target_arch = "wasm32")))]
            Backend::Gpu => match self.gpu.as_mut() {
                Some(gpu) => gpu,
                None => &mut self.cpu,
            },
            _ => &mut self.cpu,
        };
        executor.execute(&context, frame.pixels_mut())?;

        if self.settings.debug.show_bvh {
            overlay::draw_bvh(frame, &self.bvh, camera);
        }
        if self.settings.debug.show_ssb {
            overlay::draw_ssb(frame, &self.ssb, &self.masks.visibility);
        }
        Ok(())
    }

    /// Active backend.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Current settings, including runtime changes.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Resolution the caches were last computed for.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// Per-pixel ray directions.
    pub fn directions(&self) -> &RayDirectionCache {
        &self.directions
    }

    /// Screen-space bounds.
    pub fn ssb(&self) -> &ScreenSpaceBounds {
        &self.ssb
    }

    /// The shadow BVH.
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Effective masks.
    pub fn masks(&self) -> &Masks {
        &self.masks
    }

    /// Masks computed from scene properties alone.
    pub fn static_masks(&self) -> &Masks {
        &self.static_masks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Cube, GeometryKind, Material, Plane, PointLight, Sphere};
    use slimtrace_math::Color;

    fn settings(width: u16, height: u16) -> RenderSettings {
        RenderSettings {
            max_width: width,
            max_height: height,
            ..RenderSettings::default()
        }
    }

    fn scene() -> Scene {
        let mut scene = Scene::new(vec![
            Material::diffuse(Color::repeat(0.8)),
            Material::diffuse(Color::new(0.9, 0.2, 0.2)),
        ]);
        scene
            .add_plane(Plane {
                position: Vec3::new(0.0, -1.0, 0.0),
                normal: Vec3::y(),
                material_id: 0,
            })
            .unwrap();
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, 1)).unwrap();
        scene.add_cube(Cube::new(Vec3::new(2.5, -0.5, 6.0), 0.5, 1)).unwrap();
        scene.add_point_light(PointLight {
            position: Vec3::new(0.0, 4.0, 3.0),
            color: Color::repeat(1.0),
            intensity: 20.0,
        });
        scene
    }

    fn camera() -> Camera {
        Camera::look_at(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.0, 5.0), 1.5)
    }

    fn render(scene: &Scene, camera: &Camera, mode: RenderMode) -> FrameBuffer {
        let mut tracer = RayTracer::init(scene, settings(32, 24)).unwrap();
        tracer.set_render_mode(mode);
        let mut frame = FrameBuffer::new(32, 24).unwrap();
        tracer.on_render(scene, camera, &mut frame).unwrap();
        frame
    }

    #[test]
    fn test_consecutive_renders_are_identical() {
        let scene = scene();
        let camera = camera();
        let mut tracer = RayTracer::init(&scene, settings(32, 24)).unwrap();
        let mut frame = FrameBuffer::new(32, 24).unwrap();
        tracer.on_render(&scene, &camera, &mut frame).unwrap();
        let first = frame.as_bytes().to_vec();
        tracer.on_render(&scene, &camera, &mut frame).unwrap();
        assert_eq!(first, frame.as_bytes());
        assert!(first.iter().any(|&b| b != 0 && b != 255));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let scene = scene();
        let camera = camera();
        let mut frames = Vec::new();
        for parallel in [true, false] {
            let mut tracer = RayTracer::init(
                &scene,
                RenderSettings {
                    parallel,
                    ..settings(32, 24)
                },
            )
            .unwrap();
            let mut frame = FrameBuffer::new(32, 24).unwrap();
            tracer.on_render(&scene, &camera, &mut frame).unwrap();
            frames.push(frame.as_bytes().to_vec());
        }
        assert_eq!(frames[0], frames[1]);
    }

    #[test]
    fn test_depth_of_sphere_is_less_than_plane() {
        let mut scene = Scene::new(vec![Material::default()]);
        scene
            .add_plane(Plane {
                position: Vec3::zeros(),
                normal: Vec3::y(),
                material_id: 0,
            })
            .unwrap();
        scene.add_sphere(Sphere::new(Vec3::new(0.0, 2.0, 0.0), 1.0, 0)).unwrap();
        // Straight down: `look_at` has to pick a fallback up vector.
        let camera = Camera::look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::zeros(), 1.5);

        let frame = render(&scene, &camera, RenderMode::Depth);
        let sphere = frame.pixel(16, 12);
        assert!(sphere.r < 255);
        for (x, y) in [(0, 0), (31, 0), (0, 23), (31, 23)] {
            let plane = frame.pixel(x, y);
            assert!(plane.r < 255, "plane missed at ({x}, {y})");
            assert!(sphere.r < plane.r, "sphere {sphere:?} plane {plane:?}");
        }
        assert_eq!(sphere.r, sphere.g);
        assert_eq!(sphere.g, sphere.b);
    }

    #[test]
    fn test_miss_colors_per_mode() {
        let scene = scene();
        let camera = camera();
        // The top-left corner looks above the horizon.
        assert_eq!(render(&scene, &camera, RenderMode::Depth).pixel(0, 0), Pixel::rgb(255, 255, 255));
        assert_eq!(render(&scene, &camera, RenderMode::Uvs).pixel(0, 0), Pixel::rgb(255, 255, 0));
        assert_eq!(render(&scene, &camera, RenderMode::Beauty).pixel(0, 0), Pixel::rgb(0, 0, 0));
    }

    #[test]
    fn test_non_shadow_caster_never_darkens() {
        let mut shadowed = scene();
        let marker = shadowed.add_material(Material::diffuse(Color::new(0.1, 0.9, 0.1)));
        shadowed.set_material_id(GeometryKind::Sphere, 0, marker).unwrap();
        shadowed.set_casts_shadow(GeometryKind::Sphere, 0, false);
        let mut without = shadowed.clone();
        without.move_geometry(GeometryKind::Sphere, 0, Vec3::new(0.0, 0.0, -50.0));

        let camera = camera();
        let mut tracer = RayTracer::init(&shadowed, settings(32, 24)).unwrap();
        let mut with_sphere = FrameBuffer::new(32, 24).unwrap();
        tracer.on_render(&shadowed, &camera, &mut with_sphere).unwrap();
        let reference = render(&without, &camera, RenderMode::Beauty);

        let origin = camera.transform.position;
        let mut sphere_pixels = 0;
        for y in 0..24u16 {
            for x in 0..32u16 {
                let i = usize::from(y) * 32 + usize::from(x);
                let mut ray = Ray::from_cache(
                    &origin,
                    tracer.directions().directions()[i],
                    tracer.directions().directions_rcp()[i],
                );
                trace_primary_ray(&mut ray, &shadowed, tracer.ssb(), tracer.masks(), x, y);
                if ray.hit.material_id == marker {
                    sphere_pixels += 1;
                    continue;
                }
                assert_eq!(with_sphere.pixel(x, y), reference.pixel(x, y), "pixel ({x}, {y})");
            }
        }
        assert!(sphere_pixels > 0);
    }

    #[test]
    fn test_resolution_change_is_picked_up() {
        let scene = scene();
        let camera = camera();
        let mut tracer = RayTracer::init(&scene, settings(32, 24)).unwrap();
        let mut frame = FrameBuffer::new(32, 24).unwrap();
        frame.resize(16, 12).unwrap();
        tracer.on_render(&scene, &camera, &mut frame).unwrap();
        assert_eq!(tracer.dimensions().width, 16);
        assert_eq!(tracer.directions().len(), 16 * 12);

        let mut big = FrameBuffer::new(64, 48).unwrap();
        assert!(tracer.on_render(&scene, &camera, &mut big).is_err());
    }

    #[test]
    fn test_gpu_request_without_adapter_falls_back() {
        let scene = scene();
        let mut tracer = RayTracer::init(&scene, settings(8, 8)).unwrap();
        let active = tracer.set_backend(Backend::Gpu);
        if !cfg!(all(feature = "gpu", not(target_arch = "wasm32"))) {
            assert_eq!(active, Backend::Cpu);
        }
        assert_eq!(tracer.set_backend(Backend::Cpu), Backend::Cpu);
    }
}
