#![warn(missing_docs)]

//! Real-time ray tracing of scenes built from planes, cubes, spheres and
//! tetrahedra.
//!
//! Every pixel casts one primary ray. Work per pixel is kept small by caching
//! everything that only changes with the camera: ray directions, view-space
//! positions and the screen-space bounds of every object, which together
//! decide which objects a pixel needs to test at all.
//!
//! # Architecture
//!
//! - [`RayDirectionCache`] - per-pixel ray directions and reciprocals
//! - [`ScreenSpaceBounds`] - projected pixel rectangles per object
//! - [`Masks`] - 8-bit visibility, shadowing and transparency sets per kind
//! - [`bvh`] - shadow-ray acceleration over the masked kinds
//! - [`intersect`] - closed-form ray/primitive tests
//! - [`RayTracer`] - owns the caches, reacts to camera events and renders
//!   on the CPU or, with the `gpu` feature on native targets, through a wgpu
//!   compute kernel
//!
//! # Example
//!
//! ```
//! use slimtrace::math::Vec3;
//! use slimtrace::{Camera, FrameBuffer, Material, RayTracer, RenderSettings, Scene, Sphere};
//!
//! let mut scene = Scene::new(vec![Material::default()]);
//! scene.add_sphere(Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0, 0))?;
//!
//! let settings = RenderSettings {
//!     max_width: 64,
//!     max_height: 48,
//!     ..RenderSettings::default()
//! };
//! let mut tracer = RayTracer::init(&scene, settings)?;
//! let mut camera = Camera::new(Vec3::zeros(), 1.5);
//! let mut frame = FrameBuffer::new(64, 48)?;
//! tracer.on_resize(&scene, &mut camera, frame.dimensions())?;
//!
//! camera.zoom(0.5);
//! tracer.apply_pending(&scene, &mut camera);
//! tracer.on_render(&scene, &camera, &mut frame)?;
//! # Ok::<(), slimtrace::RenderError>(())
//! ```

pub mod bvh;
mod camera;
mod directions;
mod error;
mod frame;
pub mod intersect;
mod invalidate;
mod masks;
pub mod overlay;
mod ray;
mod render;
mod scene;
mod settings;
mod shade;
mod ssb;
mod trace;

// Frame dispatch blocks on error scopes and readback, which wasm cannot do.
#[cfg(all(feature = "gpu", not(target_arch = "wasm32")))]
pub mod gpu;

pub use slimtrace_math as math;

pub use bvh::{Bvh, BvhNode, GeometryRef};
pub use camera::{Camera, Transform, MIN_FOCAL_LENGTH};
pub use directions::RayDirectionCache;
pub use error::{RenderError, Result, SceneError};
pub use frame::{Dimensions, FrameBuffer, Pixel, MAX_HEIGHT, MAX_WIDTH};
pub use masks::{init_scene_masks, update_scene_masks, GeometryMasks, Masks};
pub use ray::{Ray, RayHit, MAX_DISTANCE};
pub use render::{CpuExecutor, FrameContext, FrameExecutor, RayTracer};
pub use scene::{
    AmbientLight, Cube, GeometryKind, Material, Node, NodeIds, Plane, PointLight, Scene, Sphere, Tetrahedron,
    MAX_GEOMETRY_PER_TYPE,
};
pub use settings::{Backend, DebugOverlays, RenderSettings};
pub use shade::{shade, shade_depth, shade_direction, shade_lambert, shade_uv, RenderMode, DEPTH_RANGE};
pub use ssb::{project_sphere, Bounds2D, ScreenSpaceBounds, NEAR};
pub use trace::trace_primary_ray;
