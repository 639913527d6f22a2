//! `slimtrace render`

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use slimtrace::{Backend, FrameBuffer, RayTracer, RenderMode, RenderSettings};

use crate::demo;

/// Command-line overrides on top of the settings file.
pub struct RenderOptions {
    pub output: PathBuf,
    pub settings: Option<PathBuf>,
    pub mode: Option<RenderMode>,
    pub backend: Option<Backend>,
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub yaw: f32,
    pub zoom: f32,
    pub show_bvh: bool,
    pub show_ssb: bool,
}

fn resolve_settings(options: &RenderOptions) -> Result<RenderSettings> {
    let mut settings = match &options.settings {
        Some(path) => RenderSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RenderSettings::default(),
    };
    if let Some(mode) = options.mode {
        settings.render_mode = mode;
    }
    if let Some(backend) = options.backend {
        settings.backend = backend;
    }
    if let Some(width) = options.width {
        settings.max_width = width;
    }
    if let Some(height) = options.height {
        settings.max_height = height;
    }
    settings.debug.show_bvh |= options.show_bvh;
    settings.debug.show_ssb |= options.show_ssb;
    settings.validate()?;
    Ok(settings)
}

pub fn run(options: &RenderOptions) -> Result<()> {
    let settings = resolve_settings(options)?;
    let scene = demo::scene()?;
    let mut camera = demo::camera();

    let mut tracer = RayTracer::init(&scene, settings.clone())?;
    let mut frame = FrameBuffer::new(settings.max_width, settings.max_height)?;
    let dimensions = *frame.dimensions();
    tracer.on_resize(&scene, &mut camera, &dimensions)?;

    if options.yaw != 0.0 {
        camera.turn(options.yaw.to_radians(), 0.0);
    }
    if options.zoom != 0.0 {
        camera.zoom(options.zoom);
    }
    tracer.apply_pending(&scene, &mut camera);

    let start = Instant::now();
    tracer
        .on_render(&scene, &camera, &mut frame)
        .context("rendering frame")?;
    tracing::info!(
        width = dimensions.width,
        height = dimensions.height,
        mode = %settings.render_mode,
        backend = ?tracer.backend(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "frame rendered"
    );

    let image = image::RgbaImage::from_raw(
        u32::from(dimensions.width),
        u32::from(dimensions.height),
        frame.as_bytes().to_vec(),
    )
    .context("frame buffer does not match its dimensions")?;
    image
        .save(&options.output)
        .with_context(|| format!("writing {}", options.output.display()))?;
    println!("Wrote {}", options.output.display());

    Ok(())
}
