//! `slimtrace info`

use anyhow::Result;
use serde::Serialize;
use slimtrace::{
    Dimensions, GeometryKind, GeometryMasks, RayTracer, RenderSettings, MAX_GEOMETRY_PER_TYPE,
};

use crate::demo;

fn mask_row(label: &str, masks: &GeometryMasks) {
    println!(
        "  {label:<13} cubes {:08b}  spheres {:08b}  tetrahedra {:08b}",
        masks.cubes, masks.spheres, masks.tetrahedra
    );
}

#[derive(Serialize)]
struct BoundsReport {
    kind: String,
    index: usize,
    /// `[left, right, top, bottom]`, absent when off screen.
    bounds: Option<[u16; 4]>,
}

#[derive(Serialize)]
struct InfoReport {
    planes: usize,
    cubes: usize,
    spheres: usize,
    tetrahedra: usize,
    materials: usize,
    point_lights: usize,
    visibility: u32,
    shadowing: u32,
    transparency: u32,
    bvh_nodes: usize,
    bvh_leaves: usize,
    bvh_depth: u8,
    screen_bounds: Vec<BoundsReport>,
}

pub fn run(width: u16, height: u16, json: bool) -> Result<()> {
    let scene = demo::scene()?;
    let mut camera = demo::camera();
    let settings = RenderSettings {
        max_width: width,
        max_height: height,
        ..RenderSettings::default()
    };
    let mut tracer = RayTracer::init(&scene, settings)?;
    tracer.on_resize(&scene, &mut camera, &Dimensions::new(width, height))?;

    if json {
        let masks = tracer.masks();
        let bvh = tracer.bvh();
        let mut screen_bounds = Vec::new();
        for kind in GeometryKind::ALL {
            for index in 0..scene.count(kind) {
                screen_bounds.push(BoundsReport {
                    kind: kind.to_string(),
                    index,
                    bounds: tracer
                        .ssb()
                        .bounds(kind, index)
                        .map(|b| [b.left, b.right, b.top, b.bottom]),
                });
            }
        }
        let report = InfoReport {
            planes: scene.planes.len(),
            cubes: scene.count(GeometryKind::Cube),
            spheres: scene.count(GeometryKind::Sphere),
            tetrahedra: scene.count(GeometryKind::Tetrahedron),
            materials: scene.materials.len(),
            point_lights: scene.point_lights.len(),
            visibility: masks.visibility.pack(),
            shadowing: masks.shadowing.pack(),
            transparency: masks.transparency.pack(),
            bvh_nodes: bvh.nodes().len(),
            bvh_leaves: bvh.leaf_count(),
            bvh_depth: bvh.depth(),
            screen_bounds,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Scene:");
    println!("  Planes: {}", scene.planes.len());
    for kind in GeometryKind::ALL {
        println!(
            "  {}: {} of {}",
            kind,
            scene.count(kind),
            MAX_GEOMETRY_PER_TYPE
        );
    }
    println!("  Materials: {}", scene.materials.len());
    println!("  Point lights: {}", scene.point_lights.len());

    println!("Masks:");
    let masks = tracer.masks();
    mask_row("visibility", &masks.visibility);
    mask_row("shadowing", &masks.shadowing);
    mask_row("transparency", &masks.transparency);

    let bvh = tracer.bvh();
    println!("BVH:");
    println!("  Nodes: {} (capacity {})", bvh.nodes().len(), bvh.capacity());
    println!("  Leaves: {}", bvh.leaf_count());
    println!("  Depth: {} (max {})", bvh.depth(), bvh.max_depth());

    println!("Screen-space bounds at {width}x{height}:");
    for kind in GeometryKind::ALL {
        for i in 0..scene.count(kind) {
            match tracer.ssb().bounds(kind, i) {
                Some(b) => println!(
                    "  {kind}[{i}]: x {}..={} y {}..={}",
                    b.left, b.right, b.top, b.bottom
                ),
                None => println!("  {kind}[{i}]: off screen"),
            }
        }
    }

    Ok(())
}
