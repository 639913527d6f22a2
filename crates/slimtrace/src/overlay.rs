//! Debug overlays drawn over a finished frame.

use slimtrace_math::{Aabb3, Vec3};

use crate::bvh::Bvh;
use crate::camera::Camera;
use crate::frame::{Dimensions, FrameBuffer, Pixel};
use crate::masks::GeometryMasks;
use crate::scene::{GeometryKind, MAX_GEOMETRY_PER_TYPE};
use crate::ssb::{ScreenSpaceBounds, NEAR};

/// Overlay line color.
pub const OVERLAY_COLOR: Pixel = Pixel::rgb(255, 255, 0);

/// Outline every BVH node's box as projected wireframe.
pub fn draw_bvh(frame: &mut FrameBuffer, bvh: &Bvh, camera: &Camera) {
    for node in bvh.nodes() {
        if !node.aabb.is_empty() {
            draw_aabb(frame, &node.aabb, camera);
        }
    }
}

/// Outline the pixel bounds of every visible, on-screen instance.
pub fn draw_ssb(frame: &mut FrameBuffer, ssb: &ScreenSpaceBounds, visibility: &GeometryMasks) {
    for kind in GeometryKind::ALL {
        for i in 0..MAX_GEOMETRY_PER_TYPE {
            if !visibility.contains(kind, i) {
                continue;
            }
            let Some(b) = ssb.bounds(kind, i) else {
                continue;
            };
            let (l, r, t, bt) = (
                i32::from(b.left),
                i32::from(b.right),
                i32::from(b.top),
                i32::from(b.bottom),
            );
            draw_line(frame, (l, t), (r, t));
            draw_line(frame, (r, t), (r, bt));
            draw_line(frame, (r, bt), (l, bt));
            draw_line(frame, (l, bt), (l, t));
        }
    }
}

fn draw_aabb(frame: &mut FrameBuffer, aabb: &Aabb3, camera: &Camera) {
    let corners = aabb.corners().map(|c| camera.transform.to_view(&c));
    let dims = *frame.dimensions();
    for (a, b) in Aabb3::EDGES {
        let Some((a, b)) = clip_near(corners[a], corners[b]) else {
            continue;
        };
        let pa = project(&a, camera.focal_length, &dims);
        let pb = project(&b, camera.focal_length, &dims);
        draw_line(frame, pa, pb);
    }
}

/// Clip a view-space segment against the near plane.
fn clip_near(a: Vec3, b: Vec3) -> Option<(Vec3, Vec3)> {
    match (a.z >= NEAR, b.z >= NEAR) {
        (true, true) => Some((a, b)),
        (false, false) => None,
        (a_in, _) => {
            let t = (NEAR - a.z) / (b.z - a.z);
            let cut = a + (b - a) * t;
            if a_in {
                Some((a, cut))
            } else {
                Some((cut, b))
            }
        }
    }
}

/// View-space point to pixel coordinates, inverting the direction mapping.
fn project(p: &Vec3, focal_length: f32, dims: &Dimensions) -> (i32, i32) {
    let sx = focal_length * p.x / p.z;
    let sy = focal_length * p.y / p.z;
    let x = dims.h_width + sx * dims.h_height - 0.5;
    let y = dims.h_height - sy * dims.h_height - 0.5;
    (to_pixel(x), to_pixel(y))
}

// Points far behind the viewport edge still draw a line with the right slope.
fn to_pixel(v: f32) -> i32 {
    v.round().clamp(-65_536.0, 65_536.0) as i32
}

/// Bresenham line; off-frame pixels are dropped by [`FrameBuffer::put`].
fn draw_line(frame: &mut FrameBuffer, from: (i32, i32), to: (i32, i32)) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    let d = frame.dimensions();
    let (w, h) = (i32::from(d.width), i32::from(d.height));
    // A line starting off frame that never crosses it would walk for a long time.
    if (x < 0 && to.0 < 0) || (y < 0 && to.1 < 0) || (x >= w && to.0 >= w) || (y >= h && to.1 >= h) {
        return;
    }

    loop {
        frame.put(x, y, OVERLAY_COLOR);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}
