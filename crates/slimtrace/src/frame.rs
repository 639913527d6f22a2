//! Frame buffer and its dimensions.

use bytemuck::{Pod, Zeroable};
use slimtrace_math::{saturate, Color};

use crate::error::{try_alloc, RenderError, Result};

/// Largest supported frame width.
pub const MAX_WIDTH: u16 = 3840;

/// Largest supported frame height.
pub const MAX_HEIGHT: u16 = 2160;

/// One RGBA8 output pixel, laid out as the GPU kernel writes it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Pixel {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Pixel {
    /// Opaque pixel from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Quantize a linear color, rounding to nearest.
    ///
    /// Must match `pack_color` in the WGSL kernel bit for bit.
    #[inline]
    pub fn from_color(color: &Color) -> Self {
        let q = |c: f32| (saturate(c) * 255.0 + 0.5) as u8;
        Self::rgb(q(color.x), q(color.y), q(color.z))
    }
}

/// Active resolution and the ratios derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Pixel count.
    pub width_times_height: u32,
    /// Width as float.
    pub f_width: f32,
    /// Height as float.
    pub f_height: f32,
    /// Half width.
    pub h_width: f32,
    /// Half height.
    pub h_height: f32,
    /// Aspect ratio.
    pub width_over_height: f32,
    /// Inverse aspect ratio.
    pub height_over_width: f32,
}

impl Dimensions {
    /// Derive all fields from a non-zero resolution.
    pub fn new(width: u16, height: u16) -> Self {
        let f_width = f32::from(width);
        let f_height = f32::from(height);
        Self {
            width,
            height,
            width_times_height: u32::from(width) * u32::from(height),
            f_width,
            f_height,
            h_width: 0.5 * f_width,
            h_height: 0.5 * f_height,
            width_over_height: f_width / f_height,
            height_over_width: f_height / f_width,
        }
    }

    /// Pixel count as `usize`.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width_times_height as usize
    }
}

/// Pixel storage allocated once for a maximum resolution.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    dimensions: Dimensions,
    max_width: u16,
    max_height: u16,
    pixels: Vec<Pixel>,
}

impl FrameBuffer {
    /// Allocate storage for `max_width x max_height`; the active resolution
    /// starts at the maximum.
    pub fn new(max_width: u16, max_height: u16) -> Result<Self> {
        if max_width == 0 || max_height == 0 || max_width > MAX_WIDTH || max_height > MAX_HEIGHT {
            return Err(RenderError::Resolution {
                width: max_width,
                height: max_height,
                max_width: MAX_WIDTH,
                max_height: MAX_HEIGHT,
            });
        }
        let len = usize::from(max_width) * usize::from(max_height);
        let pixels = try_alloc("frame buffer", len, Pixel::default())?;
        Ok(Self {
            dimensions: Dimensions::new(max_width, max_height),
            max_width,
            max_height,
            pixels,
        })
    }

    /// Change the active resolution.
    pub fn resize(&mut self, width: u16, height: u16) -> Result<()> {
        if width == 0 || height == 0 || width > self.max_width || height > self.max_height {
            return Err(RenderError::Resolution {
                width,
                height,
                max_width: self.max_width,
                max_height: self.max_height,
            });
        }
        self.dimensions = Dimensions::new(width, height);
        Ok(())
    }

    /// Active resolution.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// Allocated maximum as `(width, height)`.
    pub fn max_resolution(&self) -> (u16, u16) {
        (self.max_width, self.max_height)
    }

    /// Pixels of the active resolution, row-major.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels[..self.dimensions.pixel_count()]
    }

    /// Mutable pixels of the active resolution, row-major.
    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        let count = self.dimensions.pixel_count();
        &mut self.pixels[..count]
    }

    /// Active pixels as raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.pixels())
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: u16, y: u16) -> Pixel {
        self.pixels[usize::from(y) * usize::from(self.dimensions.width) + usize::from(x)]
    }

    /// Write a pixel, ignoring coordinates outside the active area.
    pub fn put(&mut self, x: i32, y: i32, pixel: Pixel) {
        let d = &self.dimensions;
        if x < 0 || y < 0 || x >= i32::from(d.width) || y >= i32::from(d.height) {
            return;
        }
        let i = y as usize * usize::from(d.width) + x as usize;
        self.pixels[i] = pixel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dimensions() {
        let d = Dimensions::new(200, 100);
        assert_eq!(d.width_times_height, 20_000);
        assert_relative_eq!(d.h_width, 100.0);
        assert_relative_eq!(d.h_height, 50.0);
        assert_relative_eq!(d.width_over_height, 2.0);
        assert_relative_eq!(d.height_over_width, 0.5);
    }

    #[test]
    fn test_pixel_quantization() {
        assert_eq!(Pixel::from_color(&Color::new(0.0, 1.0, 2.0)), Pixel::rgb(0, 255, 255));
        assert_eq!(Pixel::from_color(&Color::new(-1.0, 0.5, 0.2)), Pixel::rgb(0, 128, 51));
    }

    #[test]
    fn test_resize_bounds() {
        let mut fb = FrameBuffer::new(64, 32).unwrap();
        assert_eq!(fb.pixels().len(), 64 * 32);
        fb.resize(16, 8).unwrap();
        assert_eq!(fb.pixels().len(), 128);
        assert_eq!(fb.as_bytes().len(), 512);
        assert!(matches!(fb.resize(65, 8), Err(RenderError::Resolution { .. })));
        assert!(matches!(fb.resize(0, 8), Err(RenderError::Resolution { .. })));
        assert_eq!(fb.dimensions().width, 16);
    }

    #[test]
    fn test_put_clips() {
        let mut fb = FrameBuffer::new(4, 4).unwrap();
        fb.put(-1, 0, Pixel::rgb(1, 1, 1));
        fb.put(4, 0, Pixel::rgb(1, 1, 1));
        fb.put(2, 3, Pixel::rgb(9, 8, 7));
        assert_eq!(fb.pixel(2, 3), Pixel::rgb(9, 8, 7));
        assert_eq!(fb.pixels().iter().filter(|p| p.r != 0).count(), 1);
    }

    #[test]
    fn test_rejects_oversized_allocation() {
        assert!(FrameBuffer::new(MAX_WIDTH + 1, 10).is_err());
    }
}
