//! WGSL sources.

/// The primary-ray compute kernel.
pub const RAYTRACE_SHADER: &str = include_str!("raytrace.wgsl");
