//! Error types for the renderer.

use thiserror::Error;

use crate::scene::GeometryKind;

/// Errors raised while building a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// A masked geometry type is already full.
    #[error("scene already holds {max} {kind}, the per-type capacity")]
    CapacityExceeded {
        /// Geometry type that overflowed.
        kind: GeometryKind,
        /// The capacity.
        max: usize,
    },

    /// Geometry references a material that is not in the table.
    #[error("material {material_id} does not exist ({count} materials defined)")]
    UnknownMaterial {
        /// Requested material.
        material_id: usize,
        /// Size of the material table.
        count: usize,
    },
}

/// Errors that can occur while setting up or running the renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A cache or frame buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation {
        /// What was being allocated.
        what: &'static str,
        /// Requested size.
        bytes: usize,
    },

    /// Requested resolution is zero or above the allocated maximum.
    #[error("resolution {width}x{height} is outside 1x1..={max_width}x{max_height}")]
    Resolution {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
        /// Allocated width.
        max_width: u16,
        /// Allocated height.
        max_height: u16,
    },

    /// Invalid render settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed.
    #[error("failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),

    /// Scene construction failed.
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The accelerator could not complete the frame.
    #[cfg(feature = "gpu")]
    #[error("GPU backend failed: {0}")]
    Gpu(#[from] slimtrace_gpu::GpuError),
}

/// Result type for renderer operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Allocate a vector of `len` copies of `value`, reporting failure instead of
/// aborting.
pub(crate) fn try_alloc<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| RenderError::Allocation {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, value);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_alloc() {
        let v = try_alloc("test", 16, 7u8).unwrap();
        assert_eq!(v, vec![7u8; 16]);

        let err = try_alloc("huge", usize::MAX / 2, 0u64).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { what: "huge", .. }));
    }

    #[test]
    fn test_scene_error_message() {
        let err = SceneError::CapacityExceeded {
            kind: GeometryKind::Tetrahedron,
            max: 8,
        };
        assert_eq!(err.to_string(), "scene already holds 8 tetrahedra, the per-type capacity");
    }
}
