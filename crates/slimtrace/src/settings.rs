//! Renderer configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::frame::{MAX_HEIGHT, MAX_WIDTH};
use crate::shade::RenderMode;

/// Where a frame is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Host CPU, optionally across rayon workers.
    #[default]
    Cpu,
    /// wgpu compute kernel; requires the `gpu` feature.
    Gpu,
}

/// Debug drawing on top of the traced frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOverlays {
    /// Draw the BVH node boxes as wireframe.
    pub show_bvh: bool,
    /// Outline the screen-space bounds of visible objects.
    pub show_ssb: bool,
}

/// Renderer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Active shading function.
    pub render_mode: RenderMode,
    /// Preferred backend.
    pub backend: Backend,
    /// Split CPU frames across rayon workers by row.
    pub parallel: bool,
    /// Deepest BVH level.
    pub bvh_max_depth: u8,
    /// Width the direction caches and frame buffer are allocated for.
    pub max_width: u16,
    /// Height the direction caches and frame buffer are allocated for.
    pub max_height: u16,
    /// Debug overlays.
    pub debug: DebugOverlays,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Beauty,
            backend: Backend::Cpu,
            parallel: true,
            bvh_max_depth: 3,
            max_width: 1920,
            max_height: 1080,
            debug: DebugOverlays::default(),
        }
    }
}

impl RenderSettings {
    /// Largest accepted BVH depth.
    pub const MAX_BVH_DEPTH: u8 = 12;

    /// Parse settings from TOML; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.bvh_max_depth > Self::MAX_BVH_DEPTH {
            return Err(RenderError::InvalidSettings(format!(
                "bvh_max_depth must be at most {}",
                Self::MAX_BVH_DEPTH
            )));
        }
        if self.max_width == 0 || self.max_width > MAX_WIDTH {
            return Err(RenderError::InvalidSettings(format!(
                "max_width must be between 1 and {MAX_WIDTH}"
            )));
        }
        if self.max_height == 0 || self.max_height > MAX_HEIGHT {
            return Err(RenderError::InvalidSettings(format!(
                "max_height must be between 1 and {MAX_HEIGHT}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RenderSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let settings = RenderSettings::from_toml_str(
            r#"
            render_mode = "depth"
            backend = "gpu"

            [debug]
            show_ssb = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.render_mode, RenderMode::Depth);
        assert_eq!(settings.backend, Backend::Gpu);
        assert!(settings.debug.show_ssb);
        assert!(!settings.debug.show_bvh);
        assert_eq!(settings.bvh_max_depth, 3);
    }

    #[test]
    fn test_rejects_oversized_resolution() {
        let err = RenderSettings::from_toml_str("max_width = 5000").unwrap_err();
        assert!(matches!(err, RenderError::InvalidSettings(_)));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let err = RenderSettings::from_toml_str("render_mode = \"wireframe\"").unwrap_err();
        assert!(matches!(err, RenderError::Toml(_)));
    }
}
