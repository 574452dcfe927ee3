// src/config.rs
// Renderer configuration loaded from JSON with serde defaults
// RELEVANT FILES: src/params.rs, src/renderer.rs, src/viewer/mod.rs

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::Path;

use crate::params::DisplayParameters;

#[derive(Debug, Clone)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RendererConfig validation failed: {}", self.message)
    }
}

impl Error for ConfigError {}

/// Depth assigned to every primitive of a layer. Smaller is nearer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthBands {
    pub node: f32,
    pub edge: f32,
    pub terrain: f32,
}

impl Default for DepthBands {
    fn default() -> Self {
        Self {
            node: 0.1,
            edge: 0.5,
            terrain: 0.9,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    pub display: DisplayParameters,
    /// Influence radius in pixels per unit of width factor.
    pub kernel_scale: f32,
    /// Block edge length used by the preview tier; 1 evaluates every pixel.
    pub preview_stride: u32,
    /// Node quad half-width in normalized device coordinates.
    pub node_radius: f32,
    pub node_color: [f32; 4],
    pub edge_color: [f32; 4],
    pub clear_color: [f32; 4],
    pub depth: DepthBands,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            title: "graphterrain".to_string(),
            vsync: true,
            display: DisplayParameters::default(),
            kernel_scale: 0.04,
            preview_stride: 2,
            node_radius: 0.01,
            node_color: [1.0, 1.0, 1.0, 1.0],
            edge_color: [0.75, 0.75, 0.75, 1.0],
            clear_color: [0.157, 0.173, 0.204, 1.0],
            depth: DepthBands::default(),
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::new(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::new(format!(
                "width and height must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.preview_stride == 0 {
            return Err(ConfigError::new("preview_stride must be at least 1"));
        }
        if !self.kernel_scale.is_finite() || self.kernel_scale < 0.0 {
            return Err(ConfigError::new(
                "kernel_scale must be a finite, non-negative number",
            ));
        }
        if !self.node_radius.is_finite() || self.node_radius <= 0.0 {
            return Err(ConfigError::new("node_radius must be positive"));
        }
        if !self.display.width_factor.is_finite() || self.display.width_factor < 0.0 {
            return Err(ConfigError::new(
                "display.width_factor must be a finite, non-negative number",
            ));
        }
        if !self.display.peak.is_finite() || !self.display.valley.is_finite() {
            return Err(ConfigError::new("display.peak and display.valley must be finite"));
        }
        for (label, color) in [
            ("node_color", self.node_color),
            ("edge_color", self.edge_color),
            ("clear_color", self.clear_color),
        ] {
            if color.iter().any(|c| !c.is_finite()) {
                return Err(ConfigError::new(format!("{label} entries must be finite")));
            }
        }
        for (label, depth) in [
            ("depth.node", self.depth.node),
            ("depth.edge", self.depth.edge),
            ("depth.terrain", self.depth.terrain),
        ] {
            if !(0.0..1.0).contains(&depth) {
                return Err(ConfigError::new(format!(
                    "{label} must be within [0, 1), got {depth}"
                )));
            }
        }
        Ok(())
    }

    pub fn clear_wgpu_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.width, config.height), (800, 800));
        assert_eq!(config.display.width_factor, 1000.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            RendererConfig::from_json_str(r#"{ "width": 640, "display": { "peak": 0.9 } }"#)
                .unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 800);
        assert_eq!(config.display.peak, 0.9);
        assert_eq!(config.display.valley, 0.2);
        assert_eq!(config.depth, DepthBands::default());
    }

    #[test]
    fn rejects_zero_preview_stride() {
        let err = RendererConfig::from_json_str(r#"{ "preview_stride": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("preview_stride"));
    }

    #[test]
    fn rejects_depth_outside_clip_range() {
        let mut config = RendererConfig::default();
        config.depth.terrain = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("depth.terrain"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RendererConfig::from_json_str("{ width: }").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }
}
