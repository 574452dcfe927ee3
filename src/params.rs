// src/params.rs
// Display parameters mutated by the UI shell and read once per frame
// RELEVANT FILES: src/renderer.rs, src/compositor/terrain_pass.rs, src/shaders/terrain_display.wgsl

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub const PEAK_RANGE: (f32, f32) = (0.5, 1.0);
pub const VALLEY_RANGE: (f32, f32) = (0.0, 0.5);

/// User-tunable terrain display state.
///
/// No ordering is enforced between `peak` and `valley`; `peak < valley`
/// renders an inverted ramp and is not an error.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayParameters {
    pub peak: f32,
    pub valley: f32,
    pub width_factor: f32,
}

impl Default for DisplayParameters {
    fn default() -> Self {
        Self {
            peak: 0.8,
            valley: 0.2,
            width_factor: 1000.0,
        }
    }
}

impl DisplayParameters {
    /// Returns false when the value was rejected.
    pub fn set_peak(&mut self, value: f32) -> bool {
        match sanitize(value, PEAK_RANGE.0, PEAK_RANGE.1, "peak") {
            Some(v) => {
                self.peak = v;
                true
            }
            None => false,
        }
    }

    pub fn set_valley(&mut self, value: f32) -> bool {
        match sanitize(value, VALLEY_RANGE.0, VALLEY_RANGE.1, "valley") {
            Some(v) => {
                self.valley = v;
                true
            }
            None => false,
        }
    }

    /// Returns true only when the stored width factor actually changed.
    pub fn set_width_factor(&mut self, value: f32) -> bool {
        match sanitize(value, 0.0, f32::MAX, "width_factor") {
            Some(v) if v != self.width_factor => {
                self.width_factor = v;
                true
            }
            _ => false,
        }
    }

    pub fn uniform(&self) -> DisplayUniform {
        DisplayUniform {
            peak: self.peak,
            valley: self.valley,
            _pad: [0.0; 2],
        }
    }
}

/// Clamp a value to a range with a warning message.
pub fn clamp_with_warning(value: f32, min: f32, max: f32, name: &str) -> f32 {
    if value < min || value > max {
        let clamped = value.clamp(min, max);
        log::warn!("clamping {name} from {value} to {clamped}");
        clamped
    } else {
        value
    }
}

fn sanitize(value: f32, min: f32, max: f32, name: &str) -> Option<f32> {
    if !value.is_finite() {
        log::warn!("ignoring non-finite {name} value {value}");
        return None;
    }
    Some(clamp_with_warning(value, min, max, name))
}

/// Uniform block consumed by the terrain fragment stage (binding 2).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DisplayUniform {
    pub peak: f32,
    pub valley: f32,
    pub _pad: [f32; 2],
}

/// Uniform block holding the presentation size in pixels (binding 3).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct SurfaceSizeUniform {
    pub width: u32,
    pub height: u32,
    pub _pad: [u32; 2],
}

impl SurfaceSizeUniform {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_win() {
        let mut params = DisplayParameters::default();
        params.set_peak(0.9);
        params.set_peak(0.6);
        params.set_valley(0.1);
        params.set_valley(0.3);
        assert_eq!(params.uniform().peak, 0.6);
        assert_eq!(params.uniform().valley, 0.3);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let mut params = DisplayParameters::default();
        assert!(params.set_peak(1.5));
        assert_eq!(params.peak, 1.0);
        assert!(params.set_valley(-0.2));
        assert_eq!(params.valley, 0.0);
        assert!(params.set_width_factor(-10.0));
        assert_eq!(params.width_factor, 0.0);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let mut params = DisplayParameters::default();
        assert!(!params.set_peak(f32::NAN));
        assert!(!params.set_width_factor(f32::INFINITY));
        assert_eq!(params, DisplayParameters::default());
    }

    #[test]
    fn unchanged_width_factor_reports_no_change() {
        let mut params = DisplayParameters::default();
        assert!(!params.set_width_factor(params.width_factor));
        assert!(params.set_width_factor(-1.0));
        // Clamps to the value already stored.
        assert!(!params.set_width_factor(-5.0));
        assert!(params.set_width_factor(250.0));
        assert_eq!(params.width_factor, 250.0);
    }

    #[test]
    fn equal_thresholds_are_accepted() {
        let mut params = DisplayParameters::default();
        params.set_peak(0.5);
        params.set_valley(0.5);
        assert_eq!(params.peak, params.valley);
    }

    #[test]
    fn uniform_layouts_are_16_bytes() {
        assert_eq!(std::mem::size_of::<DisplayUniform>(), 16);
        assert_eq!(std::mem::size_of::<SurfaceSizeUniform>(), 16);
    }
}
