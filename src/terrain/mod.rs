//! Terrain field: dense per-pixel intensities interpolated from sparse node samples.

pub mod engine;
pub mod kernel;

pub use engine::{EngineSettings, GpuSample, RecomputeStats, RecomputeTier, TerrainFieldEngine};
pub use kernel::{evaluate_field, radius_px, weight, FieldGrid};
