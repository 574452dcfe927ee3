//! graphterrain: GPU renderer for a terrain field interpolated from graph node
//! samples, with node quads and edge lines drawn on top.
//! Rust: wgpu 0.19, winit 0.29. Headless use goes through
//! [`GraphTerrainRenderer::offscreen`]; windowed use through [`viewer::run_viewer`].

pub mod colormap;
pub mod compositor;
pub mod config;
pub mod error;
pub mod gpu;
pub mod params;
pub mod readback;
pub mod renderer;
pub mod resources;
pub mod sample;
pub mod scheduler;
pub mod terrain;
pub mod vector;
pub mod viewer;

pub use colormap::{ColorRamp, ColormapSource};
pub use compositor::{Compositor, FrameStatus, FrameTarget};
pub use config::{ConfigError, DepthBands, RendererConfig};
pub use error::{RenderError, RenderResult};
pub use gpu::{DeviceHealth, GpuContext};
pub use params::DisplayParameters;
pub use renderer::GraphTerrainRenderer;
pub use resources::{GpuResources, ReplaceableBuffer};
pub use sample::{EdgeSegment, EdgeSet, Sample, SampleBatch, SubmitReport};
pub use scheduler::{FrameScheduler, SchedulerState};
pub use terrain::{RecomputeStats, RecomputeTier, TerrainFieldEngine};
pub use viewer::{run_viewer, RendererEvent, RendererHandle};
