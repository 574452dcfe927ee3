//! The renderer as a single owned value.
//!
//! `GraphTerrainRenderer` holds every GPU resource the pipeline needs (device
//! handles, field engine, geometry buffers, compositor) and exposes the
//! operations the UI shell calls. All methods take `&mut self` or `&self` on
//! one thread; cross-thread producers go through
//! [`crate::viewer::RendererHandle`].

use crate::colormap::ColormapSource;
use crate::compositor::{Compositor, FrameStatus, FrameTarget};
use crate::config::RendererConfig;
use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;
use crate::params::DisplayParameters;
use crate::readback;
use crate::resources::GpuResources;
use crate::sample::{resolve_edge_indices, EdgeSet, Sample, SampleBatch, SubmitReport};
use crate::terrain::{EngineSettings, RecomputeStats, RecomputeTier, TerrainFieldEngine};

pub struct GraphTerrainRenderer {
    resources: GpuResources,
    engine: TerrainFieldEngine,
    compositor: Compositor,
    display: DisplayParameters,
    nodes: Vec<Sample>,
    /// Set while edges are given as node indices; they then follow every node update.
    edge_indices: Option<Vec<(u32, u32)>>,
}

impl GraphTerrainRenderer {
    pub fn new(
        ctx: GpuContext,
        config: &RendererConfig,
        target: FrameTarget,
        colormap: &ColormapSource,
    ) -> RenderResult<Self> {
        config.validate()?;
        let resources = GpuResources::new(ctx);
        let (width, height) = target.size();
        let ramp = colormap.load(&resources)?;

        let engine = TerrainFieldEngine::new(
            &resources,
            EngineSettings {
                width,
                height,
                kernel_scale: config.kernel_scale,
                preview_stride: config.preview_stride,
                width_factor: config.display.width_factor,
            },
        )?;
        let compositor = Compositor::new(&resources, config, target, ramp)?;

        Ok(Self {
            resources,
            engine,
            compositor,
            display: config.display,
            nodes: Vec::new(),
            edge_indices: None,
        })
    }

    /// Renderer drawing into an offscreen texture of `config.width x config.height`.
    pub fn offscreen(
        ctx: GpuContext,
        config: &RendererConfig,
        colormap: &ColormapSource,
    ) -> RenderResult<Self> {
        config.validate()?;
        let target = {
            let resources = GpuResources::new(ctx.clone());
            FrameTarget::offscreen(&resources, config.width, config.height)?
        };
        Self::new(ctx, config, target, colormap)
    }

    /// Replace the node set, regenerate the field and rebuild node quads.
    ///
    /// With `is_final` the batch also replaces the stored value channel and
    /// the field is evaluated at full resolution.
    ///
    /// Samples with non-finite data keep their index; they are left out of
    /// the field and the node layer, and index edges touching them are dropped.
    pub fn submit_nodes(&mut self, batch: SampleBatch) -> RenderResult<SubmitReport> {
        let non_finite = batch.non_finite_count();
        if non_finite > 0 {
            log::warn!(
                "skipping {non_finite} of {} samples with non-finite data",
                batch.len()
            );
        }
        let report = self.engine.submit(&self.resources, &batch)?;
        self.compositor
            .nodes_mut()
            .upload(&self.resources, &batch.samples)?;
        self.nodes = batch.samples;

        if let Some(indices) = self.edge_indices.as_ref() {
            let (edges, _) = resolve_edge_indices(indices, &self.nodes);
            self.compositor.edges_mut().upload(&self.resources, &edges)?;
        }

        log::debug!(
            "nodes submitted: {} accepted, {} dropped, final={}",
            report.accepted,
            report.dropped,
            batch.is_final
        );
        Ok(report)
    }

    /// Replace the edge set with explicit segments.
    pub fn submit_edges(&mut self, edges: EdgeSet) -> RenderResult<SubmitReport> {
        let (edges, report) = edges.sanitized();
        self.edge_indices = None;
        self.compositor.edges_mut().upload(&self.resources, &edges)?;
        log::debug!("edges submitted: {} segments", edges.len());
        Ok(report)
    }

    /// Replace the edge set with `(source, target)` node indices resolved
    /// against the current nodes, and keep resolving on later node updates.
    pub fn submit_edge_indices(&mut self, indices: &[(u32, u32)]) -> RenderResult<SubmitReport> {
        let (edges, report) = resolve_edge_indices(indices, &self.nodes);
        self.edge_indices = Some(indices.to_vec());
        self.compositor.edges_mut().upload(&self.resources, &edges)?;
        log::debug!(
            "edge indices submitted: {} segments from {} pairs",
            edges.len(),
            indices.len()
        );
        Ok(report)
    }

    /// Changes the kernel width and regenerates the field from the retained batch.
    pub fn set_width_factor(&mut self, width_factor: f32) -> RenderResult<()> {
        if self.display.set_width_factor(width_factor) {
            self.engine
                .set_width_factor(&self.resources, self.display.width_factor)?;
        }
        Ok(())
    }

    /// Takes effect on the next frame; no recompute.
    pub fn set_peak_value(&mut self, peak: f32) {
        self.display.set_peak(peak);
    }

    pub fn set_valley_value(&mut self, valley: f32) {
        self.display.set_valley(valley);
    }

    pub fn display_parameters(&self) -> DisplayParameters {
        self.display
    }

    /// Resize the color target, depth buffer and field. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.compositor.resize(&self.resources, width, height)?;
        self.engine.resize(&self.resources, width, height)
    }

    /// Draw one frame with the current geometry, field and display parameters.
    ///
    /// Fails with [`RenderError::Device`] once any device error has been
    /// recorded, including asynchronous ones from earlier frames.
    pub fn render_frame(&mut self) -> RenderResult<FrameStatus> {
        self.resources.context().health().check()?;
        self.compositor
            .render_frame(&self.resources, &self.engine, self.display.uniform())
    }

    /// Copy the current field back to the CPU, row-major from the top-left pixel.
    pub fn read_field(&self) -> RenderResult<Vec<f32>> {
        let (width, height) = self.engine.size();
        readback::read_buffer_f32(
            self.resources.device(),
            self.resources.queue(),
            self.engine.field_buffer(),
            width as usize * height as usize,
        )
        .map_err(|e| RenderError::render(format!("field readback failed: {e}")))
    }

    /// Tight RGBA8 copy of the last frame. `None` for window surfaces.
    pub fn read_frame(&self) -> RenderResult<Option<Vec<u8>>> {
        let Some(texture) = self.compositor.target().texture() else {
            return Ok(None);
        };
        readback::read_texture_tight(self.resources.device(), self.resources.queue(), texture)
            .map(Some)
            .map_err(|e| RenderError::render(format!("frame readback failed: {e}")))
    }

    pub fn size(&self) -> (u32, u32) {
        self.engine.size()
    }

    /// Nodes in the last batch, counting entries skipped as non-finite.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_vertex_count(&self) -> u32 {
        self.compositor.nodes().vertex_count()
    }

    pub fn edge_vertex_count(&self) -> u32 {
        self.compositor.edges().vertex_count()
    }

    /// Generation of the node vertex buffer; bumps on every reallocation.
    pub fn node_buffer_generation(&self) -> u64 {
        self.compositor.nodes().buffer().generation()
    }

    pub fn recompute_stats(&self) -> RecomputeStats {
        self.engine.stats()
    }

    pub fn recompute_tier(&self) -> RecomputeTier {
        self.engine.tier()
    }

    pub fn radius_px(&self) -> f32 {
        self.engine.radius_px()
    }

    pub fn frames(&self) -> u64 {
        self.compositor.frames()
    }

    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }
}
