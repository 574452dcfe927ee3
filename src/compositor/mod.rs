// src/compositor/mod.rs
// Render compositor: one depth-tested pass drawing nodes, edges and terrain per frame
// RELEVANT FILES: src/compositor/target.rs, src/compositor/terrain_pass.rs, src/vector/mod.rs, src/renderer.rs

pub mod target;
pub mod terrain_pass;

pub use target::{AcquiredFrame, FrameTarget, OFFSCREEN_FORMAT};
pub use terrain_pass::TerrainPass;

use crate::colormap::ColorRamp;
use crate::config::RendererConfig;
use crate::error::RenderResult;
use crate::params::{DisplayUniform, SurfaceSizeUniform};
use crate::resources::GpuResources;
use crate::terrain::TerrainFieldEngine;
use crate::vector::{EdgeGeometry, NodeGeometry};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Outcome of one frame attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The target had no image to give (lost, outdated or timed out surface).
    Skipped,
}

/// Owns the three layer pipelines, the shared depth buffer and the color target.
pub struct Compositor {
    target: FrameTarget,
    depth_view: wgpu::TextureView,
    ramp: ColorRamp,
    nodes: NodeGeometry,
    edges: EdgeGeometry,
    terrain: TerrainPass,
    clear_color: wgpu::Color,
    frames: u64,
}

impl Compositor {
    pub fn new(
        resources: &GpuResources,
        config: &RendererConfig,
        target: FrameTarget,
        ramp: ColorRamp,
    ) -> RenderResult<Self> {
        let format = target.format();
        let (width, height) = target.size();
        let depth_view = create_depth_view(resources, width, height)?;

        let nodes = NodeGeometry::new(
            resources,
            format,
            config.node_radius,
            config.node_color,
            config.depth.node,
        )?;
        let edges = EdgeGeometry::new(resources, format, config.edge_color, config.depth.edge)?;
        let terrain = TerrainPass::new(
            resources,
            format,
            config.depth.terrain,
            config.display.uniform(),
            SurfaceSizeUniform::new(width, height),
        )?;

        log::info!("compositor ready ({width}x{height}, {format:?})");
        Ok(Self {
            target,
            depth_view,
            ramp,
            nodes,
            edges,
            terrain,
            clear_color: config.clear_wgpu_color(),
            frames: 0,
        })
    }

    pub fn nodes(&self) -> &NodeGeometry {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut NodeGeometry {
        &mut self.nodes
    }

    pub fn edges(&self) -> &EdgeGeometry {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut EdgeGeometry {
        &mut self.edges
    }

    pub fn target(&self) -> &FrameTarget {
        &self.target
    }

    /// Frames presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Draw one frame: node, then edge, then terrain, in a single pass.
    ///
    /// `display` is read once here; parameter changes made while a frame is
    /// in flight land in the next one.
    pub fn render_frame(
        &mut self,
        resources: &GpuResources,
        engine: &TerrainFieldEngine,
        display: DisplayUniform,
    ) -> RenderResult<FrameStatus> {
        self.terrain.write_display(resources, display);
        self.terrain.bind_field(
            resources,
            &self.ramp,
            engine.field_buffer(),
            engine.field_generation(),
        );

        let Some(frame) = self.target.acquire(resources.device())? else {
            return Ok(FrameStatus::Skipped);
        };

        let mut encoder = resources
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("graphterrain.Frame.Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("graphterrain.Frame.Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.nodes.draw(&mut pass);
            self.edges.draw(&mut pass);
            self.terrain.draw(&mut pass);
        }
        resources.queue().submit(std::iter::once(encoder.finish()));
        frame.present();

        self.frames += 1;
        log::trace!(
            "frame {}: {} node vertices, {} edge vertices",
            self.frames,
            self.nodes.vertex_count(),
            self.edges.vertex_count()
        );
        Ok(FrameStatus::Presented)
    }

    /// Reconfigure the target and reallocate the depth buffer. Zero sizes are ignored.
    pub fn resize(&mut self, resources: &GpuResources, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 || (width, height) == self.target.size() {
            return Ok(());
        }
        self.target.resize(resources, width, height)?;
        self.depth_view = create_depth_view(resources, width, height)?;
        self.terrain
            .write_surface_size(resources, SurfaceSizeUniform::new(width, height));
        log::info!("compositor resized to {width}x{height}");
        Ok(())
    }
}

fn create_depth_view(
    resources: &GpuResources,
    width: u32,
    height: u32,
) -> RenderResult<wgpu::TextureView> {
    let texture = resources.create_texture(&wgpu::TextureDescriptor {
        label: Some("graphterrain.Frame.Depth"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })?;
    Ok(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}
