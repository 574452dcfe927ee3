// src/terrain/engine.rs
// GPU terrain field engine: preview and final recompute tiers over a resident field buffer
// RELEVANT FILES: src/terrain/kernel.rs, src/shaders/terrain_field.wgsl, src/compositor/terrain_pass.rs

use bytemuck::{Pod, Zeroable};

use super::kernel::{self, FALLOFF};
use crate::error::RenderResult;
use crate::resources::{GpuResources, ReplaceableBuffer};
use crate::sample::{SampleBatch, SubmitReport};

const WORKGROUP_SIZE: u32 = 8;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct FieldParams {
    width: u32,
    height: u32,
    sample_count: u32,
    stride: u32,
    radius_px: f32,
    falloff: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSample {
    pub position: [f32; 2],
    pub value: f32,
    pub _pad: f32,
}

/// Which recompute path produced the current field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecomputeTier {
    /// Per-tick: stored values, new positions, block-coarsened grid.
    Preview,
    /// At convergence: fresh values, every pixel evaluated.
    Final,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecomputeStats {
    pub preview_passes: u64,
    pub final_passes: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    pub width: u32,
    pub height: u32,
    pub kernel_scale: f32,
    pub preview_stride: u32,
    pub width_factor: f32,
}

/// Owns the per-pixel intensity buffer read by the terrain fragment stage.
pub struct TerrainFieldEngine {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    sample_buffer: ReplaceableBuffer,
    field_buffer: wgpu::Buffer,
    field_generation: u64,
    settings: EngineSettings,
    positions: Vec<[f32; 2]>,
    values: Vec<f32>,
    has_value_channel: bool,
    tier: RecomputeTier,
    stats: RecomputeStats,
}

impl TerrainFieldEngine {
    pub fn new(resources: &GpuResources, settings: EngineSettings) -> RenderResult<Self> {
        let shader = resources.create_shader(
            "graphterrain.terrain_field.wgsl",
            include_str!("../shaders/terrain_field.wgsl"),
        )?;

        let bind_group_layout =
            resources
                .device()
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("graphterrain.TerrainField.BindGroupLayout"),
                    entries: &[
                        // Params
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        // Samples
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: true },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        // Output field
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: false },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline_layout =
            resources
                .device()
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("graphterrain.TerrainField.PipelineLayout"),
                    bind_group_layouts: &[&bind_group_layout],
                    push_constant_ranges: &[],
                });

        let pipeline = resources.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("graphterrain.TerrainField.Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
        })?;

        let params_buffer = resources.create_buffer(
            "graphterrain.TerrainField.Params",
            std::mem::size_of::<FieldParams>() as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;
        let field_buffer = create_field_buffer(resources, settings.width, settings.height)?;

        // wgpu zero-initialises new buffers, so the field starts as background.
        let engine = Self {
            pipeline,
            bind_group_layout,
            params_buffer,
            sample_buffer: ReplaceableBuffer::new(
                "graphterrain.TerrainField.Samples",
                wgpu::BufferUsages::STORAGE,
            ),
            field_buffer,
            field_generation: 0,
            settings,
            positions: Vec::new(),
            values: Vec::new(),
            has_value_channel: false,
            tier: RecomputeTier::Preview,
            stats: RecomputeStats::default(),
        };
        log::info!(
            "terrain field engine ready ({}x{}, radius {:.1}px)",
            settings.width,
            settings.height,
            engine.radius_px()
        );
        Ok(engine)
    }

    /// Ingest a batch and regenerate the field. Returns how many samples
    /// contributed to the field and how many were dropped.
    ///
    /// Positions and values stay indexed by node, so a non-finite entry only
    /// excludes its own node.
    pub fn submit(
        &mut self,
        resources: &GpuResources,
        batch: &SampleBatch,
    ) -> RenderResult<SubmitReport> {
        self.positions = batch.samples.iter().map(|s| s.position).collect();
        if batch.is_final || !self.has_value_channel {
            self.values = batch.samples.iter().map(|s| s.value).collect();
            self.has_value_channel = true;
        }

        if self.positions.len() > self.values.len() {
            log::warn!(
                "{} samples have no entry in the value channel ({} values); excluded from terrain",
                self.positions.len() - self.values.len(),
                self.values.len()
            );
        }
        let contributing = self.contributing_samples().len();
        let dropped = self.positions.len() - contributing;

        let tier = if batch.is_final {
            RecomputeTier::Final
        } else {
            RecomputeTier::Preview
        };
        self.dispatch(resources, tier)?;
        Ok(SubmitReport {
            accepted: contributing,
            dropped,
        })
    }

    /// Change the kernel width and recompute once at the current tier.
    pub fn set_width_factor(&mut self, resources: &GpuResources, width_factor: f32) -> RenderResult<()> {
        self.settings.width_factor = width_factor;
        self.dispatch(resources, self.tier)
    }

    /// Reallocate the field for a new canvas size and recompute.
    pub fn resize(&mut self, resources: &GpuResources, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 || (width, height) == (self.settings.width, self.settings.height) {
            return Ok(());
        }
        let fresh = create_field_buffer(resources, width, height)?;
        let old = std::mem::replace(&mut self.field_buffer, fresh);
        resources.destroy_buffer(old);
        self.field_generation += 1;
        self.settings.width = width;
        self.settings.height = height;
        log::info!("terrain field reallocated at {width}x{height}");
        self.dispatch(resources, self.tier)
    }

    /// Node-indexed positions paired with stored values, skipping any node
    /// whose position or value is non-finite.
    fn contributing_samples(&self) -> Vec<GpuSample> {
        self.positions
            .iter()
            .zip(self.values.iter())
            .filter(|(position, value)| {
                position[0].is_finite() && position[1].is_finite() && value.is_finite()
            })
            .map(|(&position, &value)| GpuSample {
                position,
                value,
                _pad: 0.0,
            })
            .collect()
    }

    fn dispatch(&mut self, resources: &GpuResources, tier: RecomputeTier) -> RenderResult<()> {
        let mut gpu_samples = self.contributing_samples();
        let sample_count = gpu_samples.len() as u32;
        if gpu_samples.is_empty() {
            // Storage bindings cannot be zero-sized.
            gpu_samples.push(GpuSample::default());
        }
        self.sample_buffer.replace(resources, &gpu_samples)?;

        let stride = match tier {
            RecomputeTier::Preview => self.settings.preview_stride.max(1),
            RecomputeTier::Final => 1,
        };
        let params = FieldParams {
            width: self.settings.width,
            height: self.settings.height,
            sample_count,
            stride,
            radius_px: self.radius_px(),
            falloff: FALLOFF,
            _pad: [0.0; 2],
        };
        resources.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let Some(sample_buffer) = self.sample_buffer.get() else {
            return Ok(());
        };
        let bind_group = resources
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("graphterrain.TerrainField.BindGroup"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: sample_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.field_buffer.as_entire_binding(),
                    },
                ],
            });

        let mut encoder = resources
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("graphterrain.TerrainField.Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("graphterrain.TerrainField.Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let groups_x = self.settings.width.div_ceil(stride).div_ceil(WORKGROUP_SIZE);
            let groups_y = self.settings.height.div_ceil(stride).div_ceil(WORKGROUP_SIZE);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        resources.queue().submit(std::iter::once(encoder.finish()));

        self.tier = tier;
        match tier {
            RecomputeTier::Preview => self.stats.preview_passes += 1,
            RecomputeTier::Final => self.stats.final_passes += 1,
        }
        log::debug!(
            "terrain {:?} recompute: {} samples, stride {}, radius {:.1}px",
            tier,
            sample_count,
            stride,
            params.radius_px
        );
        Ok(())
    }

    pub fn field_buffer(&self) -> &wgpu::Buffer {
        &self.field_buffer
    }

    /// Bumped whenever the field buffer is reallocated.
    pub fn field_generation(&self) -> u64 {
        self.field_generation
    }

    pub fn size(&self) -> (u32, u32) {
        (self.settings.width, self.settings.height)
    }

    pub fn radius_px(&self) -> f32 {
        kernel::radius_px(self.settings.width_factor, self.settings.kernel_scale)
    }

    pub fn width_factor(&self) -> f32 {
        self.settings.width_factor
    }

    pub fn tier(&self) -> RecomputeTier {
        self.tier
    }

    pub fn stats(&self) -> RecomputeStats {
        self.stats
    }
}

fn create_field_buffer(resources: &GpuResources, width: u32, height: u32) -> RenderResult<wgpu::Buffer> {
    let size = width as u64 * height as u64 * std::mem::size_of::<f32>() as u64;
    resources.create_buffer(
        "graphterrain.TerrainField.Field",
        size,
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<FieldParams>(), 32);
        assert_eq!(std::mem::size_of::<GpuSample>(), 16);
    }
}
