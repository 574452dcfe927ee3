//! Terrain layer: a static full-screen quad at the terrain depth band whose
//! fragment stage reads the field buffer directly.

use crate::colormap::ColorRamp;
use crate::error::RenderResult;
use crate::params::{DisplayUniform, SurfaceSizeUniform};
use crate::resources::GpuResources;
use crate::vector::pipeline::depth_state;

pub const QUAD_VERTEX_COUNT: u32 = 6;

fn full_screen_quad(depth: f32) -> [[f32; 4]; 6] {
    [
        [-1.0, -1.0, depth, 1.0],
        [1.0, -1.0, depth, 1.0],
        [1.0, 1.0, depth, 1.0],
        [-1.0, -1.0, depth, 1.0],
        [1.0, 1.0, depth, 1.0],
        [-1.0, 1.0, depth, 1.0],
    ]
}

pub struct TerrainPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    quad: wgpu::Buffer,
    display_buffer: wgpu::Buffer,
    size_buffer: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
    bound_field: Option<u64>,
}

impl TerrainPass {
    pub fn new(
        resources: &GpuResources,
        target_format: wgpu::TextureFormat,
        depth: f32,
        display: DisplayUniform,
        surface_size: SurfaceSizeUniform,
    ) -> RenderResult<Self> {
        let device = resources.device();
        let shader = resources.create_shader(
            "graphterrain.terrain_display.wgsl",
            include_str!("../shaders/terrain_display.wgsl"),
        )?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("graphterrain.Terrain.BindGroupLayout"),
            entries: &[
                // Color ramp
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Peak/valley
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Surface size
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Field
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("graphterrain.Terrain.PipelineLayout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x4];
        let pipeline = resources.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("graphterrain.Terrain.Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 4]>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &ATTRIBUTES,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(depth_state()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })?;

        let quad = resources.create_buffer_init(
            "graphterrain.Terrain.Quad",
            bytemuck::cast_slice(&full_screen_quad(depth)),
            wgpu::BufferUsages::VERTEX,
        )?;
        let display_buffer = resources.create_buffer_init(
            "graphterrain.Terrain.Display",
            bytemuck::bytes_of(&display),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;
        let size_buffer = resources.create_buffer_init(
            "graphterrain.Terrain.SurfaceSize",
            bytemuck::bytes_of(&surface_size),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;

        Ok(Self {
            pipeline,
            bind_group_layout,
            quad,
            display_buffer,
            size_buffer,
            bind_group: None,
            bound_field: None,
        })
    }

    pub fn write_display(&self, resources: &GpuResources, display: DisplayUniform) {
        resources.write_buffer(&self.display_buffer, 0, bytemuck::bytes_of(&display));
    }

    pub fn write_surface_size(&self, resources: &GpuResources, size: SurfaceSizeUniform) {
        resources.write_buffer(&self.size_buffer, 0, bytemuck::bytes_of(&size));
    }

    /// Rebind the field when the engine has reallocated it.
    pub fn bind_field(
        &mut self,
        resources: &GpuResources,
        ramp: &ColorRamp,
        field: &wgpu::Buffer,
        field_generation: u64,
    ) {
        if self.bound_field == Some(field_generation) && self.bind_group.is_some() {
            return;
        }
        let bind_group = resources
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("graphterrain.Terrain.BindGroup"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&ramp.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&ramp.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.display_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.size_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: field.as_entire_binding(),
                    },
                ],
            });
        self.bind_group = Some(bind_group);
        self.bound_field = Some(field_generation);
    }

    pub fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>) {
        let Some(bind_group) = self.bind_group.as_ref() else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space_at_band_depth() {
        let quad = full_screen_quad(0.9);
        assert!(quad.iter().all(|v| v[2] == 0.9 && v[3] == 1.0));
        let xs: Vec<f32> = quad.iter().map(|v| v[0]).collect();
        let ys: Vec<f32> = quad.iter().map(|v| v[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
    }
}
