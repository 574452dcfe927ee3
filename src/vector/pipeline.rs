// src/vector/pipeline.rs
// Shared pipeline and uniform plumbing for the node and edge layers
// RELEVANT FILES: src/shaders/layer.wgsl, src/vector/node.rs, src/vector/edge.rs

use bytemuck::{Pod, Zeroable};

use crate::compositor::DEPTH_FORMAT;
use crate::error::RenderResult;
use crate::resources::GpuResources;

/// Per-layer color and depth band (std140: 32 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LayerUniform {
    pub color: [f32; 4],
    pub depth: f32,
    pub _pad: [f32; 3],
}

impl LayerUniform {
    pub fn new(color: [f32; 4], depth: f32) -> Self {
        Self {
            color,
            depth,
            _pad: [0.0; 3],
        }
    }
}

/// Pipeline, uniform and bind group for one flat-colored primitive layer.
pub struct LayerPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LayerPipeline {
    pub fn new(
        resources: &GpuResources,
        label: &str,
        topology: wgpu::PrimitiveTopology,
        target_format: wgpu::TextureFormat,
        uniform: LayerUniform,
    ) -> RenderResult<Self> {
        let device = resources.device();
        let shader = resources.create_shader(
            &format!("{label}.layer.wgsl"),
            include_str!("../shaders/layer.wgsl"),
        )?;

        let uniform_buffer = resources.create_buffer_init(
            &format!("{label}.Uniform"),
            bytemuck::bytes_of(&uniform),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )?;

        let bind_group_layout = create_uniform_bind_group_layout(device, label);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}.BindGroup")),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label}.PipelineLayout")),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = resources.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{label}.Pipeline")),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[position_vertex_layout()],
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
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(depth_state()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
        })
    }
}

/// Tightly packed `vec2<f32>` positions at shader location 0.
pub fn position_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

/// Depth test shared by every layer: nearer bands win, ties keep the first draw.
pub fn depth_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn create_uniform_bind_group_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label}.BindGroupLayout")),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_uniform_is_std140_sized() {
        assert_eq!(std::mem::size_of::<LayerUniform>(), 32);
    }

    #[test]
    fn vertex_layout_is_two_floats() {
        let layout = position_vertex_layout();
        assert_eq!(layout.array_stride, 8);
        assert_eq!(layout.attributes.len(), 1);
    }
}
