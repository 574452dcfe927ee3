//! Node layer: one axis-aligned quad (two triangles, six vertices) per sample.
//! No instancing; the vertex buffer is rebuilt wholesale on every update.

use crate::error::RenderResult;
use crate::resources::{GpuResources, ReplaceableBuffer};
use crate::sample::Sample;

use super::pipeline::{LayerPipeline, LayerUniform};

pub const VERTICES_PER_NODE: u32 = 6;

/// Expand each sample into a square of half-width `radius` centred on it.
/// Samples with non-finite data get no quad.
pub fn build_node_quads(samples: &[Sample], radius: f32) -> Vec<[f32; 2]> {
    let mut vertices = Vec::with_capacity(samples.len() * VERTICES_PER_NODE as usize);
    for sample in samples.iter().filter(|s| s.is_finite()) {
        let [x, y] = sample.position;
        vertices.extend_from_slice(&[
            [x + radius, y - radius],
            [x - radius, y - radius],
            [x - radius, y + radius],
            [x + radius, y - radius],
            [x - radius, y + radius],
            [x + radius, y + radius],
        ]);
    }
    vertices
}

pub struct NodeGeometry {
    layer: LayerPipeline,
    vertices: ReplaceableBuffer,
    radius: f32,
}

impl NodeGeometry {
    pub fn new(
        resources: &GpuResources,
        target_format: wgpu::TextureFormat,
        radius: f32,
        color: [f32; 4],
        depth: f32,
    ) -> RenderResult<Self> {
        let layer = LayerPipeline::new(
            resources,
            "graphterrain.Node",
            wgpu::PrimitiveTopology::TriangleList,
            target_format,
            LayerUniform::new(color, depth),
        )?;
        Ok(Self {
            layer,
            vertices: ReplaceableBuffer::new("graphterrain.Node.Vertices", wgpu::BufferUsages::VERTEX),
            radius,
        })
    }

    pub fn upload(&mut self, resources: &GpuResources, samples: &[Sample]) -> RenderResult<()> {
        let vertices = build_node_quads(samples, self.radius);
        self.vertices.replace(resources, &vertices)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len()
    }

    pub fn buffer(&self) -> &ReplaceableBuffer {
        &self.vertices
    }

    /// Issues six vertices per node; nothing when there are no nodes.
    pub fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>) {
        let Some(buffer) = self.vertices.get() else {
            return;
        };
        pass.set_pipeline(&self.layer.pipeline);
        pass.set_bind_group(0, &self.layer.bind_group, &[]);
        pass.set_vertex_buffer(0, buffer.slice(..));
        pass.draw(0..self.vertices.len(), 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_vertices_per_node() {
        let samples: Vec<Sample> = (0..7).map(|i| Sample::new(i as f32 * 0.1, 0.0, 1.0)).collect();
        let vertices = build_node_quads(&samples, 0.01);
        assert_eq!(vertices.len(), 42);
    }

    #[test]
    fn quads_are_axis_aligned_and_centred() {
        let radius = 0.02;
        let vertices = build_node_quads(&[Sample::new(0.3, -0.4, 0.5)], radius);
        let xs: Vec<f32> = vertices.iter().map(|v| v[0]).collect();
        let ys: Vec<f32> = vertices.iter().map(|v| v[1]).collect();
        for x in &xs {
            assert!((x - 0.3).abs() - radius < 1e-6);
        }
        for y in &ys {
            assert!((y + 0.4).abs() - radius < 1e-6);
        }
        let cx = xs.iter().sum::<f32>() / 6.0;
        let cy = ys.iter().sum::<f32>() / 6.0;
        assert!((cx - 0.3).abs() < 1e-6);
        assert!((cy + 0.4).abs() < 1e-6);
    }

    #[test]
    fn non_finite_samples_get_no_quad() {
        let samples = [
            Sample::new(0.0, 0.0, 1.0),
            Sample::new(f32::NAN, 0.0, 1.0),
            Sample::new(0.5, 0.5, f32::INFINITY),
        ];
        let vertices = build_node_quads(&samples, 0.01);
        assert_eq!(vertices.len(), VERTICES_PER_NODE as usize);
        assert!(vertices.iter().all(|v| v[0].abs() <= 0.01 && v[1].abs() <= 0.01));
    }

    #[test]
    fn empty_input_yields_no_vertices() {
        assert!(build_node_quads(&[], 0.01).is_empty());
    }
}
