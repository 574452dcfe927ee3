//! Edge layer: two vertices per segment drawn as a line list. Thickness is the
//! rasterizer default.

use crate::error::RenderResult;
use crate::resources::{GpuResources, ReplaceableBuffer};
use crate::sample::EdgeSet;

use super::pipeline::{LayerPipeline, LayerUniform};

pub const VERTICES_PER_EDGE: u32 = 2;

pub fn build_edge_vertices(edges: &EdgeSet) -> Vec<[f32; 2]> {
    let mut vertices = Vec::with_capacity(edges.len() * VERTICES_PER_EDGE as usize);
    for segment in &edges.segments {
        vertices.extend_from_slice(&[segment.start, segment.end]);
    }
    vertices
}

pub struct EdgeGeometry {
    layer: LayerPipeline,
    vertices: ReplaceableBuffer,
}

impl EdgeGeometry {
    pub fn new(
        resources: &GpuResources,
        target_format: wgpu::TextureFormat,
        color: [f32; 4],
        depth: f32,
    ) -> RenderResult<Self> {
        let layer = LayerPipeline::new(
            resources,
            "graphterrain.Edge",
            wgpu::PrimitiveTopology::LineList,
            target_format,
            LayerUniform::new(color, depth),
        )?;
        Ok(Self {
            layer,
            vertices: ReplaceableBuffer::new("graphterrain.Edge.Vertices", wgpu::BufferUsages::VERTEX),
        })
    }

    pub fn upload(&mut self, resources: &GpuResources, edges: &EdgeSet) -> RenderResult<()> {
        let vertices = build_edge_vertices(edges);
        self.vertices.replace(resources, &vertices)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len()
    }

    pub fn buffer(&self) -> &ReplaceableBuffer {
        &self.vertices
    }

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
    use crate::sample::EdgeSegment;

    #[test]
    fn two_vertices_per_segment_in_order() {
        let edges = EdgeSet::new(vec![
            EdgeSegment::new(0.0, 0.0, 0.5, 0.5),
            EdgeSegment::new(-1.0, -1.0, 1.0, 1.0),
        ]);
        let vertices = build_edge_vertices(&edges);
        assert_eq!(
            vertices,
            vec![[0.0, 0.0], [0.5, 0.5], [-1.0, -1.0], [1.0, 1.0]]
        );
    }
}
