//! Vector overlays drawn above the terrain: node quads and edge lines.
//! Separate pipelines, shared flat-color shader, one depth band per layer.

pub mod edge;
pub mod node;
pub mod pipeline;

pub use edge::{build_edge_vertices, EdgeGeometry, VERTICES_PER_EDGE};
pub use node::{build_node_quads, NodeGeometry, VERTICES_PER_NODE};
pub use pipeline::{LayerPipeline, LayerUniform};
