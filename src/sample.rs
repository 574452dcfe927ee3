//! Input data model: node samples and edge segments produced by the external
//! layout simulator.
//!
//! Every submission replaces the previous one wholesale. A node keeps its
//! index for the lifetime of a batch, so entries with non-finite data stay in
//! place and are skipped by the field, the node layer and index edges.

use glam::Vec2;

/// A single node: position in normalized device coordinates plus the scalar
/// that feeds the terrain field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub position: [f32; 2],
    pub value: f32,
}

impl Sample {
    pub fn new(x: f32, y: f32, value: f32) -> Self {
        Self {
            position: [x, y],
            value,
        }
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::from(self.position)
    }

    pub fn is_finite(&self) -> bool {
        self.position[0].is_finite() && self.position[1].is_finite() && self.value.is_finite()
    }
}

/// One simulator tick. `is_final` marks the layout fixed point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBatch {
    pub samples: Vec<Sample>,
    pub is_final: bool,
}

impl SampleBatch {
    pub fn new(samples: Vec<Sample>, is_final: bool) -> Self {
        Self { samples, is_final }
    }

    /// Builds a batch from `[x0, y0, v0, x1, y1, v1, ...]`.
    ///
    /// A trailing partial triple is dropped and reported.
    pub fn from_interleaved(data: &[f32], is_final: bool) -> (Self, SubmitReport) {
        let chunks = data.chunks_exact(3);
        let remainder = chunks.remainder().len();
        let samples: Vec<Sample> = chunks.map(|c| Sample::new(c[0], c[1], c[2])).collect();
        let mut report = SubmitReport::default();
        if remainder != 0 {
            log::warn!(
                "node data length {} is not a multiple of 3; dropping {} trailing floats",
                data.len(),
                remainder
            );
            report.dropped += 1;
        }
        (Self { samples, is_final }, report)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples with non-finite coordinates or values.
    pub fn non_finite_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_finite()).count()
    }
}

/// A line segment between two points in normalized device coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeSegment {
    pub start: [f32; 2],
    pub end: [f32; 2],
}

impl EdgeSegment {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            start: [x0, y0],
            end: [x1, y1],
        }
    }

    fn is_finite(&self) -> bool {
        self.start.iter().chain(self.end.iter()).all(|c| c.is_finite())
    }
}

/// Ordered edge segments; updated independently from node samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeSet {
    pub segments: Vec<EdgeSegment>,
}

impl EdgeSet {
    pub fn new(segments: Vec<EdgeSegment>) -> Self {
        Self { segments }
    }

    /// Builds an edge set from `[x0, y0, x1, y1, ...]`.
    pub fn from_flat(data: &[f32]) -> (Self, SubmitReport) {
        let chunks = data.chunks_exact(4);
        let remainder = chunks.remainder().len();
        let segments = chunks
            .map(|c| EdgeSegment::new(c[0], c[1], c[2], c[3]))
            .collect();
        let mut report = SubmitReport::default();
        if remainder != 0 {
            log::warn!(
                "edge data length {} is not a multiple of 4; dropping {} trailing floats",
                data.len(),
                remainder
            );
            report.dropped += 1;
        }
        (Self { segments }, report)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub(crate) fn sanitized(mut self) -> (Self, SubmitReport) {
        let before = self.segments.len();
        self.segments.retain(EdgeSegment::is_finite);
        let dropped = before - self.segments.len();
        if dropped > 0 {
            log::warn!("dropping {dropped} of {before} edges with non-finite endpoints");
        }
        let report = SubmitReport {
            accepted: self.segments.len(),
            dropped,
        };
        (self, report)
    }
}

/// Resolve `(source, target)` node indices against the current node positions.
///
/// Indices that are out of range or name a non-finite node are dropped and
/// counted; self-loops and zero-length edges are skipped without being
/// counted as mismatches.
pub fn resolve_edge_indices(indices: &[(u32, u32)], nodes: &[Sample]) -> (EdgeSet, SubmitReport) {
    let node_count = nodes.len();
    let mut segments = Vec::with_capacity(indices.len());
    let mut report = SubmitReport::default();

    for &(from_idx, to_idx) in indices {
        let (from, to) = (from_idx as usize, to_idx as usize);
        if from >= node_count || to >= node_count {
            report.dropped += 1;
            continue;
        }
        if !nodes[from].is_finite() || !nodes[to].is_finite() {
            report.dropped += 1;
            continue;
        }
        if from == to {
            continue;
        }
        let start = nodes[from].pos();
        let end = nodes[to].pos();
        if (end - start).length() < 1e-6 {
            continue;
        }
        segments.push(EdgeSegment {
            start: start.to_array(),
            end: end.to_array(),
        });
    }

    if report.dropped > 0 {
        log::warn!(
            "dropping {} of {} edges referencing missing or non-finite nodes (0..{})",
            report.dropped,
            indices.len(),
            node_count
        );
    }
    report.accepted = segments.len();
    (EdgeSet { segments }, report)
}

/// Outcome of a submission: how many entries made it to the GPU and how many
/// were dropped as data mismatches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub accepted: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_triples_map_to_samples() {
        let (batch, report) = SampleBatch::from_interleaved(&[0.0, 0.5, 0.9, -1.0, 1.0, 0.1], true);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.samples[1], Sample::new(-1.0, 1.0, 0.1));
        assert!(batch.is_final);
        assert_eq!(report.dropped, 0);
    }

    #[test]
    fn trailing_partial_triple_is_dropped() {
        let (batch, report) = SampleBatch::from_interleaved(&[0.0, 0.0, 1.0, 0.5, 0.5], false);
        assert_eq!(batch.len(), 1);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn non_finite_samples_are_counted_in_place() {
        let batch = SampleBatch::new(
            vec![
                Sample::new(0.0, 0.0, 1.0),
                Sample::new(f32::NAN, 0.0, 1.0),
                Sample::new(0.2, 0.2, f32::INFINITY),
                Sample::new(3.0, -4.0, 0.5),
            ],
            false,
        );
        assert_eq!(batch.non_finite_count(), 2);
        assert_eq!(batch.len(), 4);
        // Out-of-range but finite positions are valid; they clip during raster.
        assert!(batch.samples[3].is_finite());
    }

    #[test]
    fn edge_indices_resolve_against_nodes() {
        let nodes = vec![
            Sample::new(-0.5, 0.0, 0.0),
            Sample::new(0.5, 0.0, 0.0),
            Sample::new(0.0, 0.5, 0.0),
        ];
        let (edges, report) = resolve_edge_indices(&[(0, 1), (1, 2), (2, 7), (1, 1)], &nodes);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges.segments[0], EdgeSegment::new(-0.5, 0.0, 0.5, 0.0));
        assert_eq!(report, SubmitReport { accepted: 2, dropped: 1 });
    }

    #[test]
    fn edge_indices_skip_non_finite_nodes_without_renumbering() {
        let nodes = vec![
            Sample::new(-0.5, 0.0, 0.0),
            Sample::new(f32::NAN, f32::NAN, 0.0),
            Sample::new(0.5, 0.5, 0.0),
        ];
        let (edges, report) = resolve_edge_indices(&[(0, 2), (0, 1), (1, 2)], &nodes);
        assert_eq!(edges.segments, vec![EdgeSegment::new(-0.5, 0.0, 0.5, 0.5)]);
        assert_eq!(report, SubmitReport { accepted: 1, dropped: 2 });
    }

    #[test]
    fn flat_edges_drop_partial_segment() {
        let (edges, report) = EdgeSet::from_flat(&[0.0, 0.0, 1.0, 1.0, 0.5]);
        assert_eq!(edges.len(), 1);
        assert_eq!(report.dropped, 1);
    }
}
