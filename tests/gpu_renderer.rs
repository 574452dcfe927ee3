// tests/gpu_renderer.rs
// Headless end-to-end checks of the field engine, geometry buffers and compositor.
// Every test skips when no GPU adapter is available.

use graphterrain::terrain::{evaluate_field, FieldGrid};
use graphterrain::{
    ColormapSource, EdgeSegment, EdgeSet, FrameStatus, GpuContext, GraphTerrainRenderer,
    RecomputeTier, RendererConfig, Sample, SampleBatch,
};

const SIZE: u32 = 64;

fn test_config() -> RendererConfig {
    let mut config = RendererConfig::default();
    config.width = SIZE;
    config.height = SIZE;
    config.node_radius = 0.05;
    config.display.width_factor = 500.0;
    config
}

fn create_renderer(name: &str) -> Option<GraphTerrainRenderer> {
    let ctx = match GpuContext::headless() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping {name} (no GPU: {e})");
            return None;
        }
    };
    Some(
        GraphTerrainRenderer::offscreen(ctx, &test_config(), &ColormapSource::default())
            .expect("offscreen renderer"),
    )
}

fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [frame[i], frame[i + 1], frame[i + 2], frame[i + 3]]
}

fn grid_batch(count: usize, is_final: bool) -> SampleBatch {
    let samples = (0..count)
        .map(|i| Sample::new(-0.8 + 0.15 * i as f32, 0.3, 0.5))
        .collect();
    SampleBatch::new(samples, is_final)
}

#[test]
fn empty_batch_renders_background() {
    let Some(mut renderer) = create_renderer("empty_batch_renders_background") else {
        return;
    };
    let report = renderer
        .submit_nodes(SampleBatch::new(Vec::new(), true))
        .unwrap();
    assert_eq!(report.accepted, 0);
    assert_eq!(renderer.node_vertex_count(), 0);

    let field = renderer.read_field().unwrap();
    assert_eq!(field.len(), (SIZE * SIZE) as usize);
    assert!(field.iter().all(|v| *v == 0.0));

    assert_eq!(renderer.render_frame().unwrap(), FrameStatus::Presented);
    let frame = renderer.read_frame().unwrap().expect("offscreen frame");
    // Field 0 maps to the low end of the rainbow ramp.
    assert_eq!(pixel(&frame, 0, 0), [0, 0, 255, 255]);
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [0, 0, 255, 255]);
}

#[test]
fn single_node_scenario() {
    let Some(mut renderer) = create_renderer("single_node_scenario") else {
        return;
    };
    renderer.set_peak_value(0.8);
    renderer.set_valley_value(0.2);
    renderer
        .submit_nodes(SampleBatch::new(vec![Sample::new(0.0, 0.0, 0.9)], true))
        .unwrap();
    renderer.submit_edges(EdgeSet::default()).unwrap();
    assert_eq!(renderer.node_vertex_count(), 6);
    assert_eq!(renderer.edge_vertex_count(), 0);

    let field = renderer.read_field().unwrap();
    let centre = field[(SIZE / 2 * SIZE + SIZE / 2) as usize];
    assert!(centre >= 0.8, "centre intensity {centre}");
    // Radius is 20 px; 22 px out the field is background.
    assert_eq!(field[(SIZE / 2 * SIZE + SIZE / 2 + 22) as usize], 0.0);
    assert_eq!(field[0], 0.0);

    assert_eq!(renderer.render_frame().unwrap(), FrameStatus::Presented);
    let frame = renderer.read_frame().unwrap().expect("offscreen frame");
    // Node quad (white) covers the centre and sits in front of the terrain.
    assert_eq!(pixel(&frame, SIZE / 2, SIZE / 2), [255, 255, 255, 255]);
    // Just outside the 1.6 px quad the terrain is still above the peak: top of the ramp.
    assert_eq!(pixel(&frame, SIZE / 2 + 2, SIZE / 2), [255, 0, 0, 255]);
    assert_eq!(pixel(&frame, 0, 0), [0, 0, 255, 255]);
}

#[test]
fn gpu_field_matches_cpu_reference() {
    let Some(mut renderer) = create_renderer("gpu_field_matches_cpu_reference") else {
        return;
    };
    let samples = vec![
        Sample::new(-0.4, 0.2, 0.7),
        Sample::new(0.3, -0.5, 1.0),
        Sample::new(0.35, -0.45, 0.4),
    ];
    renderer
        .submit_nodes(SampleBatch::new(samples.clone(), true))
        .unwrap();
    let gpu = renderer.read_field().unwrap();
    let cpu = evaluate_field(
        &samples,
        FieldGrid {
            width: SIZE,
            height: SIZE,
            radius_px: renderer.radius_px(),
            stride: 1,
        },
    );
    for (i, (g, c)) in gpu.iter().zip(cpu.iter()).enumerate() {
        assert!((g - c).abs() < 1e-3, "pixel {i}: gpu {g} cpu {c}");
    }
}

#[test]
fn gpu_preview_field_matches_cpu_reference() {
    let Some(mut renderer) = create_renderer("gpu_preview_field_matches_cpu_reference") else {
        return;
    };
    let samples = vec![
        Sample::new(-0.4, 0.2, 0.7),
        Sample::new(0.3, -0.5, 1.0),
        Sample::new(0.35, -0.45, 0.4),
    ];
    // The first batch seeds the value channel even when it is not final.
    renderer
        .submit_nodes(SampleBatch::new(samples.clone(), false))
        .unwrap();
    assert_eq!(renderer.recompute_tier(), RecomputeTier::Preview);
    let gpu = renderer.read_field().unwrap();
    let stride = test_config().preview_stride;
    assert!(stride > 1);
    let cpu = evaluate_field(
        &samples,
        FieldGrid {
            width: SIZE,
            height: SIZE,
            radius_px: renderer.radius_px(),
            stride,
        },
    );
    for (i, (g, c)) in gpu.iter().zip(cpu.iter()).enumerate() {
        assert!((g - c).abs() < 1e-3, "pixel {i}: gpu {g} cpu {c}");
    }
}

#[test]
fn non_finite_sample_keeps_node_indices_stable() {
    let Some(mut renderer) = create_renderer("non_finite_sample_keeps_node_indices_stable") else {
        return;
    };
    let positions = [[-0.9, -0.9], [0.9, 0.9], [-0.9, 0.9], [0.0, 0.0]];
    let values = [0.0, f32::NAN, 0.0, 1.0];
    let final_batch = positions
        .iter()
        .zip(values)
        .map(|(p, v)| Sample::new(p[0], p[1], v))
        .collect();
    let report = renderer
        .submit_nodes(SampleBatch::new(final_batch, true))
        .unwrap();
    assert_eq!((report.accepted, report.dropped), (3, 1));
    renderer.submit_edge_indices(&[(0, 2), (0, 1), (2, 3)]).unwrap();
    assert_eq!(renderer.edge_vertex_count(), 4);

    // Same positions, all finite; values come from the stored channel.
    let preview = positions
        .iter()
        .map(|p| Sample::new(p[0], p[1], 0.5))
        .collect();
    let report = renderer
        .submit_nodes(SampleBatch::new(preview, false))
        .unwrap();
    assert_eq!((report.accepted, report.dropped), (3, 1));
    assert_eq!(renderer.node_count(), 4);
    assert_eq!(renderer.node_vertex_count(), 24);

    let field = renderer.read_field().unwrap();
    let at = |x: u32, y: u32| field[(y * SIZE + x) as usize];
    // The centre node keeps its value of 1.
    assert!(at(SIZE / 2, SIZE / 2) > 0.5, "centre {}", at(SIZE / 2, SIZE / 2));
    // Top-left node (-0.9, 0.9) keeps its value of 0.
    assert_eq!(at(3, 3), 0.0);
    // Top-right node (0.9, 0.9) has no finite value.
    assert_eq!(at(SIZE - 4, 3), 0.0);
}

#[test]
fn shrinking_node_count_replaces_buffer() {
    let Some(mut renderer) = create_renderer("shrinking_node_count_replaces_buffer") else {
        return;
    };
    renderer.submit_nodes(grid_batch(10, false)).unwrap();
    assert_eq!(renderer.node_vertex_count(), 60);
    renderer.render_frame().unwrap();
    let before = renderer.node_buffer_generation();

    renderer.submit_nodes(grid_batch(3, false)).unwrap();
    assert_eq!(renderer.node_vertex_count(), 18);
    assert!(renderer.node_buffer_generation() > before);
    assert_eq!(renderer.render_frame().unwrap(), FrameStatus::Presented);
}

#[test]
fn final_batch_runs_exactly_one_full_recompute() {
    let Some(mut renderer) = create_renderer("final_batch_runs_exactly_one_full_recompute") else {
        return;
    };
    for _ in 0..5 {
        renderer.submit_nodes(grid_batch(4, false)).unwrap();
    }
    assert_eq!(renderer.recompute_stats().preview_passes, 5);
    assert_eq!(renderer.recompute_stats().final_passes, 0);
    assert_eq!(renderer.recompute_tier(), RecomputeTier::Preview);

    renderer.submit_nodes(grid_batch(4, true)).unwrap();
    renderer.render_frame().unwrap();
    renderer.render_frame().unwrap();
    assert_eq!(renderer.recompute_stats().final_passes, 1);
    assert_eq!(renderer.recompute_tier(), RecomputeTier::Final);
}

#[test]
fn preview_batches_reuse_stored_values() {
    let Some(mut renderer) = create_renderer("preview_batches_reuse_stored_values") else {
        return;
    };
    renderer
        .submit_nodes(SampleBatch::new(vec![Sample::new(0.0, 0.0, 0.5)], true))
        .unwrap();
    let before = renderer.read_field().unwrap();

    // A preview batch cannot change values, only positions.
    renderer
        .submit_nodes(SampleBatch::new(vec![Sample::new(0.0, 0.0, 0.9)], false))
        .unwrap();
    let after = renderer.read_field().unwrap();
    let idx = (SIZE / 2 * SIZE + SIZE / 2) as usize;
    assert!((after[idx] - before[idx]).abs() < 0.05);

    // Preview samples beyond the stored channel are dropped.
    let report = renderer.submit_nodes(grid_batch(3, false)).unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.dropped, 2);
    assert_eq!(renderer.node_vertex_count(), 18);
}

#[test]
fn width_factor_change_recomputes_at_current_tier() {
    let Some(mut renderer) = create_renderer("width_factor_change_recomputes_at_current_tier")
    else {
        return;
    };
    renderer
        .submit_nodes(SampleBatch::new(vec![Sample::new(0.0, 0.0, 1.0)], true))
        .unwrap();
    let narrow = renderer.read_field().unwrap();

    renderer.set_width_factor(1000.0).unwrap();
    assert_eq!(renderer.recompute_stats().final_passes, 2);
    assert_eq!(renderer.display_parameters().width_factor, 1000.0);
    let wide = renderer.read_field().unwrap();

    let count = |field: &[f32]| field.iter().filter(|v| **v > 0.0).count();
    assert!(count(&wide) > count(&narrow));

    // Repeating the current value does not recompute.
    renderer.set_width_factor(1000.0).unwrap();
    assert_eq!(renderer.recompute_stats().final_passes, 2);
}

#[test]
fn display_parameters_last_write_wins() {
    let Some(mut renderer) = create_renderer("display_parameters_last_write_wins") else {
        return;
    };
    renderer.set_peak_value(0.9);
    renderer.set_peak_value(0.6);
    renderer.set_valley_value(0.1);
    renderer.set_valley_value(0.4);
    let params = renderer.display_parameters();
    assert_eq!(params.peak, 0.6);
    assert_eq!(params.valley, 0.4);
    assert_eq!(renderer.render_frame().unwrap(), FrameStatus::Presented);
}

#[test]
fn indexed_edges_follow_nodes() {
    let Some(mut renderer) = create_renderer("indexed_edges_follow_nodes") else {
        return;
    };
    renderer.submit_nodes(grid_batch(4, true)).unwrap();
    let report = renderer.submit_edge_indices(&[(0, 1), (1, 2), (2, 9)]).unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.dropped, 1);
    assert_eq!(renderer.edge_vertex_count(), 4);

    // Node 2 disappears; the edge ending there goes with it.
    renderer.submit_nodes(grid_batch(2, false)).unwrap();
    assert_eq!(renderer.edge_vertex_count(), 2);

    // Explicit segments switch off index mode.
    renderer
        .submit_edges(EdgeSet::new(vec![EdgeSegment::new(-1.0, -1.0, 1.0, 1.0)]))
        .unwrap();
    renderer.submit_nodes(grid_batch(4, false)).unwrap();
    assert_eq!(renderer.edge_vertex_count(), 2);
    assert_eq!(renderer.render_frame().unwrap(), FrameStatus::Presented);
}

#[test]
fn resize_reallocates_field() {
    let Some(mut renderer) = create_renderer("resize_reallocates_field") else {
        return;
    };
    renderer
        .submit_nodes(SampleBatch::new(vec![Sample::new(0.0, 0.0, 1.0)], true))
        .unwrap();
    renderer.resize(32, 48).unwrap();
    assert_eq!(renderer.size(), (32, 48));
    let field = renderer.read_field().unwrap();
    assert_eq!(field.len(), 32 * 48);
    assert!(field[24 * 32 + 16] > 0.0);

    renderer.resize(0, 0).unwrap();
    assert_eq!(renderer.size(), (32, 48));
    assert_eq!(renderer.render_frame().unwrap(), FrameStatus::Presented);
    assert_eq!(renderer.frames(), 1);
}
