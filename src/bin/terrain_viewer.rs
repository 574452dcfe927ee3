//! Demo viewer: `terrain_viewer [config.json] [colormap]`.
//!
//! Feeds a synthetic point stream that relaxes from a scattered start into a
//! set of clusters, then sends one final batch. Stands in for a live layout
//! simulator.

use std::error::Error;
use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

use graphterrain::{run_viewer, ColormapSource, RendererConfig, RendererHandle, Sample, SampleBatch};

const NODES: usize = 120;
const CLUSTERS: usize = 4;
const TICKS: usize = 240;
const TICK_INTERVAL: Duration = Duration::from_millis(16);

fn start_position(i: usize) -> [f32; 2] {
    // Golden-angle spiral over the whole canvas.
    let r = 0.9 * ((i as f32 + 0.5) / NODES as f32).sqrt();
    let theta = i as f32 * 2.399_963;
    [r * theta.cos(), r * theta.sin()]
}

fn target_position(i: usize) -> [f32; 2] {
    let cluster = i % CLUSTERS;
    let angle = cluster as f32 / CLUSTERS as f32 * TAU;
    let centre = [0.5 * angle.cos(), 0.5 * angle.sin()];
    let member = i / CLUSTERS;
    let spread = 0.02 + 0.01 * (member % 7) as f32;
    let local = member as f32 * 2.399_963;
    [centre[0] + spread * local.cos(), centre[1] + spread * local.sin()]
}

fn node_value(i: usize) -> f32 {
    0.3 + 0.7 * ((i * 37) % 101) as f32 / 100.0
}

fn batch_at(tick: usize) -> SampleBatch {
    let t = tick as f32 / TICKS as f32;
    let ease = 1.0 - (1.0 - t).powi(3);
    let samples = (0..NODES)
        .map(|i| {
            let [x0, y0] = start_position(i);
            let [x1, y1] = target_position(i);
            Sample::new(x0 + (x1 - x0) * ease, y0 + (y1 - y0) * ease, node_value(i))
        })
        .collect();
    SampleBatch::new(samples, tick == TICKS)
}

fn stream(handle: RendererHandle) {
    let edges: Vec<(u32, u32)> = (0..NODES)
        .filter(|i| i + CLUSTERS < NODES)
        .map(|i| (i as u32, (i + CLUSTERS) as u32))
        .collect();
    if !handle.submit_nodes(batch_at(0)) || !handle.submit_edge_indices(edges) {
        return;
    }
    for tick in 1..=TICKS {
        thread::sleep(TICK_INTERVAL);
        if !handle.submit_nodes(batch_at(tick)) {
            return;
        }
    }
    log::info!("layout converged after {TICKS} ticks");
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RendererConfig::load(path)?,
        None => RendererConfig::default(),
    };
    let colormap = match args.next() {
        Some(arg) => ColormapSource::from_arg(&arg)?,
        None => ColormapSource::default(),
    };

    run_viewer(config, colormap, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_last_tick_is_final() {
        assert!(!batch_at(0).is_final);
        assert!(!batch_at(TICKS - 1).is_final);
        assert!(batch_at(TICKS).is_final);
        assert_eq!(batch_at(10).len(), NODES);
    }

    #[test]
    fn stream_stays_in_clip_space() {
        for tick in [0, TICKS / 2, TICKS] {
            for sample in batch_at(tick).samples {
                assert!(sample.position.iter().all(|c| c.abs() <= 1.0));
            }
        }
    }
}
