// src/terrain/kernel.rs
// Interpolation kernel shared by the compute shader and the CPU reference evaluator
// RELEVANT FILES: src/terrain/engine.rs, src/shaders/terrain_field.wgsl, tests/terrain_kernel.rs

use glam::Vec2;

use crate::sample::Sample;

/// Smallest influence radius in pixels; keeps a sample's own pixel covered
/// when the width factor is zero.
pub const MIN_RADIUS_PX: f32 = 1.0;

/// Gaussian falloff exponent: exp(-FALLOFF * q^2) with q = d / r, i.e. sigma = r / 3.
pub const FALLOFF: f32 = 4.5;

/// Influence radius in pixels for a given width factor.
pub fn radius_px(width_factor: f32, kernel_scale: f32) -> f32 {
    let r = width_factor * kernel_scale;
    if r.is_finite() {
        r.max(MIN_RADIUS_PX)
    } else {
        MIN_RADIUS_PX
    }
}

/// Kernel weight for a pixel at distance `distance` (pixels). Zero outside the radius.
#[inline]
pub fn weight(distance: f32, radius: f32) -> f32 {
    if distance > radius {
        return 0.0;
    }
    let q = distance / radius;
    (-FALLOFF * q * q).exp()
}

/// Map a normalized device coordinate to pixel space (row 0 at the top).
#[inline]
pub fn ndc_to_pixel(position: [f32; 2], width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (position[0] + 1.0) * 0.5 * width as f32,
        (1.0 - position[1]) * 0.5 * height as f32,
    )
}

/// Field resolution and kernel shape for one evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldGrid {
    pub width: u32,
    pub height: u32,
    pub radius_px: f32,
    /// 1 for the final tier; larger values evaluate one point per block.
    pub stride: u32,
}

/// CPU reference of the compute shader. Returns `width * height` intensities.
pub fn evaluate_field(samples: &[Sample], grid: FieldGrid) -> Vec<f32> {
    let stride = grid.stride.max(1);
    let mut field = vec![0.0f32; grid.width as usize * grid.height as usize];
    let points: Vec<(Vec2, f32)> = samples
        .iter()
        .map(|s| (ndc_to_pixel(s.position, grid.width, grid.height), s.value))
        .collect();

    let blocks_x = grid.width.div_ceil(stride);
    let blocks_y = grid.height.div_ceil(stride);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            let center = block_center(bx, by, stride, grid.width, grid.height);
            let value: f32 = points
                .iter()
                .map(|(p, v)| v * weight(center.distance(*p), grid.radius_px))
                .sum();

            let x_end = ((bx + 1) * stride).min(grid.width);
            let y_end = ((by + 1) * stride).min(grid.height);
            for y in by * stride..y_end {
                let row = y as usize * grid.width as usize;
                for x in bx * stride..x_end {
                    field[row + x as usize] = value;
                }
            }
        }
    }
    field
}

/// Evaluation point for a block: the pixel centre for stride 1, otherwise the
/// centre of the block clipped to the field.
fn block_center(bx: u32, by: u32, stride: u32, width: u32, height: u32) -> Vec2 {
    let x0 = (bx * stride) as f32;
    let y0 = (by * stride) as f32;
    let x1 = ((bx + 1) * stride).min(width) as f32;
    let y1 = ((by + 1) * stride).min(height) as f32;
    Vec2::new((x0 + x1) * 0.5, (y0 + y1) * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_scales_with_width_factor() {
        assert_eq!(radius_px(1000.0, 0.04), 40.0);
        assert_eq!(radius_px(0.0, 0.04), MIN_RADIUS_PX);
        assert_eq!(radius_px(f32::INFINITY, 0.04), MIN_RADIUS_PX);
    }

    #[test]
    fn weight_is_one_at_center_and_zero_outside() {
        assert_eq!(weight(0.0, 10.0), 1.0);
        assert!(weight(10.0, 10.0) > 0.0);
        assert_eq!(weight(10.01, 10.0), 0.0);
        assert!(weight(3.0, 10.0) > weight(6.0, 10.0));
    }

    #[test]
    fn ndc_origin_maps_to_canvas_center() {
        let p = ndc_to_pixel([0.0, 0.0], 800, 600);
        assert_eq!(p, Vec2::new(400.0, 300.0));
        let top_left = ndc_to_pixel([-1.0, 1.0], 800, 600);
        assert_eq!(top_left, Vec2::ZERO);
    }

    #[test]
    fn block_center_matches_pixel_center_at_stride_one() {
        assert_eq!(block_center(3, 5, 1, 10, 10), Vec2::new(3.5, 5.5));
        assert_eq!(block_center(0, 0, 4, 10, 10), Vec2::new(2.0, 2.0));
        // Last block is clipped to the field edge.
        assert_eq!(block_center(2, 2, 4, 10, 10), Vec2::new(9.0, 9.0));
    }

    #[test]
    fn empty_batch_is_background() {
        let grid = FieldGrid {
            width: 16,
            height: 16,
            radius_px: 4.0,
            stride: 1,
        };
        assert!(evaluate_field(&[], grid).iter().all(|v| *v == 0.0));
    }
}
