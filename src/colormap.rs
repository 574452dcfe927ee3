//! Color ramp lookup texture.
//! - Built from a decoded RGBA8 image (the usual path), PNG bytes, or gradient stops
//! - Immutable after creation; sampled by the terrain fragment stage

use std::cmp::Ordering;

use crate::error::{RenderError, RenderResult};
use crate::resources::GpuResources;

/// Built-in ramp names (case-sensitive).
pub static SUPPORTED: [&str; 3] = ["rainbow", "viridis", "terrain"];

const RAMP_RESOLUTION: usize = 256;
const RAMP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Gradient stops for the built-in ramps.
pub fn builtin_stops(name: &str) -> Result<&'static [(f32, &'static str)], RenderError> {
    match name {
        "rainbow" => Ok(&[
            (0.0, "#0000ff"),
            (0.25, "#00ffff"),
            (0.5, "#00ff00"),
            (0.75, "#ffff00"),
            (1.0, "#ff0000"),
        ]),
        "viridis" => Ok(&[
            (0.0, "#440154"),
            (0.25, "#3b528b"),
            (0.5, "#21918c"),
            (0.75, "#5ec962"),
            (1.0, "#fde725"),
        ]),
        "terrain" => Ok(&[
            (0.0, "#333399"),
            (0.15, "#0099ff"),
            (0.25, "#00cc66"),
            (0.5, "#ffff99"),
            (0.75, "#996655"),
            (1.0, "#ffffff"),
        ]),
        _ => Err(RenderError::upload(format!(
            "Unknown colormap '{}'. Supported: {}",
            name,
            SUPPORTED.join(", ")
        ))),
    }
}

pub struct ColorRamp {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl ColorRamp {
    /// Upload a decoded RGBA8 image (sRGB encoded), row-major, `width * height * 4` bytes.
    pub fn from_rgba8(
        resources: &GpuResources,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::upload("colormap must be at least 1x1"));
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::upload(format!(
                "colormap {}x{} expects {} bytes, got {}",
                width,
                height,
                expected,
                rgba.len()
            )));
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = resources.create_texture(&wgpu::TextureDescriptor {
            label: Some("graphterrain-colormap"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RAMP_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        })?;
        resources.queue().write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = resources.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("graphterrain-colormap-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::debug!("colormap uploaded ({width}x{height})");
        Ok(Self {
            texture,
            view,
            sampler,
        })
    }

    pub fn from_png_bytes(resources: &GpuResources, png: &[u8]) -> RenderResult<Self> {
        let (width, height, rgba) = decode_png_rgba8(png)?;
        Self::from_rgba8(resources, width, height, &rgba)
    }

    /// Build a 256x1 ramp from `(position, "#RRGGBB")` stops.
    pub fn from_stops(resources: &GpuResources, stops: &[(f32, &str)]) -> RenderResult<Self> {
        let data = interpolate_stops(stops, RAMP_RESOLUTION)?;
        Self::from_rgba8(resources, RAMP_RESOLUTION as u32, 1, &data)
    }

    pub fn builtin(resources: &GpuResources, name: &str) -> RenderResult<Self> {
        Self::from_stops(resources, builtin_stops(name)?)
    }

}

/// Where the color ramp comes from. The texture is created once at startup.
#[derive(Clone, Debug, PartialEq)]
pub enum ColormapSource {
    Builtin(String),
    Png(Vec<u8>),
    Rgba8 {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
}

impl Default for ColormapSource {
    fn default() -> Self {
        ColormapSource::Builtin("rainbow".to_string())
    }
}

impl ColormapSource {
    /// A `.png` path is read as an image; anything else names a built-in ramp.
    pub fn from_arg(arg: &str) -> RenderResult<Self> {
        if arg.to_ascii_lowercase().ends_with(".png") {
            Ok(ColormapSource::Png(std::fs::read(arg)?))
        } else {
            builtin_stops(arg)?;
            Ok(ColormapSource::Builtin(arg.to_string()))
        }
    }

    pub fn load(&self, resources: &GpuResources) -> RenderResult<ColorRamp> {
        match self {
            ColormapSource::Builtin(name) => ColorRamp::builtin(resources, name),
            ColormapSource::Png(bytes) => ColorRamp::from_png_bytes(resources, bytes),
            ColormapSource::Rgba8 {
                width,
                height,
                data,
            } => ColorRamp::from_rgba8(resources, *width, *height, data),
        }
    }
}

/// Decode PNG bytes to `(width, height, RGBA8)`.
pub fn decode_png_rgba8(png: &[u8]) -> RenderResult<(u32, u32, Vec<u8>)> {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .map_err(|e| RenderError::upload(format!("failed to decode colormap PNG: {e}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

fn interpolate_stops(stops: &[(f32, &str)], resolution: usize) -> RenderResult<Vec<u8>> {
    if stops.len() < 2 {
        return Err(RenderError::upload("stops must contain at least two entries"));
    }
    if stops.iter().any(|(value, _)| !value.is_finite()) {
        return Err(RenderError::upload("stop values must be finite numbers"));
    }

    let mut sorted: Vec<(f32, [u8; 4])> = stops
        .iter()
        .map(|(v, hex)| parse_html_color(hex).map(|c| (*v, c)))
        .collect::<RenderResult<_>>()?;
    sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let (lo, hi) = (sorted[0].0, sorted[sorted.len() - 1].0);
    let mut data = Vec::with_capacity(resolution * 4);
    for i in 0..resolution {
        let t = i as f32 / (resolution - 1) as f32;
        let value = lo + t * (hi - lo);
        data.extend_from_slice(&color_at_value(value, &sorted));
    }
    Ok(data)
}

fn color_at_value(value: f32, stops: &[(f32, [u8; 4])]) -> [u8; 4] {
    let first = stops[0];
    let last = stops[stops.len() - 1];
    if value <= first.0 {
        return first.1;
    }
    if value >= last.0 {
        return last.1;
    }
    for pair in stops.windows(2) {
        let (v0, c0) = pair[0];
        let (v1, c1) = pair[1];
        if value >= v0 && value <= v1 {
            let t = if v1 > v0 { (value - v0) / (v1 - v0) } else { 0.0 };
            return [
                lerp_u8(c0[0], c1[0], t),
                lerp_u8(c0[1], c1[1], t),
                lerp_u8(c0[2], c1[2], t),
                lerp_u8(c0[3], c1[3], t),
            ];
        }
    }
    last.1
}

fn parse_html_color(hex: &str) -> RenderResult<[u8; 4]> {
    let trimmed = hex.trim().trim_start_matches('#');
    if trimmed.len() != 6 {
        return Err(RenderError::upload(format!(
            "HTML color must be #RRGGBB, got: #{trimmed}"
        )));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&trimmed[range], 16)
            .map_err(|e| RenderError::upload(format!("Invalid hex color '{hex}': {e}")))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255])
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let (a, b) = (a as f32, b as f32);
    (a + (b - a) * t.clamp(0.0, 1.0)).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_interpolate_endpoints_and_midpoint() {
        let data = interpolate_stops(&[(0.0, "#000000"), (1.0, "#ff0000")], 3).unwrap();
        assert_eq!(&data[0..4], &[0, 0, 0, 255]);
        assert_eq!(&data[4..8], &[128, 0, 0, 255]);
        assert_eq!(&data[8..12], &[255, 0, 0, 255]);
    }

    #[test]
    fn unsorted_stops_are_sorted() {
        let data = interpolate_stops(&[(1.0, "#ffffff"), (0.0, "#000000")], 2).unwrap();
        assert_eq!(&data[0..4], &[0, 0, 0, 255]);
        assert_eq!(&data[4..8], &[255, 255, 255, 255]);
    }

    #[test]
    fn rejects_bad_hex_and_single_stop() {
        assert!(interpolate_stops(&[(0.0, "#12345")], 4).is_err());
        assert!(interpolate_stops(&[(0.0, "#000000"), (1.0, "#zz0000")], 4).is_err());
    }

    #[test]
    fn rainbow_runs_blue_to_red() {
        let texels = interpolate_stops(builtin_stops("rainbow").unwrap(), 256).unwrap();
        assert_eq!(&texels[0..4], &[0, 0, 255, 255]);
        assert_eq!(&texels[255 * 4..], &[255, 0, 0, 255]);
    }

    #[test]
    fn colormap_arg_selects_builtin() {
        assert_eq!(
            ColormapSource::from_arg("viridis").unwrap(),
            ColormapSource::Builtin("viridis".to_string())
        );
        assert!(ColormapSource::from_arg("plasma").is_err());
        assert!(ColormapSource::from_arg("/nonexistent/ramp.png").is_err());
    }

    #[test]
    fn unknown_builtin_lists_supported() {
        let err = builtin_stops("plasma").unwrap_err();
        assert!(err.to_string().contains("rainbow"));
    }
}
