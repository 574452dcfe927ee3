// src/readback.rs
// Blocking GPU-to-CPU copies for the field buffer and offscreen frames
// RELEVANT FILES: src/renderer.rs, src/compositor/target.rs, src/gpu.rs

use anyhow::{anyhow, bail, ensure, Result};
use futures_intrusive::channel::shared::oneshot_channel;

use crate::gpu::align_copy_bpr;

/// Copy `len` f32 values from the start of a `COPY_SRC` buffer.
pub fn read_buffer_f32(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Buffer,
    len: usize,
) -> Result<Vec<f32>> {
    let size = (len * std::mem::size_of::<f32>()) as wgpu::BufferAddress;
    ensure!(
        size <= src.size(),
        "readback of {} bytes exceeds buffer size {}",
        size,
        src.size()
    );
    if len == 0 {
        return Ok(Vec::new());
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("graphterrain.Readback.BufferStaging"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("graphterrain.Readback.BufferEncoder"),
    });
    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let bytes = map_staging(device, &staging)?;
    Ok(bytemuck::pod_collect_to_vec(&bytes))
}

/// Download an RGBA8 texture into a tightly packed `width * height * 4` buffer.
pub fn read_texture_tight(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Texture,
) -> Result<Vec<u8>> {
    let (width, height) = (src.width(), src.height());
    ensure!(width > 0 && height > 0, "readback size must be positive");
    ensure!(
        src.sample_count() == 1,
        "readback requires a single-sample texture, got {}",
        src.sample_count()
    );
    match src.format() {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {}
        other => bail!("read_texture_tight only supports RGBA8 formats, got {:?}", other),
    }

    let tight_bpr = width * 4;
    let padded_bpr = align_copy_bpr(tight_bpr);
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("graphterrain.Readback.TextureStaging"),
        size: padded_bpr as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("graphterrain.Readback.TextureEncoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: src,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let padded = map_staging(device, &staging)?;
    let (tight_bpr, padded_bpr) = (tight_bpr as usize, padded_bpr as usize);
    let mut tight = vec![0u8; tight_bpr * height as usize];
    for row in 0..height as usize {
        let src_offset = row * padded_bpr;
        let dst_offset = row * tight_bpr;
        tight[dst_offset..dst_offset + tight_bpr]
            .copy_from_slice(&padded[src_offset..src_offset + tight_bpr]);
    }
    Ok(tight)
}

fn map_staging(device: &wgpu::Device, staging: &wgpu::Buffer) -> Result<Vec<u8>> {
    let slice = staging.slice(..);
    let (sender, receiver) = oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    pollster::block_on(receiver.receive())
        .ok_or_else(|| anyhow!("map_async callback channel dropped"))??;

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}
