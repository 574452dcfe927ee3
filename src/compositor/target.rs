// src/compositor/target.rs
// Color targets a frame can be rendered into: a window surface or an offscreen texture
// RELEVANT FILES: src/compositor/mod.rs, src/viewer/mod.rs, src/readback.rs

use crate::error::{RenderError, RenderResult};
use crate::resources::GpuResources;

/// Format used for offscreen targets.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub enum FrameTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// A color image checked out for exactly one frame.
pub struct AcquiredFrame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame {
    /// Hand the image to the presentation engine. No-op for offscreen targets.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

impl FrameTarget {
    /// Configure `surface` and wrap it.
    pub fn surface(
        device: &wgpu::Device,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        surface.configure(device, &config);
        Self::Surface { surface, config }
    }

    pub fn offscreen(resources: &GpuResources, width: u32, height: u32) -> RenderResult<Self> {
        Ok(Self::Offscreen {
            texture: create_offscreen_texture(resources, width, height)?,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            FrameTarget::Surface { config, .. } => config.format,
            FrameTarget::Offscreen { texture } => texture.format(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            FrameTarget::Surface { config, .. } => (config.width, config.height),
            FrameTarget::Offscreen { texture } => (texture.width(), texture.height()),
        }
    }

    /// The offscreen color texture, if this is an offscreen target.
    pub fn texture(&self) -> Option<&wgpu::Texture> {
        match self {
            FrameTarget::Surface { .. } => None,
            FrameTarget::Offscreen { texture } => Some(texture),
        }
    }

    /// Check out the next image. `Ok(None)` means skip this frame.
    ///
    /// Lost and outdated surfaces are reconfigured and the frame dropped; a
    /// timeout just drops the frame. Running out of memory is fatal.
    pub fn acquire(&mut self, device: &wgpu::Device) -> RenderResult<Option<AcquiredFrame>> {
        match self {
            FrameTarget::Offscreen { texture } => Ok(Some(AcquiredFrame {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            })),
            FrameTarget::Surface { surface, config } => match surface.get_current_texture() {
                Ok(output) => Ok(Some(AcquiredFrame {
                    view: output
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default()),
                    surface_texture: Some(output),
                })),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    log::warn!("surface lost or outdated; reconfiguring");
                    surface.configure(device, config);
                    Ok(None)
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    log::warn!("surface timeout; skipping frame");
                    Ok(None)
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    Err(RenderError::surface("out of memory acquiring surface image"))
                }
            },
        }
    }

    pub fn resize(&mut self, resources: &GpuResources, width: u32, height: u32) -> RenderResult<()> {
        match self {
            FrameTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(resources.device(), config);
            }
            FrameTarget::Offscreen { texture } => {
                *texture = create_offscreen_texture(resources, width, height)?;
            }
        }
        Ok(())
    }
}

fn create_offscreen_texture(
    resources: &GpuResources,
    width: u32,
    height: u32,
) -> RenderResult<wgpu::Texture> {
    resources.create_texture(&wgpu::TextureDescriptor {
        label: Some("graphterrain.Offscreen.Color"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
