// src/resources.rs
// GPU resource manager: buffer, texture and pipeline creation with fatal error capture
// RELEVANT FILES: src/gpu.rs, src/terrain/engine.rs, src/vector/node.rs, src/compositor/mod.rs

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;

/// Allocation front-end over a [`GpuContext`].
///
/// Every creation call runs inside validation and out-of-memory error scopes
/// and is resolved synchronously, so a failure comes back as
/// [`RenderError::Device`] at the call site instead of surfacing frames later.
pub struct GpuResources {
    ctx: GpuContext,
}

impl GpuResources {
    pub fn new(ctx: GpuContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.ctx.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.ctx.queue
    }

    pub fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> RenderResult<wgpu::Buffer> {
        self.scoped(label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        })
    }

    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> RenderResult<wgpu::Buffer> {
        self.scoped(label, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        })
    }

    /// Queue a write; it lands before the next submission on this queue.
    pub fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.ctx.queue.write_buffer(buffer, offset, data);
    }

    /// Release a buffer. Work already submitted against it still completes.
    pub fn destroy_buffer(&self, buffer: wgpu::Buffer) {
        drop(buffer);
    }

    pub fn create_texture(&self, desc: &wgpu::TextureDescriptor) -> RenderResult<wgpu::Texture> {
        let label = desc.label.unwrap_or("texture");
        self.scoped(label, |device| device.create_texture(desc))
    }

    pub fn create_shader(&self, label: &str, source: &str) -> RenderResult<wgpu::ShaderModule> {
        self.scoped(label, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(source)),
            })
        })
    }

    pub fn create_render_pipeline(
        &self,
        desc: &wgpu::RenderPipelineDescriptor,
    ) -> RenderResult<wgpu::RenderPipeline> {
        let label = desc.label.unwrap_or("render-pipeline");
        self.scoped(label, |device| device.create_render_pipeline(desc))
    }

    pub fn create_compute_pipeline(
        &self,
        desc: &wgpu::ComputePipelineDescriptor,
    ) -> RenderResult<wgpu::ComputePipeline> {
        let label = desc.label.unwrap_or("compute-pipeline");
        self.scoped(label, |device| device.create_compute_pipeline(desc))
    }

    fn scoped<T>(&self, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> RenderResult<T> {
        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(device);
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());

        match validation.or(oom) {
            None => Ok(value),
            Some(err) => {
                let msg = format!("creating {what}: {err}");
                log::error!("{msg}");
                self.ctx.health().record(msg.clone());
                Err(RenderError::Device(msg))
            }
        }
    }
}

/// A GPU buffer whose size follows a variable-length array.
///
/// GPU buffers cannot grow or shrink, so every update allocates a new buffer
/// and only then swaps it in. A frame encoded before the swap keeps using the
/// old buffer; one encoded after sees only the new one. An empty update leaves
/// the slot without a buffer.
pub struct ReplaceableBuffer {
    label: &'static str,
    usage: wgpu::BufferUsages,
    buffer: Option<wgpu::Buffer>,
    len: u32,
    generation: u64,
}

impl ReplaceableBuffer {
    pub fn new(label: &'static str, usage: wgpu::BufferUsages) -> Self {
        Self {
            label,
            usage,
            buffer: None,
            len: 0,
            generation: 0,
        }
    }

    /// Replace the contents with `data`. On allocation failure the previous
    /// buffer stays installed.
    pub fn replace<T: Pod>(&mut self, resources: &GpuResources, data: &[T]) -> RenderResult<()> {
        if data.is_empty() {
            self.clear(resources);
            return Ok(());
        }
        let len = u32::try_from(data.len())
            .map_err(|_| RenderError::upload(format!("{}: {} elements", self.label, data.len())))?;
        let fresh =
            resources.create_buffer_init(self.label, bytemuck::cast_slice(data), self.usage)?;
        if let Some(old) = self.buffer.replace(fresh) {
            resources.destroy_buffer(old);
        }
        self.len = len;
        self.generation += 1;
        Ok(())
    }

    pub fn clear(&mut self, resources: &GpuResources) {
        if let Some(old) = self.buffer.take() {
            resources.destroy_buffer(old);
        }
        self.len = 0;
        self.generation += 1;
    }

    pub fn get(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Number of elements in the installed buffer.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bumped on every replace or clear.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
