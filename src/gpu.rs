//! GPU context handles shared by every renderer component.
//!
//! The context is an owned value created once by the caller (window setup or
//! a headless request) and passed down; nothing here is process-global.

use std::sync::{Arc, Mutex};

use crate::error::{RenderError, RenderResult};

#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter: Option<Arc<wgpu::Adapter>>,
    health: DeviceHealth,
}

impl GpuContext {
    /// Wrap an already-acquired device. Installs the uncaptured-error hook.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        adapter: Option<Arc<wgpu::Adapter>>,
    ) -> Self {
        let health = DeviceHealth::default();
        health.install(&device);
        Self {
            device,
            queue,
            adapter,
            health,
        }
    }

    /// Request an adapter and device with no surface attached.
    pub fn headless() -> RenderResult<Self> {
        pollster::block_on(Self::request_headless())
    }

    async fn request_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::device("no suitable GPU adapter"))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("graphterrain-headless-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                },
                None,
            )
            .await?;

        log::info!("acquired headless adapter {}", adapter.get_info().name);
        Ok(Self::new(
            Arc::new(device),
            Arc::new(queue),
            Some(Arc::new(adapter)),
        ))
    }

    pub fn health(&self) -> &DeviceHealth {
        &self.health
    }
}

/// Records the first asynchronous device error (validation failure, device
/// loss, out of memory) so the next frame can surface it.
#[derive(Clone, Default)]
pub struct DeviceHealth {
    first_error: Arc<Mutex<Option<String>>>,
}

impl DeviceHealth {
    fn install(&self, device: &wgpu::Device) {
        let slot = Arc::clone(&self.first_error);
        device.on_uncaptured_error(Box::new(move |err: wgpu::Error| {
            log::error!("uncaptured device error: {err}");
            if let Ok(mut guard) = slot.lock() {
                guard.get_or_insert_with(|| err.to_string());
            }
        }));
    }

    /// Err once any device error has been observed; stays Err afterwards.
    pub fn check(&self) -> RenderResult<()> {
        let guard = self
            .first_error
            .lock()
            .map_err(|_| RenderError::device("device health lock poisoned"))?;
        match guard.as_ref() {
            Some(msg) => Err(RenderError::device(msg.clone())),
            None => Ok(()),
        }
    }

    pub(crate) fn record(&self, msg: impl Into<String>) {
        if let Ok(mut guard) = self.first_error.lock() {
            guard.get_or_insert_with(|| msg.into());
        }
    }
}

/// Align to WebGPU's required bytes-per-row for copies.
#[inline]
pub fn align_copy_bpr(unpadded: u32) -> u32 {
    let a = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    ((unpadded + a - 1) / a) * a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_alignment_rounds_up() {
        assert_eq!(align_copy_bpr(1), 256);
        assert_eq!(align_copy_bpr(256), 256);
        assert_eq!(align_copy_bpr(800 * 4), 3328);
    }

    #[test]
    fn health_keeps_first_error() {
        let health = DeviceHealth::default();
        assert!(health.check().is_ok());
        health.record("device lost");
        health.record("later error");
        let err = health.check().unwrap_err();
        assert!(err.to_string().contains("device lost"));
    }
}
