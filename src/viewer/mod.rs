// src/viewer/mod.rs
// Windowed viewer: winit event loop driving the frame scheduler, plus a cross-thread handle
// RELEVANT FILES: src/scheduler.rs, src/renderer.rs, src/bin/terrain_viewer.rs

use std::sync::Arc;

use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{EventLoop, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::colormap::ColormapSource;
use crate::compositor::FrameTarget;
use crate::config::RendererConfig;
use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;
use crate::renderer::GraphTerrainRenderer;
use crate::sample::{EdgeSet, SampleBatch};
use crate::scheduler::FrameScheduler;

/// Updates delivered to the render thread between frames.
#[derive(Debug)]
pub enum RendererEvent {
    Nodes(SampleBatch),
    Edges(EdgeSet),
    EdgeIndices(Vec<(u32, u32)>),
    WidthFactor(f32),
    PeakValue(f32),
    ValleyValue(f32),
    Shutdown,
}

/// Cloneable, `Send` front door for producers on other threads.
///
/// Every call is fire-and-forget; the return value is false once the viewer
/// has exited.
#[derive(Clone)]
pub struct RendererHandle {
    proxy: EventLoopProxy<RendererEvent>,
}

impl RendererHandle {
    pub fn submit_nodes(&self, batch: SampleBatch) -> bool {
        self.send(RendererEvent::Nodes(batch))
    }

    pub fn submit_edges(&self, edges: EdgeSet) -> bool {
        self.send(RendererEvent::Edges(edges))
    }

    pub fn submit_edge_indices(&self, indices: Vec<(u32, u32)>) -> bool {
        self.send(RendererEvent::EdgeIndices(indices))
    }

    pub fn set_width_factor(&self, width_factor: f32) -> bool {
        self.send(RendererEvent::WidthFactor(width_factor))
    }

    pub fn set_peak_value(&self, peak: f32) -> bool {
        self.send(RendererEvent::PeakValue(peak))
    }

    pub fn set_valley_value(&self, valley: f32) -> bool {
        self.send(RendererEvent::ValleyValue(valley))
    }

    pub fn shutdown(&self) -> bool {
        self.send(RendererEvent::Shutdown)
    }

    fn send(&self, event: RendererEvent) -> bool {
        self.proxy.send_event(event).is_ok()
    }
}

fn apply_event(renderer: &mut GraphTerrainRenderer, event: RendererEvent) -> RenderResult<()> {
    match event {
        RendererEvent::Nodes(batch) => renderer.submit_nodes(batch).map(|_| ()),
        RendererEvent::Edges(edges) => renderer.submit_edges(edges).map(|_| ()),
        RendererEvent::EdgeIndices(indices) => renderer.submit_edge_indices(&indices).map(|_| ()),
        RendererEvent::WidthFactor(width_factor) => renderer.set_width_factor(width_factor),
        RendererEvent::PeakValue(peak) => {
            renderer.set_peak_value(peak);
            Ok(())
        }
        RendererEvent::ValleyValue(valley) => {
            renderer.set_valley_value(valley);
            Ok(())
        }
        RendererEvent::Shutdown => Ok(()),
    }
}

async fn create_renderer(
    window: Arc<Window>,
    config: &RendererConfig,
    colormap: &ColormapSource,
) -> RenderResult<GraphTerrainRenderer> {
    let size = window.inner_size();
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let surface = instance.create_surface(Arc::clone(&window))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| RenderError::device("no adapter compatible with the window surface"))?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("graphterrain-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
            },
            None,
        )
        .await?;
    log::info!("acquired adapter {}", adapter.get_info().name);

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
        .ok_or_else(|| RenderError::surface("surface reports no supported formats"))?;
    let alpha_mode = caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: if config.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        },
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };

    let ctx = GpuContext::new(Arc::new(device), Arc::new(queue), Some(Arc::new(adapter)));
    let target = FrameTarget::surface(&ctx.device, surface, surface_config);
    GraphTerrainRenderer::new(ctx, config, target, colormap)
}

/// Open a window and render until it is closed or a producer calls
/// [`RendererHandle::shutdown`].
///
/// `producer` runs on its own thread with a handle to the renderer. Events
/// sent before the device is ready are queued and applied once it is. If
/// rendering halts on a fatal error the window stays open on the last frame,
/// and the error is returned after it closes.
pub fn run_viewer<P>(
    config: RendererConfig,
    colormap: ColormapSource,
    producer: P,
) -> Result<(), Box<dyn std::error::Error>>
where
    P: FnOnce(RendererHandle) + Send + 'static,
{
    config.validate()?;

    let event_loop: EventLoop<RendererEvent> =
        EventLoopBuilder::<RendererEvent>::with_user_event().build()?;
    let handle = RendererHandle {
        proxy: event_loop.create_proxy(),
    };

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                config.width as f64,
                config.height as f64,
            ))
            .build(&event_loop)?,
    );

    let producer_thread = std::thread::Builder::new()
        .name("graphterrain-producer".to_string())
        .spawn(move || producer(handle))?;

    let mut renderer: Option<GraphTerrainRenderer> = None;
    let mut scheduler = FrameScheduler::new();
    let mut pending: Vec<RendererEvent> = Vec::new();
    let mut init_error: Option<RenderError> = None;

    event_loop.run(|event, elwt| match event {
        Event::Resumed => {
            if renderer.is_some() || !scheduler.is_running() {
                return;
            }
            match pollster::block_on(create_renderer(Arc::clone(&window), &config, &colormap)) {
                Ok(mut created) => {
                    for event in pending.drain(..) {
                        if let Err(e) = apply_event(&mut created, event) {
                            log::warn!("[{}] queued update failed: {e}", e.category());
                        }
                    }
                    renderer = Some(created);
                    window.request_redraw();
                }
                Err(e) => {
                    log::error!("failed to create renderer: {e}");
                    init_error = Some(e);
                    scheduler.teardown();
                    elwt.exit();
                }
            }
        }
        Event::UserEvent(RendererEvent::Shutdown) => {
            scheduler.teardown();
            renderer = None;
            elwt.exit();
        }
        Event::UserEvent(update) => match renderer.as_mut() {
            Some(active) if scheduler.is_running() => {
                if let Err(e) = apply_event(active, update) {
                    log::warn!("[{}] update failed: {e}", e.category());
                }
            }
            Some(_) => {}
            None => pending.push(update),
        },
        Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
            WindowEvent::CloseRequested => {
                scheduler.teardown();
                renderer = None;
                elwt.exit();
            }
            WindowEvent::KeyboardInput {
                event: key_event, ..
            } => {
                if key_event.state == ElementState::Pressed
                    && key_event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    scheduler.teardown();
                    renderer = None;
                    elwt.exit();
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(active) = renderer.as_mut() {
                    if let Err(e) = active.resize(size.width, size.height) {
                        log::error!("[{}] resize failed: {e}", e.category());
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(active) = renderer.as_mut() {
                    if scheduler.tick(|| active.render_frame()) {
                        window.request_redraw();
                    }
                }
            }
            _ => {}
        },
        Event::LoopExiting => {
            scheduler.teardown();
            renderer = None;
        }
        _ => {}
    })?;

    if producer_thread.is_finished() {
        let _ = producer_thread.join();
    }
    if let Some(err) = init_error.or_else(|| scheduler.take_halted_error()) {
        return Err(Box::new(err));
    }
    Ok(())
}
