use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::types::{GpuPowerPreference, RenderError};

use super::present::{BlitPass, OffscreenTarget};
use super::program::{PipelineLayouts, ShaderProgram};
use super::uniforms::FrameUniforms;

/// wgpu device, swapchain and offscreen target for one window.
///
/// The hero shader renders into an offscreen texture sized to the scaled
/// viewport; [`BlitPass`] then stretches it over a swapchain that always
/// matches the window's physical size.
pub struct WgpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) layouts: PipelineLayouts,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    blit: BlitPass,
    target: OffscreenTarget,
    _instance: wgpu::Instance,
    // Declared last so the surface above is dropped first.
    window: Arc<Window>,
}

impl WgpuContext {
    pub fn new(
        window: Arc<Window>,
        viewport: PhysicalSize<u32>,
        power: GpuPowerPreference,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = window.window_handle().map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to acquire window handle: {err}"))
        })?;
        let display_handle = window.display_handle().map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to acquire display handle: {err}"))
        })?;

        // SAFETY: the window outlives the surface; both live in this struct and
        // `surface` is declared (and therefore dropped) before `window`.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to create rendering surface: {err}"))
        })?;

        let power_preference = match power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to find a suitable GPU adapter: {err}"))
        })?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("hero device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| {
            RenderError::ContextUnavailable(format!("failed to create GPU device: {err}"))
        })?;

        let caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = caps.formats.first() else {
            return Err(RenderError::ContextUnavailable(
                "surface reports no supported formats".to_string(),
            ));
        };
        // Shaders write display-referred colour, as they would on a WebGL canvas.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    "no non-sRGB surface format available; colours may look washed out"
                );
                first_format
            });
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let window_size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = PipelineLayouts::new(&device);
        let blit = BlitPass::new(&device, format);
        let target = blit.create_target(&device, viewport);
        tracing::debug!(
            ?format,
            ?present_mode,
            width = target.size.width,
            height = target.size.height,
            "rendering context ready"
        );

        Ok(Self {
            device,
            layouts,
            queue,
            surface,
            config,
            blit,
            target,
            _instance: instance,
            window,
        })
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Recreates the offscreen target at the new viewport size.
    pub(crate) fn resize_target(&mut self, viewport: PhysicalSize<u32>) {
        let viewport = PhysicalSize::new(viewport.width.max(1), viewport.height.max(1));
        if viewport == self.target.size {
            return;
        }
        self.target.destroy();
        self.target = self.blit.create_target(&self.device, viewport);
    }

    fn sync_swapchain(&mut self) {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }
        if size.width != self.config.width || size.height != self.config.height {
            self.config.width = size.width;
            self.config.height = size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Renders one frame: uniforms, hero pass into the offscreen target, blit, present.
    pub(crate) fn render(
        &mut self,
        program: &ShaderProgram,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        self.sync_swapchain();

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("swapchain out of date; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out acquiring swapchain image; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(RenderError::LostContext(err.to_string())),
        };
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue
            .write_buffer(&program.bindings.buffer, 0, bytemuck::bytes_of(uniforms));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("hero frame encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hero shader pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &program.bindings.bind_group, &[]);
            pass.set_vertex_buffer(0, program.quad.buffer.slice(..));
            pass.draw(0..program.quad.vertex_count, 0..1);
        }
        self.blit.encode(&mut encoder, &self.target, &frame_view);

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl Drop for WgpuContext {
    fn drop(&mut self) {
        self.target.destroy();
    }
}
