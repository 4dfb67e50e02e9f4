//! Native winit host: a window acts as the drawable surface, redraw requests
//! act as frame callbacks, and window events feed the pointer tracker.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use winit::dpi::{LogicalPosition, LogicalSize, PhysicalSize};
use winit::event::{
    ElementState, Event, KeyEvent, MouseButton, StartCause, Touch, TouchPhase, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::WgpuContext;
use crate::hero::{BackgroundOptions, HeroOverlay, ShaderBackground};
use crate::pointer::PointerId;
use crate::runtime::{FrameHost, FrameRequest, SystemTimeSource, TimeSource};
use crate::surface::DrawableSurface;
use crate::types::{GpuPowerPreference, RenderError, RendererConfig};

/// A winit window as a [`DrawableSurface`].
pub struct WindowSurface {
    window: Arc<Window>,
    power: GpuPowerPreference,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>, power: GpuPowerPreference) -> Self {
        Self { window, power }
    }
}

impl DrawableSurface for WindowSurface {
    type Context = WgpuContext;

    fn logical_size(&self) -> LogicalSize<f64> {
        self.window.inner_size().to_logical(self.window.scale_factor())
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn acquire_context(&self, viewport: PhysicalSize<u32>) -> Result<WgpuContext, RenderError> {
        WgpuContext::new(Arc::clone(&self.window), viewport, self.power)
    }
}

/// Frame callbacks backed by `request_redraw`; with a FIFO swapchain each
/// redraw lands on a display refresh.
struct RedrawHost {
    window: Arc<Window>,
    issued: u64,
    pending: Option<FrameRequest>,
}

impl RedrawHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            issued: 0,
            pending: None,
        }
    }

    fn take_pending(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

impl FrameHost for RedrawHost {
    fn request_frame(&mut self) -> FrameRequest {
        self.issued += 1;
        let request = FrameRequest(self.issued);
        self.pending = Some(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }
}

/// Last logical position of every pointer, used to derive movement deltas.
#[derive(Debug, Default)]
struct InputState {
    cursor: Option<LogicalPosition<f64>>,
    touches: HashMap<u64, LogicalPosition<f64>>,
}

impl InputState {
    fn cursor_moved(&mut self, position: LogicalPosition<f64>) -> [f64; 2] {
        delta(self.cursor.replace(position), position)
    }

    fn touch_moved(&mut self, id: u64, position: LogicalPosition<f64>) -> [f64; 2] {
        delta(self.touches.insert(id, position), position)
    }

    fn touch_ended(&mut self, id: u64) {
        self.touches.remove(&id);
    }
}

fn delta(previous: Option<LogicalPosition<f64>>, current: LogicalPosition<f64>) -> [f64; 2] {
    previous.map_or([0.0, 0.0], |previous| {
        [current.x - previous.x, current.y - previous.y]
    })
}

fn log_overlay(overlay: &HeroOverlay) {
    let content = overlay.content();
    tracing::info!(
        badge = content.trust_badge.as_deref().unwrap_or(""),
        line1 = %content.headline.line1,
        line2 = %content.headline.line2,
        subtitle = %content.subtitle,
        "hero content"
    );
    if let Some(primary) = &content.primary {
        tracing::info!(text = %primary.text, "primary action (Enter)");
    }
    if let Some(secondary) = &content.secondary {
        tracing::info!(text = %secondary.text, "secondary action (Tab)");
    }
    for stat in &content.stats {
        tracing::info!(value = %stat.value, label = %stat.label, "stat");
    }
}

type Background = ShaderBackground<WindowSurface>;

fn handle_touch(background: &mut Background, input: &mut InputState, touch: Touch, scale: f64) {
    let position: LogicalPosition<f64> = touch.location.to_logical(scale);
    let id = PointerId::Touch(touch.id);
    match touch.phase {
        TouchPhase::Started => {
            input.touch_moved(touch.id, position);
            background.pointer_down(id, position.x, position.y);
        }
        TouchPhase::Moved => {
            let [dx, dy] = input.touch_moved(touch.id, position);
            background.pointer_move(id, position.x, position.y, dx, dy);
        }
        TouchPhase::Ended => {
            input.touch_ended(touch.id);
            background.pointer_up(id);
        }
        TouchPhase::Cancelled => {
            input.touch_ended(touch.id);
            background.pointer_leave(id);
        }
    }
}

fn handle_key(background: &mut Background, event: &KeyEvent) -> bool {
    if event.state != ElementState::Pressed || event.repeat {
        return false;
    }
    match &event.logical_key {
        Key::Named(NamedKey::Escape) => return true,
        Key::Named(NamedKey::Enter) => {
            if !background.overlay_mut().trigger_primary() {
                tracing::debug!("no primary action configured");
            }
        }
        Key::Named(NamedKey::Tab) => {
            if !background.overlay_mut().trigger_secondary() {
                tracing::debug!("no secondary action configured");
            }
        }
        _ => {}
    }
    false
}

/// Opens the window and runs the hero until it is closed.
pub(crate) fn run(config: RendererConfig) -> Result<()> {
    let RendererConfig {
        window_size,
        title,
        fragment_source,
        scale_policy,
        power_preference,
        overlay,
    } = config;

    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let title = title.unwrap_or_else(|| overlay.content().title());
    let window = WindowBuilder::new()
        .with_title(title)
        .with_inner_size(LogicalSize::new(window_size.0, window_size.1))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    log_overlay(&overlay);

    let mut host = RedrawHost::new(Arc::clone(&window));
    let mut clock = SystemTimeSource::new();
    let options = BackgroundOptions {
        scale_policy,
        fragment_source,
    };
    let surface = WindowSurface::new(Arc::clone(&window), power_preference);
    let mut background = ShaderBackground::mount(surface, options, overlay, &mut host);
    if !background.is_rendering() {
        tracing::warn!("running without an animated background");
    }
    let mut input = InputState::default();

    event_loop.set_control_flow(ControlFlow::Wait);
    event_loop
        .run(move |event, elwt| match event {
            // Frame times count from the first loop iteration.
            Event::NewEvents(StartCause::Init) => clock.reset(),
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    background.unmount(&mut host);
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if handle_key(&mut background, &event) {
                        background.unmount(&mut host);
                        elwt.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let position: LogicalPosition<f64> =
                        position.to_logical(window.scale_factor());
                    let [dx, dy] = input.cursor_moved(position);
                    background.pointer_move(PointerId::Mouse, position.x, position.y, dx, dy);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => {
                        let position = input.cursor.unwrap_or(LogicalPosition::new(0.0, 0.0));
                        background.pointer_down(PointerId::Mouse, position.x, position.y);
                    }
                    ElementState::Released => background.pointer_up(PointerId::Mouse),
                },
                WindowEvent::CursorLeft { .. } => {
                    input.cursor = None;
                    background.pointer_leave(PointerId::Mouse);
                }
                WindowEvent::Touch(touch) => {
                    handle_touch(&mut background, &mut input, touch, window.scale_factor());
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    background.on_resize();
                }
                WindowEvent::RedrawRequested => {
                    if let Some(request) = host.take_pending() {
                        background.on_frame(&mut host, request, clock.now());
                    }
                }
                _ => {}
            },
            Event::LoopExiting => background.unmount(&mut host),
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_cursor_position_has_no_delta() {
        let mut input = InputState::default();
        assert_eq!(input.cursor_moved(LogicalPosition::new(10.0, 10.0)), [0.0, 0.0]);
        assert_eq!(input.cursor_moved(LogicalPosition::new(13.0, 6.0)), [3.0, -4.0]);
    }

    #[test]
    fn touches_track_deltas_independently() {
        let mut input = InputState::default();
        input.touch_moved(1, LogicalPosition::new(0.0, 0.0));
        input.touch_moved(2, LogicalPosition::new(100.0, 100.0));

        assert_eq!(input.touch_moved(1, LogicalPosition::new(1.0, 2.0)), [1.0, 2.0]);
        assert_eq!(input.touch_moved(2, LogicalPosition::new(90.0, 100.0)), [-10.0, 0.0]);

        input.touch_ended(1);
        assert_eq!(input.touch_moved(1, LogicalPosition::new(5.0, 5.0)), [0.0, 0.0]);
    }
}
