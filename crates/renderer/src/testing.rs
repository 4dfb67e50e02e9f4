//! In-memory stand-ins for the GPU and the host, shared by unit tests.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::compile::{check_stage, validate_fragment};
use crate::gpu::FrameUniforms;
use crate::runtime::{FrameHost, FrameRequest};
use crate::surface::{DrawableSurface, GraphicsContext};
use crate::types::{RenderError, ShaderDiagnostic, ShaderStage};

pub(crate) const PLAIN_FRAGMENT: &str = r"#version 300 es
precision highp float;
uniform vec2 resolution;
uniform float time;
out vec4 fragColor;

void main(void) {
    vec2 uv = gl_FragCoord.xy / resolution;
    fragColor = vec4(uv, 0.5 + 0.5 * sin(time), 1.0);
}
";

pub(crate) const BROKEN_FRAGMENT: &str = r"#version 300 es
precision highp float;
out vec4 fragColor;

void main() {
    fragColor = vec4(undeclared_colour, 1.0);
}
";

#[derive(Debug, Default)]
pub(crate) struct ContextLog {
    pub linked: u32,
    pub released: Vec<u32>,
    pub draws: Vec<(u32, FrameUniforms)>,
    pub resizes: Vec<PhysicalSize<u32>>,
    pub lose_next_draw: bool,
}

/// Drawable whose contexts record every call into a shared log.
#[derive(Clone)]
pub(crate) struct FakeSurface {
    size: LogicalSize<f64>,
    dpr: Rc<Cell<f64>>,
    available: bool,
    log: Rc<RefCell<ContextLog>>,
}

impl FakeSurface {
    pub fn new(width: f64, height: f64, dpr: f64) -> Self {
        Self {
            size: LogicalSize::new(width, height),
            dpr: Rc::new(Cell::new(dpr)),
            available: true,
            log: Rc::default(),
        }
    }

    pub fn without_context() -> Self {
        Self {
            available: false,
            ..Self::new(640.0, 480.0, 1.0)
        }
    }

    pub fn log(&self) -> Ref<'_, ContextLog> {
        self.log.borrow()
    }

    pub fn lose_context_on_next_draw(&self) {
        self.log.borrow_mut().lose_next_draw = true;
    }

    pub fn set_device_pixel_ratio(&self, dpr: f64) {
        self.dpr.set(dpr);
    }
}

impl DrawableSurface for FakeSurface {
    type Context = RecordingContext;

    fn logical_size(&self) -> LogicalSize<f64> {
        self.size
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.dpr.get()
    }

    fn acquire_context(
        &self,
        viewport: PhysicalSize<u32>,
    ) -> Result<RecordingContext, RenderError> {
        if !self.available {
            return Err(RenderError::ContextUnavailable("no adapter".to_string()));
        }
        self.log.borrow_mut().resizes.push(viewport);
        Ok(RecordingContext {
            log: Rc::clone(&self.log),
        })
    }
}

pub(crate) struct RecordingContext {
    log: Rc<RefCell<ContextLog>>,
}

#[derive(Debug)]
pub(crate) struct FakeProgram(u32);

impl GraphicsContext for RecordingContext {
    type Program = FakeProgram;

    fn resize(&mut self, viewport: PhysicalSize<u32>) {
        self.log.borrow_mut().resizes.push(viewport);
    }

    fn check_fragment(&self, source: &str) -> Result<(), ShaderDiagnostic> {
        validate_fragment(source)
    }

    fn link_program(&mut self, vertex: &str, fragment: &str) -> Result<FakeProgram, RenderError> {
        check_stage(ShaderStage::Vertex, vertex).map_err(RenderError::ShaderCompile)?;
        validate_fragment(fragment).map_err(RenderError::ShaderCompile)?;
        let mut log = self.log.borrow_mut();
        log.linked += 1;
        Ok(FakeProgram(log.linked))
    }

    fn draw(&mut self, program: &FakeProgram, uniforms: &FrameUniforms) -> Result<(), RenderError> {
        let mut log = self.log.borrow_mut();
        if std::mem::take(&mut log.lose_next_draw) {
            return Err(RenderError::LostContext("device reset".to_string()));
        }
        log.draws.push((program.0, *uniforms));
        Ok(())
    }

    fn release_program(&mut self, program: FakeProgram) {
        self.log.borrow_mut().released.push(program.0);
    }
}

/// Frame host that only counts registrations and cancellations.
#[derive(Debug, Default)]
pub(crate) struct CountingHost {
    pub registered: u64,
    pub cancelled: u64,
    last: Option<FrameRequest>,
}

impl CountingHost {
    pub fn last_request(&self) -> Option<FrameRequest> {
        self.last
    }
}

impl FrameHost for CountingHost {
    fn request_frame(&mut self) -> FrameRequest {
        self.registered += 1;
        let request = FrameRequest(self.registered);
        self.last = Some(request);
        request
    }

    fn cancel_frame(&mut self, _request: FrameRequest) {
        self.cancelled += 1;
    }
}
