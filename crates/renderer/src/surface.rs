//! GPU-side state for the hero background.
//!
//! [`RenderSurface`] owns the rendering context and the single live shader
//! program. Program replacement is atomic: a candidate is compiled and linked
//! in full before the previous program is released, so a broken shader edit
//! never blanks the output.

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::compile::{validate_fragment, FALLBACK_FRAGMENT_SHADER};
use crate::gpu::FrameUniforms;
use crate::pointer::PointerSnapshot;
use crate::types::{RenderError, ShaderDiagnostic};

/// GPU operations the render surface is built on.
pub trait GraphicsContext {
    type Program;

    /// Resizes the render target to `viewport` device pixels.
    fn resize(&mut self, viewport: PhysicalSize<u32>);

    /// Compiles `source` into a throwaway object, leaving live state untouched.
    fn check_fragment(&self, source: &str) -> Result<(), ShaderDiagnostic>;

    fn link_program(&mut self, vertex: &str, fragment: &str)
        -> Result<Self::Program, RenderError>;

    fn draw(&mut self, program: &Self::Program, uniforms: &FrameUniforms)
        -> Result<(), RenderError>;

    fn release_program(&mut self, program: Self::Program);
}

/// Host surface a rendering context can be acquired from.
pub trait DrawableSurface {
    type Context: GraphicsContext;

    fn logical_size(&self) -> LogicalSize<f64>;

    fn device_pixel_ratio(&self) -> f64;

    fn acquire_context(&self, viewport: PhysicalSize<u32>) -> Result<Self::Context, RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Context acquired, nothing drawable yet (or the first compile failed).
    ContextAcquired,
    ProgramLinked,
    /// The context was lost mid-run; every later draw is a no-op.
    ContextLost,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    /// No linked program or no context.
    Skipped,
}

type ProgramOf<S> = <<S as DrawableSurface>::Context as GraphicsContext>::Program;

pub struct RenderSurface<S: DrawableSurface> {
    drawable: S,
    context: Option<S::Context>,
    program: Option<ProgramOf<S>>,
    default_fragment: &'static str,
    scale: f32,
    viewport: PhysicalSize<u32>,
    state: SurfaceState,
}

impl<S: DrawableSurface> RenderSurface<S> {
    /// Acquires a context from `drawable` with a viewport of `size × initial_scale`
    /// and records the fallback shader as the default source.
    pub fn initialize(drawable: S, initial_scale: f32) -> Result<Self, RenderError> {
        let scale = sanitize_scale(initial_scale);
        let viewport = viewport_for(drawable.logical_size(), scale);
        let context = drawable.acquire_context(viewport)?;
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            scale,
            "rendering context acquired"
        );

        Ok(Self {
            drawable,
            context: Some(context),
            program: None,
            default_fragment: FALLBACK_FRAGMENT_SHADER,
            scale,
            viewport,
            state: SurfaceState::ContextAcquired,
        })
    }

    /// Compiles and links a program, making it the live one on success.
    ///
    /// On failure the diagnostic is logged and whatever program was live
    /// before (if any) stays live.
    pub fn compile_and_link(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<(), RenderError> {
        let context = match (&mut self.context, self.state) {
            (Some(context), SurfaceState::ContextAcquired | SurfaceState::ProgramLinked) => context,
            _ => {
                return Err(RenderError::ContextUnavailable(format!(
                    "surface is {:?}",
                    self.state
                )))
            }
        };

        match context.link_program(vertex, fragment) {
            Ok(program) => {
                if let Some(previous) = self.program.replace(program) {
                    context.release_program(previous);
                }
                self.state = SurfaceState::ProgramLinked;
                tracing::debug!("shader program linked");
                Ok(())
            }
            Err(err) => {
                if self.program.is_some() {
                    tracing::warn!(
                        error = %err,
                        "shader update rejected; keeping previous program"
                    );
                } else {
                    tracing::warn!(error = %err, "shader setup failed; background will not render");
                }
                Err(err)
            }
        }
    }

    /// Checks whether `fragment` would compile, without touching the live program.
    pub fn validate_shader(&self, fragment: &str) -> Option<ShaderDiagnostic> {
        let result = match &self.context {
            Some(context) => context.check_fragment(fragment),
            None => validate_fragment(fragment),
        };
        result.err()
    }

    /// Replaces the live program with one built from the given sources.
    ///
    /// Safe to call with nothing allocated. The previous program is released
    /// only once its replacement has linked.
    pub fn teardown_and_replace(
        &mut self,
        vertex: &str,
        fragment: &str,
    ) -> Result<(), RenderError> {
        tracing::debug!(had_program = self.program.is_some(), "replacing shader program");
        self.compile_and_link(vertex, fragment)
    }

    /// Resizes the viewport to `logical size × scale`.
    pub fn set_viewport_scale(&mut self, scale: f32) {
        self.scale = sanitize_scale(scale);
        self.viewport = viewport_for(self.drawable.logical_size(), self.scale);
        if let Some(context) = &mut self.context {
            context.resize(self.viewport);
        }
    }

    /// Writes this frame's uniforms and draws the full-screen quad.
    ///
    /// A no-op when nothing is drawable. A lost context is released here, so
    /// the error is reported once and later frames are skipped.
    pub fn draw_frame(
        &mut self,
        time: f32,
        snapshot: &PointerSnapshot,
    ) -> Result<DrawOutcome, RenderError> {
        let (Some(context), Some(program)) = (&mut self.context, &self.program) else {
            return Ok(DrawOutcome::Skipped);
        };

        let uniforms = FrameUniforms::new(self.viewport, time, snapshot);
        match context.draw(program, &uniforms) {
            Ok(()) => Ok(DrawOutcome::Drawn),
            Err(err @ RenderError::LostContext(_)) => {
                self.release_all();
                self.state = SurfaceState::ContextLost;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Releases the program and the context. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == SurfaceState::Disposed {
            return;
        }
        self.release_all();
        self.state = SurfaceState::Disposed;
        tracing::debug!("render surface disposed");
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_drawable(&self) -> bool {
        self.context.is_some() && self.program.is_some()
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn default_fragment(&self) -> &'static str {
        self.default_fragment
    }

    pub fn drawable(&self) -> &S {
        &self.drawable
    }

    fn release_all(&mut self) {
        if let (Some(context), Some(program)) = (&mut self.context, self.program.take()) {
            context.release_program(program);
        }
        self.program = None;
        self.context = None;
    }
}

fn viewport_for(size: LogicalSize<f64>, scale: f32) -> PhysicalSize<u32> {
    let scale = f64::from(scale);
    PhysicalSize::new(
        (size.width * scale).round().max(1.0) as u32,
        (size.height * scale).round().max(1.0) as u32,
    )
}

fn sanitize_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::VERTEX_SHADER;
    use crate::testing::{FakeSurface, BROKEN_FRAGMENT, PLAIN_FRAGMENT};

    fn linked_surface() -> (RenderSurface<FakeSurface>, FakeSurface) {
        let drawable = FakeSurface::new(400.0, 300.0, 1.0);
        let mut surface = RenderSurface::initialize(drawable.clone(), 1.0).unwrap();
        surface
            .compile_and_link(VERTEX_SHADER, PLAIN_FRAGMENT)
            .unwrap();
        (surface, drawable)
    }

    #[test]
    fn initialize_reports_unavailable_context() {
        let drawable = FakeSurface::without_context();
        let err = RenderSurface::initialize(drawable, 1.0).err().unwrap();
        assert!(matches!(err, RenderError::ContextUnavailable(_)));
    }

    #[test]
    fn initialize_scales_viewport() {
        let drawable = FakeSurface::new(400.0, 300.0, 2.0);
        let surface = RenderSurface::initialize(drawable.clone(), 1.5).unwrap();
        assert_eq!(surface.viewport(), PhysicalSize::new(600, 450));
        assert_eq!(surface.state(), SurfaceState::ContextAcquired);
        assert!(!surface.is_drawable());
    }

    #[test]
    fn unlinked_surface_skips_draws() {
        let drawable = FakeSurface::new(400.0, 300.0, 1.0);
        let mut surface = RenderSurface::initialize(drawable.clone(), 1.0).unwrap();
        assert!(surface
            .compile_and_link(VERTEX_SHADER, BROKEN_FRAGMENT)
            .is_err());

        let outcome = surface.draw_frame(0.0, &PointerSnapshot::default()).unwrap();
        assert_eq!(outcome, DrawOutcome::Skipped);
        assert_eq!(surface.state(), SurfaceState::ContextAcquired);
        assert!(drawable.log().draws.is_empty());
    }

    #[test]
    fn broken_replacement_keeps_previous_program() {
        let (mut surface, drawable) = linked_surface();
        let err = surface
            .teardown_and_replace(VERTEX_SHADER, BROKEN_FRAGMENT)
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderCompile(_)));
        assert_eq!(surface.state(), SurfaceState::ProgramLinked);

        let outcome = surface.draw_frame(0.5, &PointerSnapshot::default()).unwrap();
        assert_eq!(outcome, DrawOutcome::Drawn);
        let log = drawable.log();
        assert_eq!(log.draws.len(), 1);
        assert_eq!(log.draws[0].0, 1);
        assert!(log.released.is_empty());
    }

    #[test]
    fn replace_on_surface_without_program() {
        let drawable = FakeSurface::new(400.0, 300.0, 1.0);
        let mut surface = RenderSurface::initialize(drawable.clone(), 1.0).unwrap();

        assert!(surface
            .teardown_and_replace(VERTEX_SHADER, BROKEN_FRAGMENT)
            .is_err());
        assert_eq!(surface.state(), SurfaceState::ContextAcquired);
        surface
            .teardown_and_replace(VERTEX_SHADER, PLAIN_FRAGMENT)
            .unwrap();

        let outcome = surface.draw_frame(0.0, &PointerSnapshot::default()).unwrap();
        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(surface.state(), SurfaceState::ProgramLinked);
        let log = drawable.log();
        assert!(log.released.is_empty());
        assert_eq!(log.linked, 1);
        assert_eq!(log.draws[0].0, 1);
    }

    #[test]
    fn successful_replacement_releases_previous_program() {
        let (mut surface, drawable) = linked_surface();
        surface
            .teardown_and_replace(VERTEX_SHADER, surface.default_fragment())
            .unwrap();
        surface.draw_frame(0.0, &PointerSnapshot::default()).unwrap();

        let log = drawable.log();
        assert_eq!(log.released, vec![1]);
        assert_eq!(log.draws[0].0, 2);
    }

    #[test]
    fn validate_shader_leaves_live_program_alone() {
        let (mut surface, drawable) = linked_surface();
        for _ in 0..3 {
            assert!(surface.validate_shader(BROKEN_FRAGMENT).is_some());
            assert!(surface.validate_shader(PLAIN_FRAGMENT).is_none());
        }
        surface.draw_frame(0.0, &PointerSnapshot::default()).unwrap();

        let log = drawable.log();
        assert_eq!(log.linked, 1);
        assert_eq!(log.draws[0].0, 1);
    }

    #[test]
    fn viewport_scale_doubles_resolution_uniform() {
        let (mut surface, drawable) = linked_surface();
        surface.set_viewport_scale(2.0);
        surface.draw_frame(1.0, &PointerSnapshot::default()).unwrap();

        let log = drawable.log();
        assert_eq!(log.resizes.last(), Some(&PhysicalSize::new(800, 600)));
        assert_eq!(log.draws[0].1.resolution, [800.0, 600.0]);
        assert_eq!(log.draws[0].1.time, 1.0);
    }

    #[test]
    fn lost_context_turns_draws_into_noops() {
        let (mut surface, drawable) = linked_surface();
        drawable.lose_context_on_next_draw();

        let err = surface
            .draw_frame(0.0, &PointerSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::LostContext(_)));
        assert_eq!(surface.state(), SurfaceState::ContextLost);

        let outcome = surface.draw_frame(0.1, &PointerSnapshot::default()).unwrap();
        assert_eq!(outcome, DrawOutcome::Skipped);
        assert!(surface
            .compile_and_link(VERTEX_SHADER, PLAIN_FRAGMENT)
            .is_err());
    }

    #[test]
    fn dispose_is_idempotent() {
        let (mut surface, drawable) = linked_surface();
        surface.dispose();
        surface.dispose();

        assert_eq!(surface.state(), SurfaceState::Disposed);
        assert_eq!(drawable.log().released, vec![1]);
        assert_eq!(
            surface.draw_frame(0.0, &PointerSnapshot::default()).unwrap(),
            DrawOutcome::Skipped
        );
    }
}
