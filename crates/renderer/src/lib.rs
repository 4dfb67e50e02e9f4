//! Renderer crate for nebula, an animated shader hero background.
//!
//! The pieces fit together like this:
//!
//! ```text
//!   host frame callback ──▶ FrameScheduler::on_frame
//!                                 │ snapshot()
//!                                 ├──────────────▶ PointerTracker ◀── pointer events
//!                                 │ draw_frame()
//!                                 ▼
//!                           RenderSurface ──▶ GraphicsContext (wgpu) ──▶ swapchain
//! ```
//!
//! [`ShaderBackground`] owns all three and their mount/unmount lifecycle.
//! [`Renderer`] runs it inside a winit window. Fragment shaders are written
//! against a WebGL2-style uniform contract (`resolution`, `time`, `move`,
//! `touch`, `pointerCount`, `pointers`) and wrapped at runtime so naga can
//! compile them as Vulkan GLSL.

mod compile;
mod gpu;
mod hero;
mod pointer;
mod runtime;
mod surface;
#[cfg(test)]
mod testing;
mod types;
mod window;

use anyhow::Result;

pub use compile::{
    validate_fragment, DEFAULT_FRAGMENT_SHADER, FALLBACK_FRAGMENT_SHADER, VERTEX_SHADER,
};
pub use gpu::{FrameUniforms, ShaderProgram, WgpuContext, MAX_POINTERS};
pub use hero::{
    ActionCallback, BackgroundOptions, CallToAction, Headline, HeroContent, HeroOverlay,
    ShaderBackground, Stat,
};
pub use pointer::{PointerId, PointerSnapshot, PointerTracker};
pub use runtime::{FrameHost, FrameRequest, FrameScheduler, SystemTimeSource, TimeSource};
pub use surface::{DrawOutcome, DrawableSurface, GraphicsContext, RenderSurface, SurfaceState};
pub use types::{
    GpuPowerPreference, RenderError, RendererConfig, ScalePolicy, ShaderDiagnostic, ShaderStage,
};
pub use window::WindowSurface;

/// Entry point that opens a window and animates the hero inside it.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Blocks until the window is closed.
    pub fn run(self) -> Result<()> {
        window::run(self.config)
    }
}
