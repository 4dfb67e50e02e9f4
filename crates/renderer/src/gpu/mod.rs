//! wgpu backend for [`crate::RenderSurface`].
//!
//! - `context` owns the instance/device/swapchain and the offscreen target
//!   the hero shader renders into.
//! - `program` links wrapped GLSL into a pipeline with its own uniform and
//!   quad buffers.
//! - `present` blits the offscreen frame onto the swapchain.
//! - `uniforms` mirrors the std140 block injected by the shader wrapper.

mod context;
mod present;
mod program;
mod uniforms;

use winit::dpi::PhysicalSize;

pub use context::WgpuContext;
pub use program::ShaderProgram;
pub use uniforms::{FrameUniforms, MAX_POINTERS};

use crate::compile::{validate_fragment, wrap_fragment};
use crate::surface::GraphicsContext;
use crate::types::{RenderError, ShaderDiagnostic};

impl GraphicsContext for WgpuContext {
    type Program = ShaderProgram;

    fn resize(&mut self, viewport: PhysicalSize<u32>) {
        self.resize_target(viewport);
    }

    fn check_fragment(&self, source: &str) -> Result<(), ShaderDiagnostic> {
        validate_fragment(source)
    }

    fn link_program(&mut self, vertex: &str, fragment: &str) -> Result<ShaderProgram, RenderError> {
        ShaderProgram::link(
            &self.device,
            &self.layouts,
            self.format(),
            vertex,
            &wrap_fragment(fragment),
        )
    }

    fn draw(
        &mut self,
        program: &ShaderProgram,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        self.render(program, uniforms)
    }

    fn release_program(&mut self, program: ShaderProgram) {
        program.destroy();
    }
}
