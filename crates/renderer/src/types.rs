use std::fmt;

use crate::hero::HeroOverlay;

/// Which pipeline stage a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Compiler output for a shader stage that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDiagnostic {
    pub stage: ShaderStage,
    pub message: String,
}

impl ShaderDiagnostic {
    pub fn new(stage: ShaderStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} shader: {}", self.stage, self.message.trim_end())
    }
}

impl std::error::Error for ShaderDiagnostic {}

/// Failures raised by the rendering subsystem.
///
/// None of these escape [`crate::ShaderBackground`]; they are logged where they
/// are detected and the background degrades to rendering nothing (or keeps its
/// last working program).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no compatible rendering context: {0}")]
    ContextUnavailable(String),
    #[error("shader compilation failed: {0}")]
    ShaderCompile(ShaderDiagnostic),
    #[error("program link failed: {0}")]
    ShaderLink(String),
    #[error("rendering context lost: {0}")]
    LostContext(String),
}

/// Adapter selection hint forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Prefer integrated GPUs; a background animation rarely needs more.
    #[default]
    Low,
    High,
}

/// Device-pixel-ratio policy applied on every resize.
///
/// The effective scale is `max(min_scale, dpr_factor * dpr)`: rendering never
/// drops below one backing pixel per logical pixel, and high-density displays
/// render at a fraction of their native density to bound fill-rate cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePolicy {
    pub dpr_factor: f32,
    pub min_scale: f32,
}

impl ScalePolicy {
    pub fn new(dpr_factor: f32, min_scale: f32) -> Self {
        Self {
            dpr_factor,
            min_scale,
        }
    }

    /// Returns the backing-buffer scale for the given device pixel ratio.
    pub fn scale_for(&self, device_pixel_ratio: f64) -> f32 {
        let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio as f32
        } else {
            1.0
        };
        (self.dpr_factor * dpr).max(self.min_scale.max(1.0))
    }
}

impl Default for ScalePolicy {
    fn default() -> Self {
        Self {
            dpr_factor: 0.5,
            min_scale: 1.0,
        }
    }
}

/// Configuration passed to [`crate::Renderer`] at start-up.
#[derive(Debug)]
pub struct RendererConfig {
    /// Initial window size in logical pixels.
    pub window_size: (u32, u32),
    /// Window title; the overlay headline is used when absent.
    pub title: Option<String>,
    /// Fragment shader to swap in after the built-in one compiles.
    pub fragment_source: Option<String>,
    pub scale_policy: ScalePolicy,
    pub power_preference: GpuPowerPreference,
    /// Page content layered above the animated background.
    pub overlay: HeroOverlay,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            title: None,
            fragment_source: None,
            scale_policy: ScalePolicy::default(),
            power_preference: GpuPowerPreference::default(),
            overlay: HeroOverlay::default(),
        }
    }
}
