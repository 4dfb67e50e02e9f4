//! Embeddable hero section: the animated shader background plus the page
//! content layered over it.
//!
//! [`ShaderBackground`] wires the [`RenderSurface`], [`PointerTracker`] and
//! [`FrameScheduler`] together and owns their mount/unmount lifecycle. The
//! [`HeroOverlay`] is carried alongside and never touches the render loop.

use std::fmt;
use std::time::Duration;

use crate::compile::{validate_fragment, DEFAULT_FRAGMENT_SHADER, VERTEX_SHADER};
use crate::pointer::{PointerId, PointerTracker};
use crate::runtime::{FrameHost, FrameRequest, FrameScheduler};
use crate::surface::{DrawOutcome, DrawableSurface, RenderSurface};
use crate::types::{RenderError, ScalePolicy, ShaderDiagnostic, ShaderStage};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headline {
    pub line1: String,
    pub line2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallToAction {
    pub text: String,
    /// Opaque tag handed back to the embedder when the action fires.
    pub action: Option<String>,
}

impl CallToAction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub value: String,
    pub label: String,
}

/// Non-visual page content shown above the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroContent {
    pub trust_badge: Option<String>,
    pub headline: Headline,
    pub subtitle: String,
    pub primary: Option<CallToAction>,
    pub secondary: Option<CallToAction>,
    pub stats: Vec<Stat>,
}

impl Default for HeroContent {
    fn default() -> Self {
        Self {
            trust_badge: None,
            headline: Headline {
                line1: "Work without borders".to_string(),
                line2: "Paid on-chain".to_string(),
            },
            subtitle: String::new(),
            primary: None,
            secondary: None,
            stats: Vec::new(),
        }
    }
}

impl HeroContent {
    /// Both headline lines joined with a space.
    pub fn title(&self) -> String {
        match (self.headline.line1.trim(), self.headline.line2.trim()) {
            (first, "") => first.to_string(),
            ("", second) => second.to_string(),
            (first, second) => format!("{first} {second}"),
        }
    }
}

pub type ActionCallback = Box<dyn FnMut(Option<&str>)>;

/// Hero content plus the callbacks behind its call-to-action buttons.
#[derive(Default)]
pub struct HeroOverlay {
    content: HeroContent,
    on_primary: Option<ActionCallback>,
    on_secondary: Option<ActionCallback>,
}

impl HeroOverlay {
    pub fn new(content: HeroContent) -> Self {
        Self {
            content,
            on_primary: None,
            on_secondary: None,
        }
    }

    pub fn with_primary_action(mut self, callback: impl FnMut(Option<&str>) + 'static) -> Self {
        self.on_primary = Some(Box::new(callback));
        self
    }

    pub fn with_secondary_action(mut self, callback: impl FnMut(Option<&str>) + 'static) -> Self {
        self.on_secondary = Some(Box::new(callback));
        self
    }

    pub fn content(&self) -> &HeroContent {
        &self.content
    }

    /// Runs the primary callback. Returns whether a callback ran.
    pub fn trigger_primary(&mut self) -> bool {
        Self::trigger(self.content.primary.as_ref(), self.on_primary.as_mut())
    }

    /// Runs the secondary callback. Returns whether a callback ran.
    pub fn trigger_secondary(&mut self) -> bool {
        Self::trigger(self.content.secondary.as_ref(), self.on_secondary.as_mut())
    }

    fn trigger(button: Option<&CallToAction>, callback: Option<&mut ActionCallback>) -> bool {
        match (button, callback) {
            (Some(button), Some(callback)) => {
                callback(button.action.as_deref());
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for HeroOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeroOverlay")
            .field("content", &self.content)
            .field("on_primary", &self.on_primary.is_some())
            .field("on_secondary", &self.on_secondary.is_some())
            .finish()
    }
}

/// Start-up options for [`ShaderBackground::mount`].
#[derive(Debug, Clone, Default)]
pub struct BackgroundOptions {
    pub scale_policy: ScalePolicy,
    /// Replaces the built-in nebula shader when it validates.
    pub fragment_source: Option<String>,
}

struct Mounted<S: DrawableSurface> {
    surface: RenderSurface<S>,
    tracker: PointerTracker,
    scheduler: FrameScheduler,
}

/// The animated background together with its overlay.
///
/// A background whose context could not be acquired is still a valid value:
/// it renders nothing and every input is ignored, while the overlay keeps
/// working.
pub struct ShaderBackground<S: DrawableSurface> {
    overlay: HeroOverlay,
    mounted: Option<Mounted<S>>,
    listening_for_resize: bool,
}

impl<S: DrawableSurface> ShaderBackground<S> {
    pub fn mount(
        drawable: S,
        options: BackgroundOptions,
        overlay: HeroOverlay,
        host: &mut dyn FrameHost,
    ) -> Self {
        let policy = options.scale_policy;
        let scale = policy.scale_for(drawable.device_pixel_ratio());
        let mut surface = match RenderSurface::initialize(drawable, scale) {
            Ok(surface) => surface,
            Err(err) => {
                tracing::warn!(error = %err, "animated background unavailable");
                return Self {
                    overlay,
                    mounted: None,
                    listening_for_resize: false,
                };
            }
        };

        let mut tracker = PointerTracker::new(scale);
        tracker.attach(surface.viewport());
        // Failure is logged by the surface; the loop then no-ops until a
        // later update succeeds.
        let _ = surface.compile_and_link(VERTEX_SHADER, surface.default_fragment());

        let mut scheduler = FrameScheduler::new(policy);
        scheduler.on_resize(&mut surface, &mut tracker);

        let candidate = options
            .fragment_source
            .as_deref()
            .unwrap_or(DEFAULT_FRAGMENT_SHADER);
        match surface.validate_shader(candidate) {
            None => {
                let _ = surface.teardown_and_replace(VERTEX_SHADER, candidate);
            }
            Some(diagnostic) => {
                tracing::warn!(%diagnostic, "shader rejected; keeping fallback");
            }
        }

        scheduler.start(host);
        tracing::info!(
            width = surface.viewport().width,
            height = surface.viewport().height,
            scale,
            "hero background mounted"
        );

        Self {
            overlay,
            mounted: Some(Mounted {
                surface,
                tracker,
                scheduler,
            }),
            listening_for_resize: true,
        }
    }

    pub fn on_frame(
        &mut self,
        host: &mut dyn FrameHost,
        request: FrameRequest,
        timestamp: Duration,
    ) -> Option<DrawOutcome> {
        let mounted = self.mounted.as_mut()?;
        mounted.scheduler.on_frame(
            host,
            request,
            timestamp,
            &mut mounted.surface,
            &mounted.tracker,
        )
    }

    pub fn on_resize(&mut self) {
        if !self.listening_for_resize {
            return;
        }
        if let Some(mounted) = &mut self.mounted {
            mounted
                .scheduler
                .on_resize(&mut mounted.surface, &mut mounted.tracker);
        }
    }

    pub fn pointer_down(&mut self, id: PointerId, x: f64, y: f64) {
        if let Some(mounted) = &mut self.mounted {
            mounted.tracker.on_pointer_down(id, x, y);
        }
    }

    pub fn pointer_move(&mut self, id: PointerId, x: f64, y: f64, dx: f64, dy: f64) {
        if let Some(mounted) = &mut self.mounted {
            mounted.tracker.on_pointer_move(id, x, y, dx, dy);
        }
    }

    pub fn pointer_up(&mut self, id: PointerId) {
        if let Some(mounted) = &mut self.mounted {
            mounted.tracker.on_pointer_up(id);
        }
    }

    pub fn pointer_leave(&mut self, id: PointerId) {
        if let Some(mounted) = &mut self.mounted {
            mounted.tracker.on_pointer_leave(id);
        }
    }

    /// Validates `fragment` and, if it compiles, swaps it in.
    ///
    /// On any failure the previous program keeps rendering.
    pub fn update_shader(&mut self, fragment: &str) -> Result<(), ShaderDiagnostic> {
        let Some(mounted) = &mut self.mounted else {
            return validate_fragment(fragment);
        };
        if let Some(diagnostic) = mounted.surface.validate_shader(fragment) {
            tracing::warn!(%diagnostic, "shader update rejected");
            return Err(diagnostic);
        }
        mounted
            .surface
            .teardown_and_replace(VERTEX_SHADER, fragment)
            .map_err(|err| match err {
                RenderError::ShaderCompile(diagnostic) => diagnostic,
                other => ShaderDiagnostic::new(ShaderStage::Fragment, other.to_string()),
            })?;
        tracing::info!("shader updated");
        Ok(())
    }

    /// Stops listening for resizes, cancels the pending frame, then releases
    /// GPU resources. Idempotent.
    pub fn unmount(&mut self, host: &mut dyn FrameHost) {
        self.listening_for_resize = false;
        if let Some(mounted) = &mut self.mounted {
            mounted.scheduler.stop(host);
            mounted.surface.dispose();
            mounted.tracker.detach();
        }
    }

    /// True while a program is live and the loop is running.
    pub fn is_rendering(&self) -> bool {
        self.mounted.as_ref().is_some_and(|mounted| {
            mounted.scheduler.is_running() && mounted.surface.is_drawable()
        })
    }

    pub fn surface(&self) -> Option<&RenderSurface<S>> {
        self.mounted.as_ref().map(|mounted| &mounted.surface)
    }

    pub fn tracker(&self) -> Option<&PointerTracker> {
        self.mounted.as_ref().map(|mounted| &mounted.tracker)
    }

    pub fn overlay(&self) -> &HeroOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut HeroOverlay {
        &mut self.overlay
    }
}
