//! Frame loop driving the render surface.
//!
//! [`FrameScheduler`] never sleeps or polls: the host invokes
//! [`FrameScheduler::on_frame`] from its display-refresh callback and the
//! scheduler requests the next callback before returning.

use std::time::{Duration, Instant};

use crate::pointer::PointerTracker;
use crate::surface::{DrawOutcome, DrawableSurface, RenderSurface};
use crate::types::{RenderError, ScalePolicy};

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Handle for one outstanding frame-callback registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Frame-callback registration primitive supplied by the host.
pub trait FrameHost {
    /// Asks for one callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Abstraction over where frame timestamps originate from.
pub trait TimeSource {
    /// Moves the origin to the current instant.
    fn reset(&mut self);
    /// Monotonic time since the origin.
    fn now(&self) -> Duration;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[derive(Debug, Default)]
struct FrameStats {
    drawn: u64,
    skipped: u64,
    failed: u64,
    window_start: Option<Duration>,
    window_drawn: u64,
}

impl FrameStats {
    fn record(&mut self, timestamp: Duration, outcome: Option<DrawOutcome>) {
        match outcome {
            Some(DrawOutcome::Drawn) => {
                self.drawn += 1;
                self.window_drawn += 1;
            }
            Some(DrawOutcome::Skipped) => self.skipped += 1,
            None => self.failed += 1,
        }

        let start = *self.window_start.get_or_insert(timestamp);
        let span = timestamp.saturating_sub(start);
        if span >= STATS_INTERVAL {
            let fps = self.window_drawn as f64 / span.as_secs_f64();
            tracing::debug!(
                fps = format_args!("{fps:.1}"),
                drawn = self.drawn,
                skipped = self.skipped,
                failed = self.failed,
                "frame stats"
            );
            self.window_start = Some(timestamp);
            self.window_drawn = 0;
        }
    }
}

/// Drives continuous drawing and owns the resize/device-pixel-ratio policy.
#[derive(Debug)]
pub struct FrameScheduler {
    policy: ScalePolicy,
    pending: Option<FrameRequest>,
    running: bool,
    scale: f32,
    stats: FrameStats,
}

impl FrameScheduler {
    pub fn new(policy: ScalePolicy) -> Self {
        Self {
            policy,
            pending: None,
            running: false,
            scale: 1.0,
            stats: FrameStats::default(),
        }
    }

    /// Scale computed by the last [`FrameScheduler::on_resize`].
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Begins requesting frame callbacks. A second call while running is ignored.
    pub fn start(&mut self, host: &mut dyn FrameHost) {
        if self.running {
            return;
        }
        self.running = true;
        self.pending = Some(host.request_frame());
        tracing::debug!("frame loop started");
    }

    /// Cancels the pending callback, if any. Safe to call at any time.
    pub fn stop(&mut self, host: &mut dyn FrameHost) {
        if let Some(request) = self.pending.take() {
            host.cancel_frame(request);
        }
        if self.running {
            tracing::debug!(drawn = self.stats.drawn, "frame loop stopped");
        }
        self.running = false;
    }

    /// Handles one frame callback.
    ///
    /// Callbacks that do not match the pending request (already cancelled, or
    /// delivered after `stop`) are ignored. Draw failures are logged and the
    /// next frame is requested regardless.
    pub fn on_frame<S: DrawableSurface>(
        &mut self,
        host: &mut dyn FrameHost,
        request: FrameRequest,
        timestamp: Duration,
        surface: &mut RenderSurface<S>,
        tracker: &PointerTracker,
    ) -> Option<DrawOutcome> {
        if !self.running || self.pending != Some(request) {
            tracing::trace!(?request, "ignoring stale frame callback");
            return None;
        }
        self.pending = None;

        let snapshot = tracker.snapshot();
        let outcome = match surface.draw_frame(timestamp.as_secs_f32(), &snapshot) {
            Ok(outcome) => Some(outcome),
            Err(err @ RenderError::LostContext(_)) => {
                tracing::error!(error = %err, "rendering context lost; background stops updating");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "frame draw failed");
                None
            }
        };
        tracing::trace!(?outcome, pointers = snapshot.count, "frame");
        self.stats.record(timestamp, outcome);

        self.pending = Some(host.request_frame());
        outcome
    }

    /// Recomputes the scale from the drawable's current device pixel ratio and
    /// pushes it to the surface and the pointer tracker.
    pub fn on_resize<S: DrawableSurface>(
        &mut self,
        surface: &mut RenderSurface<S>,
        tracker: &mut PointerTracker,
    ) -> f32 {
        let dpr = surface.drawable().device_pixel_ratio();
        let scale = self.policy.scale_for(dpr);
        self.scale = scale;
        surface.set_viewport_scale(scale);
        tracker.set_scale(scale);
        tracker.set_surface_height(surface.viewport().height as f32);
        tracing::debug!(
            dpr,
            scale,
            width = surface.viewport().width,
            height = surface.viewport().height,
            "applied resize policy"
        );
        scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::VERTEX_SHADER;
    use crate::pointer::PointerId;
    use crate::testing::{CountingHost, FakeSurface, PLAIN_FRAGMENT};
    use winit::dpi::PhysicalSize;

    fn linked(drawable: &FakeSurface) -> RenderSurface<FakeSurface> {
        let mut surface = RenderSurface::initialize(drawable.clone(), 1.0).unwrap();
        surface
            .compile_and_link(VERTEX_SHADER, PLAIN_FRAGMENT)
            .unwrap();
        surface
    }

    #[test]
    fn reset_moves_clock_origin_forward() {
        let mut clock = SystemTimeSource::new();
        std::thread::sleep(Duration::from_millis(30));
        let before = clock.now();
        clock.reset();
        assert!(before >= Duration::from_millis(30));
        assert!(clock.now() < before);
    }

    #[test]
    fn stop_before_first_frame_issues_no_draws() {
        let drawable = FakeSurface::new(320.0, 240.0, 1.0);
        let _surface = linked(&drawable);
        let mut host = CountingHost::default();
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());

        scheduler.start(&mut host);
        scheduler.stop(&mut host);

        assert!(drawable.log().draws.is_empty());
        assert_eq!(host.registered, 1);
        assert_eq!(host.cancelled, host.registered);
        assert!(scheduler.pending().is_none());
    }

    #[test]
    fn stop_without_start_is_harmless() {
        let mut host = CountingHost::default();
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());
        scheduler.stop(&mut host);
        scheduler.stop(&mut host);
        assert_eq!(host.cancelled, 0);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn each_frame_draws_and_requests_the_next() {
        let drawable = FakeSurface::new(320.0, 240.0, 1.0);
        let mut surface = linked(&drawable);
        let mut tracker = PointerTracker::new(1.0);
        tracker.attach(surface.viewport());
        tracker.on_pointer_down(PointerId::Mouse, 10.0, 40.0);
        let mut host = CountingHost::default();
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());

        scheduler.start(&mut host);
        for frame in 0..3u64 {
            let request = host.last_request().unwrap();
            let outcome = scheduler.on_frame(
                &mut host,
                request,
                Duration::from_millis(16 * frame),
                &mut surface,
                &tracker,
            );
            assert_eq!(outcome, Some(DrawOutcome::Drawn));
        }

        let log = drawable.log();
        assert_eq!(log.draws.len(), 3);
        assert!((log.draws[2].1.time - 0.032).abs() < 1e-6);
        assert_eq!(log.draws[2].1.touch, [10.0, 200.0]);
        assert_eq!(host.registered, 4);
    }

    #[test]
    fn stale_callbacks_are_ignored() {
        let drawable = FakeSurface::new(320.0, 240.0, 1.0);
        let mut surface = linked(&drawable);
        let tracker = PointerTracker::new(1.0);
        let mut host = CountingHost::default();
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());

        scheduler.start(&mut host);
        let request = host.last_request().unwrap();
        scheduler.stop(&mut host);
        let outcome =
            scheduler.on_frame(&mut host, request, Duration::ZERO, &mut surface, &tracker);

        assert_eq!(outcome, None);
        assert!(drawable.log().draws.is_empty());
        assert_eq!(host.registered, host.cancelled);
    }

    #[test]
    fn lost_context_keeps_loop_alive() {
        let drawable = FakeSurface::new(320.0, 240.0, 1.0);
        let mut surface = linked(&drawable);
        let tracker = PointerTracker::new(1.0);
        let mut host = CountingHost::default();
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());
        drawable.lose_context_on_next_draw();

        scheduler.start(&mut host);
        let first = host.last_request().unwrap();
        let outcome = scheduler.on_frame(&mut host, first, Duration::ZERO, &mut surface, &tracker);
        assert_eq!(outcome, None);
        assert!(scheduler.pending().is_some());

        let second = host.last_request().unwrap();
        let outcome = scheduler.on_frame(
            &mut host,
            second,
            Duration::from_millis(16),
            &mut surface,
            &tracker,
        );
        assert_eq!(outcome, Some(DrawOutcome::Skipped));
        assert!(scheduler.is_running());
    }

    #[test]
    fn resize_applies_policy_to_surface_and_tracker() {
        let drawable = FakeSurface::new(400.0, 300.0, 3.0);
        let mut surface = linked(&drawable);
        let mut tracker = PointerTracker::new(1.0);
        tracker.attach(surface.viewport());
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());

        let scale = scheduler.on_resize(&mut surface, &mut tracker);

        assert_eq!(scale, 1.5);
        assert_eq!(surface.viewport(), PhysicalSize::new(600, 450));
        assert_eq!(tracker.scale(), 1.5);
        tracker.on_pointer_down(PointerId::Mouse, 100.0, 100.0);
        assert_eq!(tracker.snapshot().primary, [150.0, 300.0]);
    }

    #[test]
    fn low_density_displays_render_at_native_size() {
        let drawable = FakeSurface::new(400.0, 300.0, 1.0);
        let mut surface = linked(&drawable);
        let mut tracker = PointerTracker::new(1.0);
        let mut scheduler = FrameScheduler::new(ScalePolicy::default());

        assert_eq!(scheduler.on_resize(&mut surface, &mut tracker), 1.0);
        assert_eq!(surface.viewport(), PhysicalSize::new(400, 300));
    }
}
