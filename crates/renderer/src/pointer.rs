//! Multi-pointer input aggregation.
//!
//! [`PointerTracker`] turns raw mouse/touch events (logical coordinates,
//! top-left origin) into the device-pixel, bottom-left-origin values the
//! shader consumes. The frame loop reads it once per frame through
//! [`PointerTracker::snapshot`].

use winit::dpi::PhysicalSize;

/// Identifies one contact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerId {
    Mouse,
    Touch(u64),
}

/// Pointer state handed to the renderer for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerSnapshot {
    /// Number of pointers currently held down.
    pub count: usize,
    /// Device-pixel coordinates of every held pointer, in press order. Holds a
    /// single origin pair when nothing is held.
    pub coordinates: Vec<[f32; 2]>,
    /// First held pointer, else the last pointer released, else the origin.
    pub primary: [f32; 2],
    /// Sum of every movement delta seen while tracking was active.
    pub movement: [f32; 2],
}

impl Default for PointerSnapshot {
    fn default() -> Self {
        Self {
            count: 0,
            coordinates: vec![[0.0, 0.0]],
            primary: [0.0, 0.0],
            movement: [0.0, 0.0],
        }
    }
}

#[derive(Debug)]
pub struct PointerTracker {
    // Press order is kept so "primary" is stable.
    pointers: Vec<(PointerId, [f32; 2])>,
    active: bool,
    last_known: Option<[f32; 2]>,
    movement: [f32; 2],
    scale: f32,
    surface_height: f32,
    attached: bool,
}

impl PointerTracker {
    pub fn new(scale: f32) -> Self {
        Self {
            pointers: Vec::new(),
            active: false,
            last_known: None,
            movement: [0.0, 0.0],
            scale: sanitize_scale(scale),
            surface_height: 0.0,
            attached: false,
        }
    }

    /// Starts accepting events for a surface whose backing buffer is `viewport`.
    pub fn attach(&mut self, viewport: PhysicalSize<u32>) {
        self.surface_height = viewport.height as f32;
        self.attached = true;
    }

    /// Stops accepting events and forgets held pointers. Movement and the last
    /// known position survive so a re-attached tracker resumes seamlessly.
    pub fn detach(&mut self) {
        self.attached = false;
        self.active = false;
        self.pointers.clear();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn on_pointer_down(&mut self, id: PointerId, x: f64, y: f64) {
        if !self.attached {
            return;
        }
        self.active = true;
        let mapped = self.map(x, y);
        match self.pointers.iter_mut().find(|(held, _)| *held == id) {
            Some((_, coords)) => *coords = mapped,
            None => self.pointers.push((id, mapped)),
        }
    }

    pub fn on_pointer_up(&mut self, id: PointerId) {
        self.release(id);
    }

    pub fn on_pointer_leave(&mut self, id: PointerId) {
        self.release(id);
    }

    /// Moves a held pointer and accumulates `(dx, dy)` into the movement
    /// vector. Ignored entirely while no pointer is held.
    pub fn on_pointer_move(&mut self, id: PointerId, x: f64, y: f64, dx: f64, dy: f64) {
        if !self.active {
            return;
        }
        let mapped = self.map(x, y);
        if let Some((_, coords)) = self.pointers.iter_mut().find(|(held, _)| *held == id) {
            *coords = mapped;
        }
        self.movement[0] += dx as f32;
        self.movement[1] += dy as f32;
    }

    pub fn snapshot(&self) -> PointerSnapshot {
        let coordinates = if self.pointers.is_empty() {
            vec![[0.0, 0.0]]
        } else {
            self.pointers.iter().map(|(_, coords)| *coords).collect()
        };
        let primary = self
            .pointers
            .first()
            .map(|(_, coords)| *coords)
            .or(self.last_known)
            .unwrap_or([0.0, 0.0]);

        PointerSnapshot {
            count: self.pointers.len(),
            coordinates,
            primary,
            movement: self.movement,
        }
    }

    /// Applies to coordinates reported after this call only.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = sanitize_scale(scale);
    }

    pub fn set_surface_height(&mut self, height: f32) {
        self.surface_height = height;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    fn release(&mut self, id: PointerId) {
        let Some(index) = self.pointers.iter().position(|(held, _)| *held == id) else {
            return;
        };
        if self.pointers.len() == 1 {
            self.last_known = Some(self.pointers[index].1);
        }
        self.pointers.remove(index);
        if self.pointers.is_empty() {
            self.active = false;
        }
    }

    fn map(&self, x: f64, y: f64) -> [f32; 2] {
        let scale = f64::from(self.scale);
        [
            (x * scale) as f32,
            self.surface_height - (y * scale) as f32,
        ]
    }
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

    fn tracker(height: u32) -> PointerTracker {
        let mut tracker = PointerTracker::new(1.0);
        tracker.attach(PhysicalSize::new(800, height));
        tracker
    }

    #[test]
    fn pointer_down_flips_y() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Mouse, 100.0, 200.0);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.coordinates, vec![[100.0, 400.0]]);
        assert_eq!(snapshot.primary, [100.0, 400.0]);
    }

    #[test]
    fn empty_snapshot_carries_origin_pair() {
        let snapshot = tracker(600).snapshot();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.coordinates, vec![[0.0, 0.0]]);
        assert_eq!(snapshot.primary, [0.0, 0.0]);
    }

    #[test]
    fn releasing_one_of_two_pointers_promotes_the_remaining_one() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Touch(1), 10.0, 10.0);
        tracker.on_pointer_down(PointerId::Touch(2), 50.0, 100.0);
        assert_eq!(tracker.snapshot().count, 2);

        tracker.on_pointer_up(PointerId::Touch(1));
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.primary, [50.0, 500.0]);
    }

    #[test]
    fn last_known_position_survives_release() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Mouse, 10.0, 20.0);
        tracker.on_pointer_move(PointerId::Mouse, 30.0, 40.0, 20.0, 20.0);
        tracker.on_pointer_up(PointerId::Mouse);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.primary, [30.0, 560.0]);
        assert!(!tracker.is_active());

        tracker.on_pointer_down(PointerId::Touch(4), 1.0, 1.0);
        assert_eq!(tracker.snapshot().primary, [1.0, 599.0]);
    }

    #[test]
    fn leave_behaves_like_up() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Mouse, 5.0, 5.0);
        tracker.on_pointer_leave(PointerId::Mouse);
        assert_eq!(tracker.snapshot().count, 0);
        assert_eq!(tracker.snapshot().primary, [5.0, 595.0]);
    }

    #[test]
    fn moves_without_a_held_pointer_are_ignored() {
        let mut tracker = tracker(600);
        tracker.on_pointer_move(PointerId::Mouse, 10.0, 10.0, 5.0, 5.0);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.movement, [0.0, 0.0]);
        assert_eq!(snapshot.count, 0);
    }

    #[test]
    fn movement_accumulates_across_press_cycles() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Mouse, 0.0, 0.0);
        tracker.on_pointer_move(PointerId::Mouse, 1.0, 1.0, 1.0, 2.0);
        tracker.on_pointer_up(PointerId::Mouse);
        tracker.on_pointer_down(PointerId::Touch(9), 0.0, 0.0);
        tracker.on_pointer_move(PointerId::Touch(9), 3.0, 3.0, 3.0, -1.0);

        assert_eq!(tracker.snapshot().movement, [4.0, 1.0]);
    }

    #[test]
    fn count_tracks_held_pointers_through_mixed_sequences() {
        let mut tracker = tracker(600);
        let events: [(&str, u64); 9] = [
            ("down", 1),
            ("down", 2),
            ("down", 2),
            ("move", 3),
            ("up", 3),
            ("down", 3),
            ("up", 1),
            ("up", 1),
            ("up", 2),
        ];
        let mut held = std::collections::HashSet::new();
        for (kind, id) in events {
            let pointer = PointerId::Touch(id);
            match kind {
                "down" => {
                    tracker.on_pointer_down(pointer, id as f64, id as f64);
                    held.insert(id);
                }
                "up" => {
                    tracker.on_pointer_up(pointer);
                    held.remove(&id);
                }
                _ => tracker.on_pointer_move(pointer, 7.0, 7.0, 1.0, 1.0),
            }
            assert_eq!(tracker.snapshot().count, held.len());
        }
        assert_eq!(tracker.snapshot().count, 0);
    }

    #[test]
    fn scale_applies_to_later_events_only() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Touch(1), 10.0, 10.0);
        tracker.set_scale(2.0);
        tracker.on_pointer_down(PointerId::Touch(2), 10.0, 10.0);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.coordinates, vec![[10.0, 590.0], [20.0, 580.0]]);
    }

    #[test]
    fn detached_tracker_ignores_input() {
        let mut tracker = tracker(600);
        tracker.on_pointer_down(PointerId::Mouse, 1.0, 1.0);
        tracker.detach();
        assert_eq!(tracker.snapshot().count, 0);

        tracker.on_pointer_down(PointerId::Mouse, 1.0, 1.0);
        assert_eq!(tracker.snapshot().count, 0);
        assert!(!tracker.is_attached());
    }
}
