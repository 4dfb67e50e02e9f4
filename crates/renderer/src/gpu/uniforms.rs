use bytemuck::{Pod, Zeroable};
use winit::dpi::PhysicalSize;

use crate::pointer::PointerSnapshot;

/// Capacity of the `pointers` uniform array.
pub const MAX_POINTERS: usize = 16;

/// CPU mirror of the `HeroUniforms` std140 block declared by the shader wrapper.
///
/// `vec2` array elements occupy a full 16-byte slot under std140, hence the
/// `[f32; 4]` entries in `pointers`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub pointer_count: i32,
    pub movement: [f32; 2],
    pub touch: [f32; 2],
    pub pointers: [[f32; 4]; MAX_POINTERS],
}

impl FrameUniforms {
    /// Packs one frame's inputs.
    pub fn new(viewport: PhysicalSize<u32>, time: f32, snapshot: &PointerSnapshot) -> Self {
        let mut pointers = [[0.0; 4]; MAX_POINTERS];
        for (slot, coords) in pointers.iter_mut().zip(&snapshot.coordinates) {
            slot[0] = coords[0];
            slot[1] = coords[1];
        }
        let pointer_count = snapshot.count.min(MAX_POINTERS);
        if snapshot.count > MAX_POINTERS {
            tracing::trace!(
                active = snapshot.count,
                capacity = MAX_POINTERS,
                "pointer uniform truncated"
            );
        }

        Self {
            resolution: [viewport.width as f32, viewport.height as f32],
            time,
            pointer_count: pointer_count as i32,
            movement: snapshot.movement,
            touch: snapshot.primary,
            pointers,
        }
    }
}
