use bytemuck::{Pod, Zeroable};
use glam::{vec4, Vec4};

use crate::{Word, GOLDEN_ANGLE};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct BlurPassConstants {
    /// Rotation of the blur kernel, as a row-major 2x2 matrix.
    pub rotator: Vec4,
}

impl BlurPassConstants {
    /// Rotates the kernel by the golden angle every frame; `phase` lets
    /// consecutive blurs within a single frame use different rotations.
    pub fn new(frame_index: u32, phase: u32) -> Self {
        let angle = ((frame_index as f32) + (phase as f32) * 0.5)
            * GOLDEN_ANGLE;

        let (sin, cos) = angle.sin_cos();

        Self {
            rotator: vec4(cos, sin, -sin, cos),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct AtrousPassConstants {
    /// x - step size (in pixels);
    /// y - iteration index;
    /// z - whether this is the last iteration;
    /// w - unused
    pub iteration: Vec4,
}

impl AtrousPassConstants {
    pub fn new(iteration: u32, is_last: bool) -> Self {
        Self {
            iteration: vec4(
                (1_u32 << iteration).to_word(),
                iteration.to_word(),
                is_last.to_word(),
                0.0,
            ),
        }
    }

    pub fn step_size(&self) -> u32 {
        u32::from_word(self.iteration.x)
    }

    pub fn iteration(&self) -> u32 {
        u32::from_word(self.iteration.y)
    }

    pub fn is_last(&self) -> bool {
        bool::from_word(self.iteration.z)
    }
}
