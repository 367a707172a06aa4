use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::{CommonConstants, Word};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ReferenceConstants {
    pub common: CommonConstants,

    /// x - max accumulated frame num;
    /// y - blending weight of the current frame;
    /// z, w - unused
    pub accumulation: Vec4,
}

impl ReferenceConstants {
    pub fn max_accumulated_frame_num(&self) -> u32 {
        u32::from_word(self.accumulation.x)
    }

    pub fn weight(&self) -> f32 {
        self.accumulation.y
    }
}
