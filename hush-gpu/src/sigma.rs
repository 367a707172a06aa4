use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::{CommonConstants, Word};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct SigmaConstants {
    pub common: CommonConstants,

    /// x, y, z - direction towards the light, in world space;
    /// w - plane distance sensitivity
    pub light: Vec4,

    /// x - max stabilized frame num;
    /// y - blur radius scale;
    /// z - whether the translucency channel is present;
    /// w - unused
    pub stabilization: Vec4,
}

impl SigmaConstants {
    pub fn max_stabilized_frame_num(&self) -> u32 {
        u32::from_word(self.stabilization.x)
    }
}
