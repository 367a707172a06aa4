use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::{CommonConstants, Word};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ReblurConstants {
    pub common: CommonConstants,

    /// x - max accumulated frame num;
    /// y - max fast accumulated frame num;
    /// z - history fix frame num;
    /// w - stabilization strength
    pub accumulation: Vec4,

    /// Hit distance normalization parameters (A, B, C, D).
    pub hit_distance: Vec4,

    /// x - min blur radius;
    /// y - max blur radius;
    /// z - diffuse prepass blur radius;
    /// w - specular prepass blur radius
    pub blur: Vec4,

    /// x - lobe angle fraction;
    /// y - roughness fraction;
    /// z - plane distance sensitivity;
    /// w - responsive accumulation roughness threshold
    pub lobe: Vec4,

    /// x - luminance sigma scale;
    /// y - hit distance sigma scale;
    /// z - luminance antilag power;
    /// w - hit distance antilag power
    pub antilag: Vec4,

    /// x - diffuse checkerboard channel (0, 1 or 2 when disabled);
    /// y - specular checkerboard channel (ditto);
    /// z - whether temporal stabilization is active;
    /// w - whether hit distance reconstruction is active
    pub checkerboard: Vec4,
}

impl ReblurConstants {
    pub fn max_accumulated_frame_num(&self) -> u32 {
        u32::from_word(self.accumulation.x)
    }

    pub fn max_fast_accumulated_frame_num(&self) -> u32 {
        u32::from_word(self.accumulation.y)
    }

    pub fn diff_checkerboard(&self) -> u32 {
        u32::from_word(self.checkerboard.x)
    }

    pub fn spec_checkerboard(&self) -> u32 {
        u32::from_word(self.checkerboard.y)
    }
}
