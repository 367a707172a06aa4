use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use crate::{CommonConstants, Word};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct RelaxConstants {
    pub common: CommonConstants,

    /// x - diffuse max accumulated frame num;
    /// y - specular max accumulated frame num;
    /// z - diffuse max fast accumulated frame num;
    /// w - specular max fast accumulated frame num
    pub accumulation: Vec4,

    /// x - history fix frame num;
    /// y - history clamping color box sigma scale;
    /// z - spatial variance estimation history threshold;
    /// w - number of A-trous iterations
    pub history: Vec4,

    /// x - diffuse phi luminance;
    /// y - specular phi luminance;
    /// z - diffuse min luminance weight;
    /// w - specular min luminance weight
    pub luminance: Vec4,

    /// x - lobe angle fraction;
    /// y - roughness fraction;
    /// z - depth threshold;
    /// w - history fix edge stopping normal power
    pub edge_stopping: Vec4,

    /// x - specular variance boost;
    /// y - specular lobe angle slack;
    /// z - confidence driven relaxation multiplier;
    /// w - whether roughness edge stopping is enabled
    pub specular: Vec4,

    /// x - diffuse checkerboard channel (0, 1 or 2 when disabled);
    /// y - specular checkerboard channel (ditto);
    /// z - diffuse prepass blur radius;
    /// w - specular prepass blur radius
    pub checkerboard: Vec4,
}

impl RelaxConstants {
    pub fn diff_max_accumulated_frame_num(&self) -> u32 {
        u32::from_word(self.accumulation.x)
    }

    pub fn spec_max_accumulated_frame_num(&self) -> u32 {
        u32::from_word(self.accumulation.y)
    }

    pub fn atrous_iteration_num(&self) -> u32 {
        u32::from_word(self.history.w)
    }
}
