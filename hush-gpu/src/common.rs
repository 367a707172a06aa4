use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::Word;

/// Constants shared by every pass of every denoiser; each family's constant
/// buffer starts with this block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct CommonConstants {
    pub view_to_clip: Mat4,
    pub world_to_view: Mat4,
    pub world_to_view_prev: Mat4,
    pub world_to_clip: Mat4,
    pub world_to_clip_prev: Mat4,
    pub world_prev_to_world: Mat4,

    /// x, y - top-left corner of the frustum at depth 1, in view space;
    /// z, w - frustum's width and height at depth 1
    pub frustum: Vec4,

    /// See: [`Self::frustum`].
    pub frustum_prev: Vec4,

    /// x, y, z - camera's movement since the previous frame;
    /// w - unused
    pub camera_delta: Vec4,

    /// x, y, z - motion vector scale;
    /// w - whether motion vectors are in world space
    pub mv_scale: Vec4,

    /// x, y - resource size;
    /// z, w - inverse of resource size
    pub resource_size: Vec4,

    /// x, y - rect size;
    /// z, w - inverse of rect size
    pub rect_size: Vec4,

    /// x, y - previous frame's rect size;
    /// z, w - rect origin
    pub rect_prev: Vec4,

    /// x, y - rect size divided by resource size;
    /// z, w - the same, for the previous frame
    pub resolution_scale: Vec4,

    /// x, y - camera jitter;
    /// z - jitter delta since the previous frame;
    /// w - debug
    pub jitter: Vec4,

    /// x - disocclusion threshold;
    /// y - alternate disocclusion threshold;
    /// z - denoising range;
    /// w - split screen
    pub thresholds: Vec4,

    /// x - frame index;
    /// y - number of frames accumulated since the last history reset;
    /// z - whether history is being reset this frame;
    /// w - feature bits (see `FEATURE_*`)
    pub frame: Vec4,
}

impl CommonConstants {
    pub const FEATURE_MV_IN_WORLD_SPACE: u32 = 1 << 0;
    pub const FEATURE_HISTORY_CONFIDENCE: u32 = 1 << 1;
    pub const FEATURE_DISOCCLUSION_THRESHOLD_MIX: u32 = 1 << 2;
    pub const FEATURE_VALIDATION: u32 = 1 << 3;

    pub fn disocclusion_threshold(&self) -> f32 {
        self.thresholds.x
    }

    pub fn disocclusion_threshold_alternate(&self) -> f32 {
        self.thresholds.y
    }

    pub fn frame_index(&self) -> u32 {
        u32::from_word(self.frame.x)
    }

    pub fn accumulated_frame_num(&self) -> u32 {
        u32::from_word(self.frame.y)
    }

    pub fn is_history_reset(&self) -> bool {
        bool::from_word(self.frame.z)
    }

    pub fn features(&self) -> u32 {
        u32::from_word(self.frame.w)
    }
}
