use glam::{Mat4, UVec2, Vec2, Vec3};

use super::{ensure, is_non_negative};
use crate::Result;

/// What happens to the history this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccumulationMode {
    /// Keep accumulating.
    #[default]
    Continue,

    /// Drop the history, e.g. after a camera cut.
    Restart,

    /// Drop the history and clear all permanent textures.
    ClearAndRestart,
}

/// Per-frame settings shared by all denoisers.
#[derive(Clone, Debug, PartialEq)]
pub struct CommonSettings {
    pub view_to_clip: Mat4,
    pub view_to_clip_prev: Mat4,
    pub world_to_view: Mat4,
    pub world_to_view_prev: Mat4,

    /// Transforms positions from the previous frame's world space into the
    /// current one's; identity unless the world itself moves (e.g. with
    /// camera-relative rendering).
    pub world_prev_to_world: Mat4,

    /// Converts motion vectors from the host's encoding into
    /// `uv_prev - uv` (or a world-space delta, see
    /// [`Self::is_motion_vector_in_world_space`]).
    pub motion_vector_scale: Vec3,

    /// Sub-pixel camera jitter, in pixels.
    pub camera_jitter: Vec2,
    pub camera_jitter_prev: Vec2,

    pub resource_size: UVec2,
    pub resource_size_prev: UVec2,
    pub rect_size: UVec2,
    pub rect_size_prev: UVec2,
    pub rect_origin: UVec2,

    /// Pixels whose view-space depth exceeds this value are not denoised.
    pub denoising_range: f32,

    pub disocclusion_threshold: f32,

    /// Used instead of [`Self::disocclusion_threshold`] where
    /// [`crate::ResourceType::InDisocclusionThresholdMix`] says so.
    pub disocclusion_threshold_alternate: f32,

    /// Fraction of the screen, starting from the left edge, that shows the
    /// noisy input instead of the denoised output; at `1.0` and above the
    /// denoisers just pass their inputs through.
    pub split_screen: f32,

    pub debug: f32,
    pub frame_index: u32,
    pub accumulation_mode: AccumulationMode,
    pub is_motion_vector_in_world_space: bool,
    pub is_history_confidence_available: bool,
    pub is_disocclusion_threshold_mix_available: bool,
    pub enable_validation: bool,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            view_to_clip: Mat4::IDENTITY,
            view_to_clip_prev: Mat4::IDENTITY,
            world_to_view: Mat4::IDENTITY,
            world_to_view_prev: Mat4::IDENTITY,
            world_prev_to_world: Mat4::IDENTITY,
            motion_vector_scale: Vec3::new(1.0, 1.0, 0.0),
            camera_jitter: Vec2::ZERO,
            camera_jitter_prev: Vec2::ZERO,
            resource_size: UVec2::ZERO,
            resource_size_prev: UVec2::ZERO,
            rect_size: UVec2::ZERO,
            rect_size_prev: UVec2::ZERO,
            rect_origin: UVec2::ZERO,
            denoising_range: 500000.0,
            disocclusion_threshold: 0.01,
            disocclusion_threshold_alternate: 0.05,
            split_screen: 0.0,
            debug: 0.0,
            frame_index: 0,
            accumulation_mode: AccumulationMode::Continue,
            is_motion_vector_in_world_space: false,
            is_history_confidence_available: false,
            is_disocclusion_threshold_mix_available: false,
            enable_validation: false,
        }
    }
}

impl CommonSettings {
    /// Largest supported width or height of a resource.
    pub const MAX_RESOURCE_SIZE: u32 = u16::MAX as u32;

    pub fn validate(&self) -> Result<()> {
        ensure(
            self.resource_size.max_element() <= Self::MAX_RESOURCE_SIZE
                && self.resource_size_prev.max_element()
                    <= Self::MAX_RESOURCE_SIZE,
            "resource size must fit in 16 bits",
        )?;

        ensure(
            self.rect_size.cmple(self.resource_size).all()
                && self
                    .rect_origin
                    .cmple(self.resource_size - self.rect_size)
                    .all(),
            "rect must fit within resource",
        )?;

        ensure(
            self.rect_size_prev.cmple(self.resource_size_prev).all(),
            "previous rect must fit within previous resource",
        )?;

        ensure(
            self.denoising_range.is_finite() && self.denoising_range > 0.0,
            "denoising range must be positive",
        )?;

        ensure(
            is_non_negative(self.disocclusion_threshold)
                && self.disocclusion_threshold > 0.0
                && is_non_negative(self.disocclusion_threshold_alternate)
                && self.disocclusion_threshold_alternate > 0.0,
            "disocclusion thresholds must be positive",
        )?;

        ensure(
            is_non_negative(self.split_screen),
            "split screen must be non-negative",
        )?;

        ensure(
            [
                self.view_to_clip,
                self.view_to_clip_prev,
                self.world_to_view,
                self.world_to_view_prev,
                self.world_prev_to_world,
            ]
            .iter()
            .all(|mat| mat.is_finite())
                && self.motion_vector_scale.is_finite()
                && self.camera_jitter.is_finite()
                && self.camera_jitter_prev.is_finite(),
            "matrices and vectors must be finite",
        )?;

        ensure(
            self.view_to_clip.determinant() != 0.0
                && self.view_to_clip_prev.determinant() != 0.0,
            "projection matrices must be invertible",
        )?;

        Ok(())
    }
}
