use glam::Vec3;

use super::{ensure, is_non_negative};
use crate::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct SigmaSettings {
    /// Direction towards the main light, in world space; zero for local
    /// lights.
    pub light_direction: Vec3,

    pub plane_distance_sensitivity: f32,
    pub blur_radius_scale: f32,

    /// Clamped to [`hush_gpu::SIGMA_MAX_HISTORY_FRAME_NUM`]; zero disables
    /// temporal stabilization.
    pub max_stabilized_frame_num: u32,
}

impl Default for SigmaSettings {
    fn default() -> Self {
        Self {
            light_direction: Vec3::ZERO,
            plane_distance_sensitivity: 0.005,
            blur_radius_scale: 2.0,
            max_stabilized_frame_num: 5,
        }
    }
}

impl SigmaSettings {
    pub fn validate(&self) -> Result<()> {
        ensure(
            self.light_direction.is_finite(),
            "light direction must be finite",
        )?;

        ensure(
            is_non_negative(self.plane_distance_sensitivity)
                && is_non_negative(self.blur_radius_scale),
            "sensitivity and blur scale must be non-negative",
        )?;

        Ok(())
    }
}
