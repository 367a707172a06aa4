use super::{ensure, is_fraction, is_non_negative};
use crate::{CheckerboardMode, HitDistanceReconstructionMode, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct RelaxSettings {
    /// In pixels; zero for both signals disables the pre-pass.
    pub diffuse_prepass_blur_radius: f32,
    pub specular_prepass_blur_radius: f32,

    /// Clamped to [`hush_gpu::RELAX_MAX_HISTORY_FRAME_NUM`].
    pub diffuse_max_accumulated_frame_num: u32,
    pub specular_max_accumulated_frame_num: u32,
    pub diffuse_max_fast_accumulated_frame_num: u32,
    pub specular_max_fast_accumulated_frame_num: u32,

    pub history_fix_frame_num: u32,
    pub history_fix_edge_stopping_normal_power: f32,
    pub history_clamping_color_box_sigma_scale: f32,
    pub spatial_variance_estimation_history_threshold: u32,

    /// Clamped to `[2; MAX_ATROUS_PASSES]`.
    pub atrous_iteration_num: u32,

    pub diffuse_phi_luminance: f32,
    pub specular_phi_luminance: f32,
    pub diffuse_min_luminance_weight: f32,
    pub specular_min_luminance_weight: f32,
    pub lobe_angle_fraction: f32,
    pub roughness_fraction: f32,
    pub depth_threshold: f32,
    pub specular_variance_boost: f32,
    pub specular_lobe_angle_slack: f32,
    pub confidence_driven_relaxation_multiplier: f32,
    pub checkerboard_mode: CheckerboardMode,
    pub hit_distance_reconstruction_mode: HitDistanceReconstructionMode,
    pub enable_anti_firefly: bool,
    pub enable_roughness_edge_stopping: bool,
}

impl Default for RelaxSettings {
    fn default() -> Self {
        Self {
            diffuse_prepass_blur_radius: 0.0,
            specular_prepass_blur_radius: 50.0,
            diffuse_max_accumulated_frame_num: 30,
            specular_max_accumulated_frame_num: 30,
            diffuse_max_fast_accumulated_frame_num: 6,
            specular_max_fast_accumulated_frame_num: 6,
            history_fix_frame_num: 3,
            history_fix_edge_stopping_normal_power: 8.0,
            history_clamping_color_box_sigma_scale: 2.0,
            spatial_variance_estimation_history_threshold: 3,
            atrous_iteration_num: 5,
            diffuse_phi_luminance: 2.0,
            specular_phi_luminance: 1.0,
            diffuse_min_luminance_weight: 0.0,
            specular_min_luminance_weight: 0.0,
            lobe_angle_fraction: 0.5,
            roughness_fraction: 0.15,
            depth_threshold: 0.003,
            specular_variance_boost: 0.0,
            specular_lobe_angle_slack: 0.15,
            confidence_driven_relaxation_multiplier: 0.0,
            checkerboard_mode: Default::default(),
            hit_distance_reconstruction_mode: Default::default(),
            enable_anti_firefly: false,
            enable_roughness_edge_stopping: true,
        }
    }
}

impl RelaxSettings {
    pub fn validate(&self) -> Result<()> {
        ensure(
            is_non_negative(self.diffuse_prepass_blur_radius)
                && is_non_negative(self.specular_prepass_blur_radius),
            "blur radii must be non-negative",
        )?;

        ensure(
            is_fraction(self.lobe_angle_fraction)
                && is_fraction(self.roughness_fraction)
                && is_fraction(self.diffuse_min_luminance_weight)
                && is_fraction(self.specular_min_luminance_weight),
            "fractions must be within [0; 1]",
        )?;

        ensure(
            [
                self.history_fix_edge_stopping_normal_power,
                self.history_clamping_color_box_sigma_scale,
                self.diffuse_phi_luminance,
                self.specular_phi_luminance,
                self.depth_threshold,
                self.specular_variance_boost,
                self.specular_lobe_angle_slack,
                self.confidence_driven_relaxation_multiplier,
            ]
            .into_iter()
            .all(is_non_negative),
            "weights must be non-negative",
        )?;

        Ok(())
    }
}
