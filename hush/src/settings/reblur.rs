use super::{ensure, is_fraction, is_non_negative};
use crate::{CheckerboardMode, HitDistanceReconstructionMode, Result};

/// Normalization of hit distances: `(A + viewZ * B) * lerp(1, C, exp2(D *
/// roughness^2))`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitDistanceParameters {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Default for HitDistanceParameters {
    fn default() -> Self {
        Self {
            a: 3.0,
            b: 0.1,
            c: 20.0,
            d: -25.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AntilagSettings {
    pub luminance_sigma_scale: f32,
    pub hit_distance_sigma_scale: f32,
    pub luminance_antilag_power: f32,
    pub hit_distance_antilag_power: f32,
}

impl Default for AntilagSettings {
    fn default() -> Self {
        Self {
            luminance_sigma_scale: 4.0,
            hit_distance_sigma_scale: 3.0,
            luminance_antilag_power: 1.0,
            hit_distance_antilag_power: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReblurSettings {
    pub hit_distance_parameters: HitDistanceParameters,
    pub antilag_settings: AntilagSettings,

    /// Clamped to [`hush_gpu::REBLUR_MAX_HISTORY_FRAME_NUM`].
    pub max_accumulated_frame_num: u32,

    /// Clamped to [`Self::max_accumulated_frame_num`].
    pub max_fast_accumulated_frame_num: u32,

    pub history_fix_frame_num: u32,

    /// In pixels; zero for both signals disables the pre-pass.
    pub diffuse_prepass_blur_radius: f32,
    pub specular_prepass_blur_radius: f32,

    pub min_blur_radius: f32,
    pub max_blur_radius: f32,
    pub lobe_angle_fraction: f32,
    pub roughness_fraction: f32,
    pub plane_distance_sensitivity: f32,
    pub responsive_accumulation_roughness_threshold: f32,

    /// Zero disables temporal stabilization.
    pub stabilization_strength: f32,

    pub checkerboard_mode: CheckerboardMode,
    pub hit_distance_reconstruction_mode: HitDistanceReconstructionMode,
}

impl Default for ReblurSettings {
    fn default() -> Self {
        Self {
            hit_distance_parameters: Default::default(),
            antilag_settings: Default::default(),
            max_accumulated_frame_num: 30,
            max_fast_accumulated_frame_num: 6,
            history_fix_frame_num: 3,
            diffuse_prepass_blur_radius: 30.0,
            specular_prepass_blur_radius: 50.0,
            min_blur_radius: 1.0,
            max_blur_radius: 30.0,
            lobe_angle_fraction: 0.15,
            roughness_fraction: 0.15,
            plane_distance_sensitivity: 0.005,
            responsive_accumulation_roughness_threshold: 0.0,
            stabilization_strength: 1.0,
            checkerboard_mode: Default::default(),
            hit_distance_reconstruction_mode: Default::default(),
        }
    }
}

impl ReblurSettings {
    pub fn validate(&self) -> Result<()> {
        let HitDistanceParameters { a, b, c, d } = self.hit_distance_parameters;

        ensure(
            [a, b, c, d].iter().all(|value| value.is_finite()),
            "hit distance parameters must be finite",
        )?;

        ensure(
            is_non_negative(self.diffuse_prepass_blur_radius)
                && is_non_negative(self.specular_prepass_blur_radius)
                && is_non_negative(self.min_blur_radius)
                && is_non_negative(self.max_blur_radius),
            "blur radii must be non-negative",
        )?;

        ensure(
            self.min_blur_radius <= self.max_blur_radius,
            "min blur radius must not exceed max blur radius",
        )?;

        ensure(
            is_fraction(self.lobe_angle_fraction)
                && is_fraction(self.roughness_fraction)
                && is_fraction(self.responsive_accumulation_roughness_threshold)
                && is_fraction(self.stabilization_strength),
            "fractions must be within [0; 1]",
        )?;

        ensure(
            is_non_negative(self.plane_distance_sensitivity),
            "plane distance sensitivity must be non-negative",
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate() {
        assert!(ReblurSettings::default().validate().is_ok());

        let target = ReblurSettings {
            max_accumulated_frame_num: 1000,
            ..Default::default()
        };

        assert!(target.validate().is_ok());

        let target = ReblurSettings {
            min_blur_radius: 40.0,
            ..Default::default()
        };

        assert!(target.validate().is_err());

        let target = ReblurSettings {
            stabilization_strength: 1.5,
            ..Default::default()
        };

        assert!(target.validate().is_err());
    }
}
