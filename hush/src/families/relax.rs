use glam::vec4;
use hush_gpu::{
    CommonConstants, RelaxConstants, Word, MAX_ATROUS_PASSES,
    RELAX_MAX_HISTORY_FRAME_NUM,
};

use crate::{
    Axis, CheckerboardMode, Declarations, Define, Denoiser, DenoiserBuilder,
    DenoiserLayout, Family, Format, HitDistanceReconstructionMode,
    PassConstants, PassDesc, PoolSlot, RelaxSettings, ResourceRef,
    ResourceType, Result, Signals, Stage, StageFlags, TextureDesc,
};

type Pass = PassDesc<Textures>;

struct Textures {
    signals: Vec<SignalTextures>,
    tiles: PoolSlot,
    history_length: PoolSlot,
    history_length_prev: PoolSlot,
    normal_roughness_prev: PoolSlot,
    viewz_prev: PoolSlot,
}

struct SignalTextures {
    input: ResourceType,
    output: ResourceType,
    confidence: ResourceType,
    illum_prev: PoolSlot,
    illum_responsive_prev: PoolSlot,
    ping: PoolSlot,
    pong: PoolSlot,
    tmp: PoolSlot,
}

impl Textures {
    fn new(builder: &mut DenoiserBuilder, signals: Signals) -> Result<Self> {
        let rgba = TextureDesc::new(Format::Rgba16Sfloat);
        let history_length = TextureDesc::new(Format::R8Unorm);

        let mut textures = Self {
            signals: Default::default(),
            tiles: builder.add_to_transient_pool(TextureDesc::downsampled(
                Format::R8Unorm,
                16,
            ))?,
            history_length: builder.add_to_permanent_pool(history_length)?,
            history_length_prev: builder
                .add_to_permanent_pool(history_length)?,
            normal_roughness_prev: builder
                .add_to_permanent_pool(TextureDesc::new(Format::Rgba8Unorm))?,
            viewz_prev: builder
                .add_to_permanent_pool(TextureDesc::new(Format::R32Sfloat))?,
        };

        if signals.diffuse {
            textures.signals.push(SignalTextures {
                input: ResourceType::InDiffRadianceHitDist,
                output: ResourceType::OutDiffRadianceHitDist,
                confidence: ResourceType::InDiffConfidence,
                illum_prev: builder.add_to_permanent_pool(rgba)?,
                illum_responsive_prev: builder.add_to_permanent_pool(rgba)?,
                ping: builder.add_to_transient_pool(rgba)?,
                pong: builder.add_to_transient_pool(rgba)?,
                tmp: builder.add_to_transient_pool(rgba)?,
            });
        }

        if signals.specular {
            textures.signals.push(SignalTextures {
                input: ResourceType::InSpecRadianceHitDist,
                output: ResourceType::OutSpecRadianceHitDist,
                confidence: ResourceType::InSpecConfidence,
                illum_prev: builder.add_to_permanent_pool(rgba)?,
                illum_responsive_prev: builder.add_to_permanent_pool(rgba)?,
                ping: builder.add_to_transient_pool(rgba)?,
                pong: builder.add_to_transient_pool(rgba)?,
                tmp: builder.add_to_transient_pool(rgba)?,
            });
        }

        Ok(textures)
    }

    /// History length of the current frame.
    fn history_length(&self) -> ResourceRef {
        ResourceRef::Swap(self.history_length, self.history_length_prev)
    }

    /// History length of the previous frame.
    fn history_length_prev(&self) -> ResourceRef {
        ResourceRef::Swap(self.history_length_prev, self.history_length)
    }
}

pub fn declare(
    decl: &mut Declarations,
    denoiser: Denoiser,
) -> Result<DenoiserLayout> {
    let signals = denoiser.signals();

    let defines = vec![
        Define::flag("RELAX_DIFFUSE", signals.diffuse),
        Define::flag("RELAX_SPECULAR", signals.specular),
    ];

    let mut builder = DenoiserBuilder::new(
        decl,
        denoiser.name(),
        defines,
        Family::Relax.shared_constants_size(),
    );

    let textures = Textures::new(&mut builder, signals)?;

    builder.declare(&textures, &passes())?;
    builder.finish()
}

fn passes() -> Vec<Pass> {
    use ResourceType::*;

    vec![
        Pass::new(Stage::ClassifyTiles, "RELAX_ClassifyTiles", |t, _, b| {
            b.input(InViewZ).output(t.tiles);
        })
        .with_downsample_factor(16),
        Pass::new(
            Stage::HitDistReconstruction,
            "RELAX_HitDistReconstruction",
            |t, p, b| {
                b.input(t.tiles).input(InNormalRoughness).input(InViewZ);

                for s in &t.signals {
                    b.input(s.input);
                }

                for s in &t.signals {
                    b.output(if p.has(Axis::PrePass) { s.tmp } else { s.ping });
                }
            },
        )
        .with_axes(&[Axis::PrePass, Axis::HitDist5x5]),
        Pass::new(Stage::PrePass, "RELAX_PrePass", |t, p, b| {
            b.input(t.tiles).input(InNormalRoughness).input(InViewZ);

            for s in &t.signals {
                if p.has(Axis::AfterHitDistReconstruction) {
                    b.input(s.tmp);
                } else {
                    b.input(s.input);
                }
            }

            for s in &t.signals {
                b.output(s.ping);
            }
        })
        .with_axes(&[Axis::AfterHitDistReconstruction])
        .with_constants(PassConstants::Blur { phase: 0 }),
        Pass::new(
            Stage::TemporalAccumulation,
            "RELAX_TemporalAccumulation",
            |t, p, b| {
                b.input(t.tiles)
                    .input(InNormalRoughness)
                    .input(InViewZ)
                    .input(InMv)
                    .input(t.normal_roughness_prev)
                    .input(t.viewz_prev)
                    .input(t.history_length_prev());

                if p.has(Axis::DisocclusionMix) {
                    b.input(InDisocclusionThresholdMix);
                }

                for s in &t.signals {
                    if p.has(Axis::Confidence) {
                        b.input(s.confidence);
                    }

                    if p.has(Axis::AfterPrePass) {
                        b.input(s.ping);
                    } else {
                        b.input(s.input);
                    }

                    b.input(s.illum_prev).input(s.illum_responsive_prev);
                }

                for s in &t.signals {
                    b.output(s.tmp).output(s.pong);
                }

                b.output(t.history_length());
            },
        )
        .with_axes(&[
            Axis::AfterPrePass,
            Axis::Confidence,
            Axis::DisocclusionMix,
        ]),
        Pass::new(Stage::HistoryFix, "RELAX_HistoryFix", |t, _, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(InViewZ)
                .input(t.history_length());

            for s in &t.signals {
                b.input(s.tmp);
            }

            for s in &t.signals {
                b.output(s.ping);
            }
        }),
        Pass::new(Stage::HistoryClamping, "RELAX_HistoryClamping", |t, _, b| {
            b.input(t.tiles).input(t.history_length());

            for s in &t.signals {
                b.input(s.ping).input(s.pong);
            }

            for s in &t.signals {
                b.output(s.tmp).output(s.illum_responsive_prev);
            }
        }),
        Pass::new(Stage::Copy, "RELAX_Copy", |t, _, b| {
            b.input(InNormalRoughness).input(InViewZ);

            for s in &t.signals {
                b.input(s.tmp);
            }

            b.output(t.normal_roughness_prev).output(t.viewz_prev);

            for s in &t.signals {
                b.output(s.illum_prev);
            }
        }),
        Pass::new(Stage::AntiFirefly, "RELAX_AntiFirefly", |t, _, b| {
            b.input(t.tiles).input(InNormalRoughness).input(InViewZ);

            for s in &t.signals {
                b.input(s.tmp);
            }

            for s in &t.signals {
                b.output(s.ping);
            }
        }),
        Pass::new(Stage::AtrousFirst, "RELAX_AtrousSmem", |t, p, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(InViewZ)
                .input(t.history_length());

            for s in &t.signals {
                if p.has(Axis::AfterAntiFirefly) {
                    b.input(s.ping);
                } else {
                    b.input(s.tmp);
                }
            }

            for s in &t.signals {
                b.output(s.pong);
            }
        })
        .with_axes(&[Axis::AfterAntiFirefly])
        .with_constants(PassConstants::Atrous),
        Pass::new(Stage::Atrous, "RELAX_Atrous", |t, p, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(InViewZ)
                .input(t.history_length());

            let from_pong = p.has(Axis::FromPong);

            for s in &t.signals {
                b.input(if from_pong { s.pong } else { s.ping });
            }

            for s in &t.signals {
                b.output(if from_pong { s.ping } else { s.pong });
            }
        })
        .with_axes(&[Axis::FromPong])
        .with_repeat_num((MAX_ATROUS_PASSES - 2) as u16)
        .with_constants(PassConstants::Atrous),
        Pass::new(Stage::AtrousLast, "RELAX_Atrous", |t, p, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(InViewZ)
                .input(t.history_length());

            for s in &t.signals {
                if p.has(Axis::FromPong) {
                    b.input(s.pong);
                } else {
                    b.input(s.ping);
                }
            }

            for s in &t.signals {
                b.output(s.output);
            }
        })
        .with_axes(&[Axis::FromPong])
        .with_constants(PassConstants::Atrous),
        Pass::new(Stage::SplitScreen, "RELAX_SplitScreen", |t, _, b| {
            b.input(InViewZ);

            for s in &t.signals {
                b.input(s.input);
            }

            for s in &t.signals {
                b.output(s.output);
            }
        }),
        Pass::new(Stage::Validation, "RELAX_Validation", |t, _, b| {
            b.input(InNormalRoughness)
                .input(InViewZ)
                .input(InMv)
                .input(t.history_length());

            for s in &t.signals {
                b.input(s.input);
            }

            b.output(OutValidation);
        }),
    ]
}

pub fn stage_flags(
    settings: &RelaxSettings,
    signals: Signals,
    mut flags: StageFlags,
) -> StageFlags {
    let mode = settings.hit_distance_reconstruction_mode;

    flags.hit_distance_reconstruction = mode
        != HitDistanceReconstructionMode::Off
        && settings.checkerboard_mode == CheckerboardMode::Off;

    flags.hit_distance_5x5 = mode == HitDistanceReconstructionMode::Area5x5;

    flags.pre_pass = (signals.diffuse
        && settings.diffuse_prepass_blur_radius > 0.0)
        || (signals.specular && settings.specular_prepass_blur_radius > 0.0);

    flags.anti_firefly = settings.enable_anti_firefly;
    flags.atrous_iteration_num = settings.atrous_iteration_num;

    flags
}

pub fn constants(
    settings: &RelaxSettings,
    flags: &StageFlags,
    common: CommonConstants,
) -> RelaxConstants {
    let clamp = |max_accumulated_frame_num: u32, max_fast: u32| {
        if common.is_history_reset() {
            (0, 0)
        } else {
            let max_accumulated_frame_num =
                max_accumulated_frame_num.min(RELAX_MAX_HISTORY_FRAME_NUM);

            (
                max_accumulated_frame_num,
                max_fast.min(max_accumulated_frame_num),
            )
        }
    };

    let (diff_max, diff_max_fast) = clamp(
        settings.diffuse_max_accumulated_frame_num,
        settings.diffuse_max_fast_accumulated_frame_num,
    );

    let (spec_max, spec_max_fast) = clamp(
        settings.specular_max_accumulated_frame_num,
        settings.specular_max_fast_accumulated_frame_num,
    );

    let (diff_checkerboard, spec_checkerboard) =
        settings.checkerboard_mode.channels();

    RelaxConstants {
        common,
        accumulation: vec4(
            diff_max.to_word(),
            spec_max.to_word(),
            diff_max_fast.to_word(),
            spec_max_fast.to_word(),
        ),
        history: vec4(
            settings.history_fix_frame_num.to_word(),
            settings.history_clamping_color_box_sigma_scale,
            settings
                .spatial_variance_estimation_history_threshold
                .to_word(),
            flags.atrous_iteration_num().to_word(),
        ),
        luminance: vec4(
            settings.diffuse_phi_luminance,
            settings.specular_phi_luminance,
            settings.diffuse_min_luminance_weight,
            settings.specular_min_luminance_weight,
        ),
        edge_stopping: vec4(
            settings.lobe_angle_fraction,
            settings.roughness_fraction,
            settings.depth_threshold,
            settings.history_fix_edge_stopping_normal_power,
        ),
        specular: vec4(
            settings.specular_variance_boost,
            settings.specular_lobe_angle_slack,
            settings.confidence_driven_relaxation_multiplier,
            settings.enable_roughness_edge_stopping.to_word(),
        ),
        checkerboard: vec4(
            diff_checkerboard.to_word(),
            spec_checkerboard.to_word(),
            settings.diffuse_prepass_blur_radius,
            settings.specular_prepass_blur_radius,
        ),
    }
}
