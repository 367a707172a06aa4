use glam::vec4;
use hush_gpu::{
    CommonConstants, ReblurConstants, Word, REBLUR_MAX_HISTORY_FRAME_NUM,
};

use crate::{
    Axis, CheckerboardMode, Declarations, Define, Denoiser, DenoiserBuilder,
    DenoiserLayout, Family, Format, HitDistanceReconstructionMode,
    PassConstants, PassDesc, PoolSlot, ReblurSettings, ResourceRef,
    ResourceType, Result, Signals, Stage, StageFlags, TextureDesc,
};

type Pass = PassDesc<Textures>;

struct Textures {
    signals: Vec<SignalTextures>,
    tiles: PoolSlot,
    data1: PoolSlot,
    data2: PoolSlot,
    prev_viewz: PoolSlot,
    prev_normal_roughness: PoolSlot,
    prev_internal_data: PoolSlot,
}

struct SignalTextures {
    input: ResourceType,
    output: ResourceType,
    confidence: ResourceType,
    history: PoolSlot,
    fast_history: PoolSlot,
    stabilized: Option<(PoolSlot, PoolSlot)>,
    tmp1: PoolSlot,
    tmp2: PoolSlot,
    fast_history_tmp: PoolSlot,
}

impl Textures {
    fn new(builder: &mut DenoiserBuilder, signals: Signals) -> Result<Self> {
        let format = if signals.occlusion {
            Format::R16Sfloat
        } else {
            Format::Rgba16Sfloat
        };

        let signal = TextureDesc::new(format);
        let fast = TextureDesc::new(Format::R16Sfloat);

        let prev_viewz =
            builder.add_to_permanent_pool(TextureDesc::new(Format::R32Sfloat))?;

        let prev_normal_roughness = builder
            .add_to_permanent_pool(TextureDesc::new(Format::Rgba8Unorm))?;

        let prev_internal_data =
            builder.add_to_permanent_pool(TextureDesc::new(Format::R16Uint))?;

        let tiles = builder.add_to_transient_pool(TextureDesc::downsampled(
            Format::R8Unorm,
            16,
        ))?;

        let data1 = builder
            .add_to_transient_pool(TextureDesc::new(Format::Rg16Sfloat))?;

        let data2 =
            builder.add_to_transient_pool(TextureDesc::new(Format::R32Uint))?;

        let mut textures = Vec::new();

        let kinds = [(signals.diffuse, true), (signals.specular, false)];

        for (enabled, diffuse) in kinds {
            if !enabled {
                continue;
            }

            let (input, output, confidence) =
                match (diffuse, signals.occlusion) {
                    (true, false) => (
                        ResourceType::InDiffRadianceHitDist,
                        ResourceType::OutDiffRadianceHitDist,
                        ResourceType::InDiffConfidence,
                    ),
                    (true, true) => (
                        ResourceType::InDiffHitDist,
                        ResourceType::OutDiffHitDist,
                        ResourceType::InDiffConfidence,
                    ),
                    (false, false) => (
                        ResourceType::InSpecRadianceHitDist,
                        ResourceType::OutSpecRadianceHitDist,
                        ResourceType::InSpecConfidence,
                    ),
                    (false, true) => (
                        ResourceType::InSpecHitDist,
                        ResourceType::OutSpecHitDist,
                        ResourceType::InSpecConfidence,
                    ),
                };

            let history = builder.add_to_permanent_pool(signal)?;
            let fast_history = builder.add_to_permanent_pool(fast)?;

            let stabilized = if signals.occlusion {
                None
            } else {
                Some((
                    builder.add_to_permanent_pool(signal)?,
                    builder.add_to_permanent_pool(signal)?,
                ))
            };

            textures.push(SignalTextures {
                input,
                output,
                confidence,
                history,
                fast_history,
                stabilized,
                tmp1: builder.add_to_transient_pool(signal)?,
                tmp2: builder.add_to_transient_pool(signal)?,
                fast_history_tmp: builder.add_to_transient_pool(fast)?,
            });
        }

        Ok(Self {
            signals: textures,
            tiles,
            data1,
            data2,
            prev_viewz,
            prev_normal_roughness,
            prev_internal_data,
        })
    }
}

pub fn declare(
    decl: &mut Declarations,
    denoiser: Denoiser,
) -> Result<DenoiserLayout> {
    let signals = denoiser.signals();

    let defines = vec![
        Define::flag("REBLUR_DIFFUSE", signals.diffuse),
        Define::flag("REBLUR_SPECULAR", signals.specular),
        Define::flag("REBLUR_OCCLUSION", signals.occlusion),
    ];

    let mut builder = DenoiserBuilder::new(
        decl,
        denoiser.name(),
        defines,
        Family::Reblur.shared_constants_size(),
    );

    let textures = Textures::new(&mut builder, signals)?;

    builder.declare(&textures, &passes(!signals.occlusion))?;
    builder.finish()
}

fn passes(has_stabilization: bool) -> Vec<Pass> {
    use ResourceType::*;

    let mut passes = vec![
        Pass::new(Stage::ClassifyTiles, "REBLUR_ClassifyTiles", |t, _, b| {
            b.input(InViewZ).output(t.tiles);
        })
        .with_downsample_factor(16),
        Pass::new(
            Stage::HitDistReconstruction,
            "REBLUR_HitDistReconstruction",
            |t, p, b| {
                b.input(t.tiles).input(InNormalRoughness).input(InViewZ);

                for s in &t.signals {
                    b.input(s.input);
                }

                for s in &t.signals {
                    if p.has(Axis::PrePass) {
                        b.output(s.tmp1);
                    } else {
                        b.output(s.tmp2);
                    }
                }
            },
        )
        .with_axes(&[Axis::PrePass, Axis::HitDist5x5]),
        Pass::new(Stage::PrePass, "REBLUR_PrePass", |t, p, b| {
            b.input(t.tiles).input(InNormalRoughness).input(InViewZ);

            for s in &t.signals {
                if p.has(Axis::AfterHitDistReconstruction) {
                    b.input(s.tmp1);
                } else {
                    b.input(s.input);
                }
            }

            for s in &t.signals {
                b.output(s.tmp2);
            }
        })
        .with_axes(&[Axis::AfterHitDistReconstruction])
        .with_constants(PassConstants::Blur { phase: 0 }),
        Pass::new(
            Stage::TemporalAccumulation,
            "REBLUR_TemporalAccumulation",
            |t, p, b| {
                b.input(t.tiles)
                    .input(InNormalRoughness)
                    .input(InViewZ)
                    .input(InMv)
                    .input(t.prev_viewz)
                    .input(t.prev_normal_roughness)
                    .input(t.prev_internal_data);

                if p.has(Axis::DisocclusionMix) {
                    b.input(InDisocclusionThresholdMix);
                }

                for s in &t.signals {
                    if p.has(Axis::Confidence) {
                        b.input(s.confidence);
                    }

                    if p.has(Axis::AfterPrePass) {
                        b.input(s.tmp2);
                    } else {
                        b.input(s.input);
                    }

                    match s.stabilized {
                        Some((ping, pong))
                            if p.has(Axis::TemporalStabilization) =>
                        {
                            b.input(ResourceRef::Swap(ping, pong));
                        }
                        _ => {
                            b.input(s.history);
                        }
                    }

                    b.input(s.fast_history);
                }

                for s in &t.signals {
                    b.output(s.tmp1).output(s.fast_history_tmp);
                }

                b.output(t.data1).output(t.data2);
            },
        )
        .with_axes(if has_stabilization {
            &[
                Axis::AfterPrePass,
                Axis::Confidence,
                Axis::DisocclusionMix,
                Axis::TemporalStabilization,
            ]
        } else {
            &[Axis::AfterPrePass, Axis::Confidence, Axis::DisocclusionMix]
        }),
        Pass::new(Stage::HistoryFix, "REBLUR_HistoryFix", |t, _, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(t.data1)
                .input(InViewZ);

            for s in &t.signals {
                b.input(s.tmp1).input(s.fast_history_tmp);
            }

            for s in &t.signals {
                b.output(s.tmp2).output(s.fast_history);
            }
        }),
        Pass::new(Stage::Blur, "REBLUR_Blur", |t, _, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(t.data1)
                .input(InViewZ);

            for s in &t.signals {
                b.input(s.tmp2);
            }

            for s in &t.signals {
                b.output(s.tmp1);
            }

            b.output(t.prev_viewz);
        })
        .with_constants(PassConstants::Blur { phase: 1 }),
        Pass::new(Stage::PostBlur, "REBLUR_PostBlur", |t, p, b| {
            b.input(t.tiles)
                .input(InNormalRoughness)
                .input(t.data1)
                .input(t.data2)
                .input(InViewZ);

            for s in &t.signals {
                b.input(s.tmp1);
            }

            b.output(t.prev_normal_roughness)
                .output(t.prev_internal_data);

            for s in &t.signals {
                b.output(s.history);

                if !p.has(Axis::TemporalStabilization) {
                    b.output(s.output);
                }
            }
        })
        .with_axes(if has_stabilization {
            &[Axis::TemporalStabilization]
        } else {
            &[]
        })
        .with_constants(PassConstants::Blur { phase: 2 }),
    ];

    if has_stabilization {
        passes.push(Pass::new(
            Stage::TemporalStabilization,
            "REBLUR_TemporalStabilization",
            |t, _, b| {
                b.input(t.tiles)
                    .input(InNormalRoughness)
                    .input(InViewZ)
                    .input(InMv)
                    .input(t.data1)
                    .input(t.data2);

                for s in &t.signals {
                    b.input(s.history);

                    if let Some((ping, pong)) = s.stabilized {
                        b.input(ResourceRef::Swap(ping, pong));
                    }
                }

                for s in &t.signals {
                    b.output(s.output);

                    if let Some((ping, pong)) = s.stabilized {
                        b.output(ResourceRef::Swap(pong, ping));
                    }
                }
            },
        ));
    }

    passes.push(Pass::new(
        Stage::SplitScreen,
        "REBLUR_SplitScreen",
        |t, _, b| {
            b.input(InViewZ);

            for s in &t.signals {
                b.input(s.input);
            }

            for s in &t.signals {
                b.output(s.output);
            }
        },
    ));

    passes.push(Pass::new(Stage::Validation, "REBLUR_Validation", |t, _, b| {
        b.input(InNormalRoughness)
            .input(InViewZ)
            .input(InMv)
            .input(t.data1)
            .input(t.data2);

        for s in &t.signals {
            b.input(s.input);
        }

        b.output(OutValidation);
    }));

    passes
}

pub fn stage_flags(
    settings: &ReblurSettings,
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

    flags.temporal_stabilization =
        !signals.occlusion && settings.stabilization_strength > 0.0;

    flags
}

pub fn constants(
    settings: &ReblurSettings,
    flags: &StageFlags,
    common: CommonConstants,
) -> ReblurConstants {
    let (max_accumulated_frame_num, max_fast_accumulated_frame_num) =
        if common.is_history_reset() {
            (0, 0)
        } else {
            let max_accumulated_frame_num = settings
                .max_accumulated_frame_num
                .min(REBLUR_MAX_HISTORY_FRAME_NUM);

            let max_fast_accumulated_frame_num = settings
                .max_fast_accumulated_frame_num
                .min(max_accumulated_frame_num);

            (max_accumulated_frame_num, max_fast_accumulated_frame_num)
        };

    let (diff_checkerboard, spec_checkerboard) =
        settings.checkerboard_mode.channels();

    let hit_distance = settings.hit_distance_parameters;
    let antilag = settings.antilag_settings;

    ReblurConstants {
        common,
        accumulation: vec4(
            max_accumulated_frame_num.to_word(),
            max_fast_accumulated_frame_num.to_word(),
            settings.history_fix_frame_num.to_word(),
            settings.stabilization_strength,
        ),
        hit_distance: vec4(
            hit_distance.a,
            hit_distance.b,
            hit_distance.c,
            hit_distance.d,
        ),
        blur: vec4(
            settings.min_blur_radius,
            settings.max_blur_radius,
            settings.diffuse_prepass_blur_radius,
            settings.specular_prepass_blur_radius,
        ),
        lobe: vec4(
            settings.lobe_angle_fraction,
            settings.roughness_fraction,
            settings.plane_distance_sensitivity,
            settings.responsive_accumulation_roughness_threshold,
        ),
        antilag: vec4(
            antilag.luminance_sigma_scale,
            antilag.hit_distance_sigma_scale,
            antilag.luminance_antilag_power,
            antilag.hit_distance_antilag_power,
        ),
        checkerboard: vec4(
            diff_checkerboard.to_word(),
            spec_checkerboard.to_word(),
            flags.temporal_stabilization.to_word(),
            flags.hit_distance_reconstruction.to_word(),
        ),
    }
}
