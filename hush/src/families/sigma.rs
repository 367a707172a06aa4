use glam::vec4;
use hush_gpu::{
    CommonConstants, SigmaConstants, Word, SIGMA_MAX_HISTORY_FRAME_NUM,
};

use crate::{
    Axis, Bindings, Declarations, Define, Denoiser, DenoiserBuilder,
    DenoiserLayout, Family, Format, PassConstants, PassDesc, PoolSlot,
    ResourceRef, ResourceType, Result, SigmaSettings, Signals, Stage,
    StageFlags, TextureDesc,
};

type Pass = PassDesc<Textures>;

struct Textures {
    translucency: bool,
    history: PoolSlot,
    history_prev: PoolSlot,
    tiles: PoolSlot,
    smooth_tiles: PoolSlot,
    data1: PoolSlot,
    temp1: PoolSlot,
    temp2: PoolSlot,
}

impl Textures {
    fn new(builder: &mut DenoiserBuilder, signals: Signals) -> Result<Self> {
        let shadow = TextureDesc::new(if signals.translucency {
            Format::Rgba8Unorm
        } else {
            Format::R8Unorm
        });

        let tiles = TextureDesc::downsampled(Format::Rg16Sfloat, 16);

        Ok(Self {
            translucency: signals.translucency,
            history: builder.add_to_permanent_pool(shadow)?,
            history_prev: builder.add_to_permanent_pool(shadow)?,
            tiles: builder.add_to_transient_pool(tiles)?,
            smooth_tiles: builder.add_to_transient_pool(tiles)?,
            data1: builder
                .add_to_transient_pool(TextureDesc::new(Format::Rg16Sfloat))?,
            temp1: builder.add_to_transient_pool(shadow)?,
            temp2: builder.add_to_transient_pool(shadow)?,
        })
    }

    fn inputs(&self, b: &mut Bindings) {
        b.input(ResourceType::InPenumbra);

        if self.translucency {
            b.input(ResourceType::InTranslucency);
        }
    }
}

pub fn declare(
    decl: &mut Declarations,
    denoiser: Denoiser,
) -> Result<DenoiserLayout> {
    let signals = denoiser.signals();

    let mut builder = DenoiserBuilder::new(
        decl,
        denoiser.name(),
        vec![Define::flag("SIGMA_TRANSLUCENCY", signals.translucency)],
        Family::Sigma.shared_constants_size(),
    );

    let textures = Textures::new(&mut builder, signals)?;

    builder.declare(&textures, &passes())?;
    builder.finish()
}

fn passes() -> Vec<Pass> {
    use ResourceType::*;

    vec![
        Pass::new(Stage::ClassifyTiles, "SIGMA_ClassifyTiles", |t, _, b| {
            t.inputs(b);
            b.output(t.tiles);
        })
        .with_downsample_factor(16),
        Pass::new(Stage::SmoothTiles, "SIGMA_SmoothTiles", |t, _, b| {
            b.input(t.tiles).output(t.smooth_tiles);
        })
        .with_downsample_factor(16)
        .with_num_threads(16, 16),
        Pass::new(Stage::Blur, "SIGMA_Blur", |t, _, b| {
            b.input(InNormalRoughness);
            t.inputs(b);
            b.input(t.smooth_tiles).output(t.data1).output(t.temp1);
        })
        .with_constants(PassConstants::Blur { phase: 0 }),
        Pass::new(Stage::PostBlur, "SIGMA_PostBlur", |t, p, b| {
            b.input(InNormalRoughness)
                .input(t.data1)
                .input(t.temp1)
                .input(t.smooth_tiles);

            if p.has(Axis::TemporalStabilization) {
                b.output(t.temp2);
            } else {
                b.output(OutShadowTranslucency);
            }
        })
        .with_axes(&[Axis::TemporalStabilization])
        .with_constants(PassConstants::Blur { phase: 1 }),
        Pass::new(
            Stage::TemporalStabilization,
            "SIGMA_TemporalStabilization",
            |t, _, b| {
                b.input(InMv)
                    .input(t.data1)
                    .input(t.temp2)
                    .input(ResourceRef::Swap(t.history_prev, t.history))
                    .input(t.smooth_tiles)
                    .output(OutShadowTranslucency)
                    .output(ResourceRef::Swap(t.history, t.history_prev));
            },
        ),
        Pass::new(Stage::SplitScreen, "SIGMA_SplitScreen", |t, _, b| {
            t.inputs(b);
            b.output(OutShadowTranslucency);
        }),
    ]
}

pub fn stage_flags(
    settings: &SigmaSettings,
    mut flags: StageFlags,
) -> StageFlags {
    flags.temporal_stabilization = settings.max_stabilized_frame_num > 0;
    flags
}

pub fn constants(
    settings: &SigmaSettings,
    signals: Signals,
    common: CommonConstants,
) -> SigmaConstants {
    let max_stabilized_frame_num = if common.is_history_reset() {
        0
    } else {
        settings
            .max_stabilized_frame_num
            .min(SIGMA_MAX_HISTORY_FRAME_NUM)
    };

    SigmaConstants {
        common,
        light: settings
            .light_direction
            .extend(settings.plane_distance_sensitivity),
        stabilization: vec4(
            max_stabilized_frame_num.to_word(),
            settings.blur_radius_scale,
            signals.translucency.to_word(),
            0.0,
        ),
    }
}
