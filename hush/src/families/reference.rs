use glam::vec4;
use hush_gpu::{
    CommonConstants, ReferenceConstants, Word,
    REFERENCE_MAX_HISTORY_FRAME_NUM,
};

use crate::{
    Declarations, Denoiser, DenoiserBuilder, DenoiserLayout, Family, Format,
    PassDesc, PoolSlot, ReferenceSettings, ResourceRef, ResourceType, Result,
    Stage, TextureDesc,
};

type Pass = PassDesc<Textures>;

struct Textures {
    history: PoolSlot,
    history_prev: PoolSlot,
}

pub fn declare(
    decl: &mut Declarations,
    denoiser: Denoiser,
) -> Result<DenoiserLayout> {
    let mut builder = DenoiserBuilder::new(
        decl,
        denoiser.name(),
        Default::default(),
        Family::Reference.shared_constants_size(),
    );

    let history = TextureDesc::new(Format::Rgba32Sfloat);

    let textures = Textures {
        history: builder.add_to_permanent_pool(history)?,
        history_prev: builder.add_to_permanent_pool(history)?,
    };

    builder.declare(&textures, &passes())?;
    builder.finish()
}

fn passes() -> Vec<Pass> {
    vec![
        Pass::new(
            Stage::TemporalAccumulation,
            "REFERENCE_TemporalAccumulation",
            |t, _, b| {
                b.input(ResourceType::InSignal)
                    .input(ResourceRef::Swap(t.history_prev, t.history))
                    .output(ResourceRef::Swap(t.history, t.history_prev));
            },
        ),
        Pass::new(Stage::Copy, "REFERENCE_Copy", |t, _, b| {
            b.input(ResourceRef::Swap(t.history, t.history_prev))
                .output(ResourceType::OutSignal);
        }),
        Pass::new(Stage::SplitScreen, "REFERENCE_SplitScreen", |_, _, b| {
            b.input(ResourceType::InSignal)
                .output(ResourceType::OutSignal);
        }),
    ]
}

pub fn constants(
    settings: &ReferenceSettings,
    common: CommonConstants,
) -> ReferenceConstants {
    let max_accumulated_frame_num = settings
        .max_accumulated_frame_num
        .min(REFERENCE_MAX_HISTORY_FRAME_NUM);

    let accumulated_frame_num = common
        .accumulated_frame_num()
        .min(max_accumulated_frame_num);

    ReferenceConstants {
        common,
        accumulation: vec4(
            max_accumulated_frame_num.to_word(),
            1.0 / (1.0 + accumulated_frame_num as f32),
            0.0,
            0.0,
        ),
    }
}
