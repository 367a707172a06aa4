//! Pass tables of the denoiser families.

mod reblur;
mod reference;
mod relax;
mod sigma;

use hush_gpu::{
    CommonConstants, ReblurConstants, ReferenceConstants, RelaxConstants,
    SigmaConstants,
};

use crate::{
    CommonSettings, Declarations, Denoiser, DenoiserLayout, DenoiserSettings,
    Family, Result, StageFlags,
};

pub fn declare(
    decl: &mut Declarations,
    denoiser: Denoiser,
) -> Result<DenoiserLayout> {
    match denoiser.family() {
        Family::Reblur => reblur::declare(decl, denoiser),
        Family::Relax => relax::declare(decl, denoiser),
        Family::Sigma => sigma::declare(decl, denoiser),
        Family::Reference => reference::declare(decl, denoiser),
    }
}

/// Evaluates which optional stages and permutation axes are active this
/// frame.
pub fn stage_flags(
    denoiser: Denoiser,
    settings: &DenoiserSettings,
    common: &CommonSettings,
) -> StageFlags {
    let flags = StageFlags::new(common);
    let signals = denoiser.signals();

    match settings {
        DenoiserSettings::Reblur(settings) => {
            reblur::stage_flags(settings, signals, flags)
        }
        DenoiserSettings::Relax(settings) => {
            relax::stage_flags(settings, signals, flags)
        }
        DenoiserSettings::Sigma(settings) => {
            sigma::stage_flags(settings, flags)
        }
        DenoiserSettings::Reference(_) => flags,
    }
}

/// Constants shared by all passes of a denoiser within a frame.
#[derive(Clone, Copy, Debug)]
pub enum SharedConstants {
    Reblur(ReblurConstants),
    Relax(RelaxConstants),
    Sigma(SigmaConstants),
    Reference(ReferenceConstants),
}

impl SharedConstants {
    pub fn new(
        denoiser: Denoiser,
        settings: &DenoiserSettings,
        flags: &StageFlags,
        common: CommonConstants,
    ) -> Self {
        match settings {
            DenoiserSettings::Reblur(settings) => {
                Self::Reblur(reblur::constants(settings, flags, common))
            }
            DenoiserSettings::Relax(settings) => {
                Self::Relax(relax::constants(settings, flags, common))
            }
            DenoiserSettings::Sigma(settings) => Self::Sigma(sigma::constants(
                settings,
                denoiser.signals(),
                common,
            )),
            DenoiserSettings::Reference(settings) => {
                Self::Reference(reference::constants(settings, common))
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Reblur(constants) => bytemuck::bytes_of(constants),
            Self::Relax(constants) => bytemuck::bytes_of(constants),
            Self::Sigma(constants) => bytemuck::bytes_of(constants),
            Self::Reference(constants) => bytemuck::bytes_of(constants),
        }
    }
}
