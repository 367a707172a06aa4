use std::mem;

use hush_gpu::{
    ReblurConstants, ReferenceConstants, RelaxConstants, SigmaConstants,
};

use crate::{
    ReblurSettings, ReferenceSettings, RelaxSettings, Result, SigmaSettings,
};

/// Host-chosen identifier of a denoiser within an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Denoiser {
    ReblurDiffuse,
    ReblurDiffuseOcclusion,
    ReblurSpecular,
    ReblurSpecularOcclusion,
    ReblurDiffuseSpecular,
    ReblurDiffuseSpecularOcclusion,
    RelaxDiffuse,
    RelaxSpecular,
    RelaxDiffuseSpecular,
    SigmaShadow,
    SigmaShadowTranslucency,
    Reference,
}

impl Denoiser {
    pub const ALL: [Self; 12] = [
        Self::ReblurDiffuse,
        Self::ReblurDiffuseOcclusion,
        Self::ReblurSpecular,
        Self::ReblurSpecularOcclusion,
        Self::ReblurDiffuseSpecular,
        Self::ReblurDiffuseSpecularOcclusion,
        Self::RelaxDiffuse,
        Self::RelaxSpecular,
        Self::RelaxDiffuseSpecular,
        Self::SigmaShadow,
        Self::SigmaShadowTranslucency,
        Self::Reference,
    ];

    pub fn family(self) -> Family {
        match self {
            Self::ReblurDiffuse
            | Self::ReblurDiffuseOcclusion
            | Self::ReblurSpecular
            | Self::ReblurSpecularOcclusion
            | Self::ReblurDiffuseSpecular
            | Self::ReblurDiffuseSpecularOcclusion => Family::Reblur,

            Self::RelaxDiffuse
            | Self::RelaxSpecular
            | Self::RelaxDiffuseSpecular => Family::Relax,

            Self::SigmaShadow | Self::SigmaShadowTranslucency => Family::Sigma,

            Self::Reference => Family::Reference,
        }
    }

    pub fn signals(self) -> Signals {
        let diffuse = matches!(
            self,
            Self::ReblurDiffuse
                | Self::ReblurDiffuseOcclusion
                | Self::ReblurDiffuseSpecular
                | Self::ReblurDiffuseSpecularOcclusion
                | Self::RelaxDiffuse
                | Self::RelaxDiffuseSpecular
        );

        let specular = matches!(
            self,
            Self::ReblurSpecular
                | Self::ReblurSpecularOcclusion
                | Self::ReblurDiffuseSpecular
                | Self::ReblurDiffuseSpecularOcclusion
                | Self::RelaxSpecular
                | Self::RelaxDiffuseSpecular
        );

        let occlusion = matches!(
            self,
            Self::ReblurDiffuseOcclusion
                | Self::ReblurSpecularOcclusion
                | Self::ReblurDiffuseSpecularOcclusion
        );

        Signals {
            diffuse,
            specular,
            occlusion,
            translucency: self == Self::SigmaShadowTranslucency,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ReblurDiffuse => "ReblurDiffuse",
            Self::ReblurDiffuseOcclusion => "ReblurDiffuseOcclusion",
            Self::ReblurSpecular => "ReblurSpecular",
            Self::ReblurSpecularOcclusion => "ReblurSpecularOcclusion",
            Self::ReblurDiffuseSpecular => "ReblurDiffuseSpecular",
            Self::ReblurDiffuseSpecularOcclusion => {
                "ReblurDiffuseSpecularOcclusion"
            }
            Self::RelaxDiffuse => "RelaxDiffuse",
            Self::RelaxSpecular => "RelaxSpecular",
            Self::RelaxDiffuseSpecular => "RelaxDiffuseSpecular",
            Self::SigmaShadow => "SigmaShadow",
            Self::SigmaShadowTranslucency => "SigmaShadowTranslucency",
            Self::Reference => "Reference",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Reblur,
    Relax,
    Sigma,
    Reference,
}

impl Family {
    /// Returns size of the constants shared by all passes of this family.
    pub fn shared_constants_size(self) -> usize {
        match self {
            Family::Reblur => mem::size_of::<ReblurConstants>(),
            Family::Relax => mem::size_of::<RelaxConstants>(),
            Family::Sigma => mem::size_of::<SigmaConstants>(),
            Family::Reference => mem::size_of::<ReferenceConstants>(),
        }
    }
}

/// Signals processed by a denoiser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Signals {
    pub diffuse: bool,
    pub specular: bool,

    /// Signals carry just the hit distance (ambient / specular occlusion)
    /// instead of radiance.
    pub occlusion: bool,

    /// Shadow comes with a translucency channel.
    pub translucency: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DenoiserDesc {
    pub identifier: Identifier,
    pub denoiser: Denoiser,
}

/// Settings of a single denoiser.
#[derive(Clone, Debug, PartialEq)]
pub enum DenoiserSettings {
    Reblur(ReblurSettings),
    Relax(RelaxSettings),
    Sigma(SigmaSettings),
    Reference(ReferenceSettings),
}

impl DenoiserSettings {
    pub fn new(family: Family) -> Self {
        match family {
            Family::Reblur => Self::Reblur(Default::default()),
            Family::Relax => Self::Relax(Default::default()),
            Family::Sigma => Self::Sigma(Default::default()),
            Family::Reference => Self::Reference(Default::default()),
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Self::Reblur(_) => Family::Reblur,
            Self::Relax(_) => Family::Relax,
            Self::Sigma(_) => Family::Sigma,
            Self::Reference(_) => Family::Reference,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Reblur(settings) => settings.validate(),
            Self::Relax(settings) => settings.validate(),
            Self::Sigma(settings) => settings.validate(),
            Self::Reference(settings) => settings.validate(),
        }
    }
}

impl From<ReblurSettings> for DenoiserSettings {
    fn from(settings: ReblurSettings) -> Self {
        Self::Reblur(settings)
    }
}

impl From<RelaxSettings> for DenoiserSettings {
    fn from(settings: RelaxSettings) -> Self {
        Self::Relax(settings)
    }
}

impl From<SigmaSettings> for DenoiserSettings {
    fn from(settings: SigmaSettings) -> Self {
        Self::Sigma(settings)
    }
}

impl From<ReferenceSettings> for DenoiserSettings {
    fn from(settings: ReferenceSettings) -> Self {
        Self::Reference(settings)
    }
}
