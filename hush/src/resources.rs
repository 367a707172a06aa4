/// Pixel format of a pooled texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    R8Unorm,
    R8Uint,
    R16Uint,
    R16Sfloat,
    R32Uint,
    R32Sfloat,
    Rg16Sfloat,
    Rgba8Unorm,
    Rgba16Sfloat,
    Rgba32Sfloat,
}

impl Format {
    pub fn is_integer(self) -> bool {
        matches!(self, Self::R8Uint | Self::R16Uint | Self::R32Uint)
    }
}

/// Texture living in one of the pools; its size is the resource size
/// divided by `downsample_factor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub format: Format,
    pub downsample_factor: u16,
}

impl TextureDesc {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            downsample_factor: 1,
        }
    }

    pub fn downsampled(format: Format, downsample_factor: u16) -> Self {
        Self {
            format,
            downsample_factor,
        }
    }
}

/// Kind of a resource bound to a dispatch: either one of the textures
/// provided by the host, or a texture from the permanent / transient pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    InMv,
    InNormalRoughness,
    InViewZ,
    InDiffRadianceHitDist,
    InSpecRadianceHitDist,
    InDiffHitDist,
    InSpecHitDist,
    InDiffConfidence,
    InSpecConfidence,
    InDisocclusionThresholdMix,
    InPenumbra,
    InTranslucency,
    InSignal,

    OutDiffRadianceHitDist,
    OutSpecRadianceHitDist,
    OutDiffHitDist,
    OutSpecHitDist,
    OutShadowTranslucency,
    OutSignal,
    OutValidation,

    TransientPool,
    PermanentPool,
}

impl ResourceType {
    pub fn is_input(self) -> bool {
        matches!(
            self,
            Self::InMv
                | Self::InNormalRoughness
                | Self::InViewZ
                | Self::InDiffRadianceHitDist
                | Self::InSpecRadianceHitDist
                | Self::InDiffHitDist
                | Self::InSpecHitDist
                | Self::InDiffConfidence
                | Self::InSpecConfidence
                | Self::InDisocclusionThresholdMix
                | Self::InPenumbra
                | Self::InTranslucency
                | Self::InSignal
        )
    }

    pub fn is_output(self) -> bool {
        matches!(
            self,
            Self::OutDiffRadianceHitDist
                | Self::OutSpecRadianceHitDist
                | Self::OutDiffHitDist
                | Self::OutSpecHitDist
                | Self::OutShadowTranslucency
                | Self::OutSignal
                | Self::OutValidation
        )
    }

    pub fn is_pool(self) -> bool {
        matches!(self, Self::TransientPool | Self::PermanentPool)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// Read-only texture.
    Texture,

    /// Read-write (storage) texture.
    StorageTexture,
}

/// Resource bound to a dispatch.
///
/// For pooled resources `index_in_pool` points into
/// [`crate::InstanceDesc::permanent_pool`] or
/// [`crate::InstanceDesc::transient_pool`]; for the host's resources it's
/// always zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDesc {
    pub ty: ResourceType,
    pub index_in_pool: u16,
    pub descriptor_type: DescriptorType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sampler {
    NearestClamp,
    LinearClamp,
}

impl Sampler {
    pub const ALL: [Self; 2] = [Self::NearestClamp, Self::LinearClamp];
}
