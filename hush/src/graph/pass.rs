use std::mem;

use glam::{uvec2, UVec2};
use hush_gpu::{AtrousPassConstants, BlurPassConstants};

use crate::{Axis, Permutation, PoolSlot, ResourceType, Stage};

/// Declarative description of one pass of a denoiser.
///
/// `C` is the family's table of pooled textures, handed to `bindings` which
/// lists the pass' inputs and outputs for a given permutation; inputs are
/// bound before outputs, in the order the shader expects them.
pub struct PassDesc<C> {
    pub stage: Stage,
    pub shader: &'static str,
    pub axes: &'static [Axis],
    pub num_threads: UVec2,
    pub downsample_factor: u16,
    pub repeat_num: u16,
    pub constants: PassConstants,
    pub bindings: fn(&C, Permutation, &mut Bindings),
}

impl<C> PassDesc<C> {
    pub fn new(
        stage: Stage,
        shader: &'static str,
        bindings: fn(&C, Permutation, &mut Bindings),
    ) -> Self {
        Self {
            stage,
            shader,
            axes: &[],
            num_threads: uvec2(8, 8),
            downsample_factor: 1,
            repeat_num: 1,
            constants: PassConstants::Shared,
            bindings,
        }
    }

    pub fn with_axes(mut self, axes: &'static [Axis]) -> Self {
        self.axes = axes;
        self
    }

    pub fn with_num_threads(mut self, x: u32, y: u32) -> Self {
        self.num_threads = uvec2(x, y);
        self
    }

    pub fn with_downsample_factor(mut self, downsample_factor: u16) -> Self {
        self.downsample_factor = downsample_factor;
        self
    }

    pub fn with_repeat_num(mut self, repeat_num: u16) -> Self {
        self.repeat_num = repeat_num;
        self
    }

    pub fn with_constants(mut self, constants: PassConstants) -> Self {
        self.constants = constants;
        self
    }
}

/// Resource referenced by a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceRef {
    /// One of the host's inputs or outputs.
    Resource(ResourceType),

    /// One of the denoiser's pooled textures.
    Pool(PoolSlot),

    /// The first permanent texture, trading places with the second one
    /// after every frame.
    Swap(PoolSlot, PoolSlot),
}

impl From<ResourceType> for ResourceRef {
    fn from(ty: ResourceType) -> Self {
        Self::Resource(ty)
    }
}

impl From<PoolSlot> for ResourceRef {
    fn from(slot: PoolSlot) -> Self {
        Self::Pool(slot)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    pub inputs: Vec<ResourceRef>,
    pub outputs: Vec<ResourceRef>,
}

impl Bindings {
    pub fn input(&mut self, resource: impl Into<ResourceRef>) -> &mut Self {
        self.inputs.push(resource.into());
        self
    }

    pub fn output(&mut self, resource: impl Into<ResourceRef>) -> &mut Self {
        self.outputs.push(resource.into());
        self
    }
}

/// Constant data a dispatch receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassConstants {
    None,

    /// Just the family's shared constants.
    Shared,

    /// Shared constants followed by [`BlurPassConstants`].
    Blur { phase: u32 },

    /// Shared constants followed by [`AtrousPassConstants`].
    Atrous,
}

impl PassConstants {
    pub fn has_shared(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Returns size of the pass-specific data, appended after the shared
    /// constants.
    pub fn specific_size(self) -> usize {
        match self {
            Self::None | Self::Shared => 0,
            Self::Blur { .. } => mem::size_of::<BlurPassConstants>(),
            Self::Atrous => mem::size_of::<AtrousPassConstants>(),
        }
    }
}
