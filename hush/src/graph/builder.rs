use std::fmt;
use std::ops::Range;

use fxhash::FxHashMap;
use glam::{uvec2, UVec2};
use log::debug;

use crate::{
    Axis, Bindings, Define, DescriptorType, Error, PassConstants, PassDesc,
    Permutation, PingPong, PoolScope, PoolSlot, ResourceDesc, ResourcePools,
    ResourceRef, ResourceType, Result, ShaderKey, Stage, TextureDesc,
};

/// Everything declared by all denoisers of an instance.
#[derive(Debug, Default)]
pub struct Declarations {
    pub pools: ResourcePools,
    pub ping_pong: PingPong,
    pub bindings: Vec<Binding>,
    pub dispatches: Vec<DeclaredDispatch>,
    pub pipelines: Vec<DeclaredPipeline>,
    pipeline_ids: FxHashMap<String, u16>,
}

impl Declarations {
    pub fn bindings(&self, dispatch: &DeclaredDispatch) -> &[Binding] {
        &self.bindings[dispatch.bindings.clone()]
    }

    fn add_pipeline(
        &mut self,
        key: ShaderKey,
        layout: PipelineLayout,
    ) -> Result<u16> {
        let identifier = key.identifier();

        if let Some(&idx) = self.pipeline_ids.get(&identifier) {
            let expected = self.pipelines[usize::from(idx)].layout;

            if expected != layout {
                return Err(Error::MismatchedBindings {
                    shader: identifier,
                    expected: expected.to_string(),
                    given: layout.to_string(),
                });
            }

            return Ok(idx);
        }

        let idx = u16::try_from(self.pipelines.len())
            .map_err(|_| Error::TooManyPipelines)?;

        debug!("Declared pipeline #{}: {}", idx, identifier);

        self.pipeline_ids.insert(identifier.clone(), idx);

        self.pipelines.push(DeclaredPipeline {
            key,
            identifier,
            layout,
        });

        Ok(idx)
    }
}

/// Resource bound to a declared dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Fixed(ResourceDesc),

    /// Permanent texture whose physical slot depends on the state of given
    /// ping-pong entry.
    PingPong {
        entry: u16,
        index_in_pool: u16,
        descriptor_type: DescriptorType,
    },
}

impl Binding {
    pub fn resolve(&self, ping_pong: &PingPong) -> ResourceDesc {
        match *self {
            Binding::Fixed(desc) => desc,

            Binding::PingPong {
                entry,
                index_in_pool,
                descriptor_type,
            } => ResourceDesc {
                ty: ResourceType::PermanentPool,
                index_in_pool: ping_pong.resolve(entry, index_in_pool),
                descriptor_type,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct DeclaredPipeline {
    pub key: ShaderKey,
    pub identifier: String,
    pub layout: PipelineLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineLayout {
    pub num_threads: UVec2,
    pub textures: u32,
    pub storage_textures: u32,
    pub has_constant_data: bool,
}

impl fmt::Display for PipelineLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} texture(s), {} storage texture(s), {}x{} threads",
            self.textures,
            self.storage_textures,
            self.num_threads.x,
            self.num_threads.y
        )?;

        if self.has_constant_data {
            write!(f, ", constant data")?;
        }

        Ok(())
    }
}

/// One permutation of one pass.
#[derive(Clone, Debug)]
pub struct DeclaredDispatch {
    pub name: String,
    pub stage: Stage,
    pub pipeline: u16,
    pub bindings: Range<usize>,
    pub constants: PassConstants,
    pub constant_buffer_size: usize,
    pub num_threads: UVec2,
    pub downsample_factor: u16,
    pub repeat_num: u16,
}

/// Pass of a denoiser, whose permutations occupy the dispatches
/// `base..base + Permutation::count(axes)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeclaredPass {
    pub stage: Stage,
    pub axes: &'static [Axis],
    pub base: usize,
}

impl DeclaredPass {
    pub fn dispatch(&self, perm: Permutation) -> usize {
        self.base + usize::from(perm.index())
    }
}

/// What a single denoiser has declared.
#[derive(Clone, Debug)]
pub struct DenoiserLayout {
    pub passes: Vec<DeclaredPass>,
    pub dispatches: Range<usize>,
    pub ping_pong: Range<u16>,
    pub scope: PoolScope,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchArgs {
    pub num_threads: UVec2,
    pub downsample_factor: u16,
    pub repeat_num: u16,
    pub constants: PassConstants,
}

impl Default for DispatchArgs {
    fn default() -> Self {
        Self {
            num_threads: uvec2(8, 8),
            downsample_factor: 1,
            repeat_num: 1,
            constants: PassConstants::Shared,
        }
    }
}

/// Declares passes of a single denoiser.
pub struct DenoiserBuilder<'a> {
    decl: &'a mut Declarations,
    name: &'static str,
    defines: Vec<Define>,
    shared_constants_size: usize,
    scope: PoolScope,
    passes: Vec<DeclaredPass>,
    pending: Option<PendingPass>,
    dispatches_start: usize,
    ping_pong_start: u16,
}

struct PendingPass {
    stage: Stage,
    inputs: Vec<Binding>,
    outputs: Vec<Binding>,
}

impl<'a> DenoiserBuilder<'a> {
    /// Starts declaring a denoiser; `defines` get prepended to every
    /// permutation's defines, except for clears.
    pub fn new(
        decl: &'a mut Declarations,
        name: &'static str,
        defines: Vec<Define>,
        shared_constants_size: usize,
    ) -> Self {
        let scope = decl.pools.scope();
        let dispatches_start = decl.dispatches.len();
        let ping_pong_start = decl.ping_pong.len();

        Self {
            decl,
            name,
            defines,
            shared_constants_size,
            scope,
            passes: Default::default(),
            pending: None,
            dispatches_start,
            ping_pong_start,
        }
    }

    pub fn add_to_permanent_pool(
        &mut self,
        desc: TextureDesc,
    ) -> Result<PoolSlot> {
        self.decl.pools.add_to_permanent_pool(&mut self.scope, desc)
    }

    pub fn add_to_transient_pool(
        &mut self,
        desc: TextureDesc,
    ) -> Result<PoolSlot> {
        self.decl.pools.add_to_transient_pool(&mut self.scope, desc)
    }

    /// Starts declaring a dispatch; inputs and outputs must follow, then
    /// [`Self::add_dispatch()`].
    pub fn push_pass(&mut self, stage: Stage) -> Result<()> {
        if self.pending.is_some() {
            return Err(Error::InvalidArgument(
                "previous pass has not been dispatched",
            ));
        }

        self.pending = Some(PendingPass {
            stage,
            inputs: Default::default(),
            outputs: Default::default(),
        });

        Ok(())
    }

    pub fn push_input(&mut self, resource: ResourceRef) -> Result<()> {
        if let ResourceRef::Resource(ty) = resource {
            if !ty.is_input() {
                return Err(Error::InvalidArgument(
                    "pass inputs must be host inputs or pooled textures",
                ));
            }
        }

        let binding = self.binding(resource, DescriptorType::Texture)?;

        self.pending_mut()?.inputs.push(binding);

        Ok(())
    }

    pub fn push_output(&mut self, resource: ResourceRef) -> Result<()> {
        if let ResourceRef::Resource(ty) = resource {
            if !ty.is_output() {
                return Err(Error::InvalidArgument(
                    "pass outputs must be host outputs or pooled textures",
                ));
            }
        }

        let binding = self.binding(resource, DescriptorType::StorageTexture)?;

        self.pending_mut()?.outputs.push(binding);

        Ok(())
    }

    pub fn add_dispatch(
        &mut self,
        shader: &'static str,
        defines: Vec<Define>,
    ) -> Result<usize> {
        self.add_dispatch_with_args(shader, defines, Default::default())
    }

    /// Finishes the pending pass and returns its global dispatch index.
    pub fn add_dispatch_with_args(
        &mut self,
        shader: &'static str,
        defines: Vec<Define>,
        args: DispatchArgs,
    ) -> Result<usize> {
        let pass = self.pending.take().ok_or(Error::InvalidArgument(
            "dispatch must be preceded by a pass",
        ))?;

        if args.downsample_factor == 0 || args.repeat_num == 0 {
            return Err(Error::InvalidArgument(
                "downsample factor and repeat count must be positive",
            ));
        }

        let layout = PipelineLayout {
            num_threads: args.num_threads,
            textures: pass.inputs.len() as u32,
            storage_textures: pass.outputs.len() as u32,
            has_constant_data: args.constants.has_shared(),
        };

        let pipeline =
            self.decl.add_pipeline(ShaderKey::new(shader, defines), layout)?;

        let bindings = {
            let start = self.decl.bindings.len();

            self.decl.bindings.extend(pass.inputs);
            self.decl.bindings.extend(pass.outputs);

            start..self.decl.bindings.len()
        };

        let constant_buffer_size = if args.constants.has_shared() {
            self.shared_constants_size + args.constants.specific_size()
        } else {
            0
        };

        self.decl.dispatches.push(DeclaredDispatch {
            name: format!("{} - {}", self.name, pass.stage.name()),
            stage: pass.stage,
            pipeline,
            bindings,
            constants: args.constants,
            constant_buffer_size,
            num_threads: args.num_threads,
            downsample_factor: args.downsample_factor,
            repeat_num: args.repeat_num,
        });

        Ok(self.decl.dispatches.len() - 1)
    }

    /// Declares clears of every permanent texture added so far, followed by
    /// all permutations of given passes.
    pub fn declare<C>(
        &mut self,
        ctx: &C,
        passes: &[PassDesc<C>],
    ) -> Result<()> {
        let permanent: Vec<_> = self.scope.permanent_slots().collect();

        for slot in permanent {
            let desc = self
                .decl
                .pools
                .desc(&self.scope, slot)
                .ok_or(Error::InvalidArgument("unknown permanent pool slot"))?;

            let shader = if desc.format.is_integer() {
                "Clear_ui"
            } else {
                "Clear_f"
            };

            self.push_pass(Stage::Clear)?;
            self.push_output(slot.into())?;

            let base = self.add_dispatch_with_args(
                shader,
                Default::default(),
                DispatchArgs {
                    downsample_factor: desc.downsample_factor,
                    constants: PassConstants::None,
                    ..Default::default()
                },
            )?;

            self.passes.push(DeclaredPass {
                stage: Stage::Clear,
                axes: &[],
                base,
            });
        }

        for pass in passes {
            self.declare_pass(ctx, pass)?;
        }

        Ok(())
    }

    fn declare_pass<C>(&mut self, ctx: &C, pass: &PassDesc<C>) -> Result<()> {
        let base = self.decl.dispatches.len();

        for perm in Permutation::all(pass.axes) {
            let mut bindings = Bindings::default();

            (pass.bindings)(ctx, perm, &mut bindings);

            self.push_pass(pass.stage)?;

            for input in bindings.inputs {
                self.push_input(input)?;
            }

            for output in bindings.outputs {
                self.push_output(output)?;
            }

            let defines = self
                .defines
                .iter()
                .cloned()
                .chain(perm.defines())
                .collect();

            let idx = self.add_dispatch_with_args(
                pass.shader,
                defines,
                DispatchArgs {
                    num_threads: pass.num_threads,
                    downsample_factor: pass.downsample_factor,
                    repeat_num: pass.repeat_num,
                    constants: pass.constants,
                },
            )?;

            debug_assert_eq!(base + usize::from(perm.index()), idx);
        }

        debug!(
            "Declared pass: {} - {} ({} permutation(s))",
            self.name,
            pass.stage.name(),
            Permutation::count(pass.axes)
        );

        self.passes.push(DeclaredPass {
            stage: pass.stage,
            axes: pass.axes,
            base,
        });

        Ok(())
    }

    pub fn finish(self) -> Result<DenoiserLayout> {
        if self.pending.is_some() {
            return Err(Error::InvalidArgument(
                "last pass has not been dispatched",
            ));
        }

        Ok(DenoiserLayout {
            passes: self.passes,
            dispatches: self.dispatches_start..self.decl.dispatches.len(),
            ping_pong: self.ping_pong_start..self.decl.ping_pong.len(),
            scope: self.scope,
        })
    }

    fn pending_mut(&mut self) -> Result<&mut PendingPass> {
        self.pending
            .as_mut()
            .ok_or(Error::InvalidArgument("binding must follow a pass"))
    }

    fn binding(
        &mut self,
        resource: ResourceRef,
        descriptor_type: DescriptorType,
    ) -> Result<Binding> {
        match resource {
            ResourceRef::Resource(ty) => Ok(Binding::Fixed(ResourceDesc {
                ty,
                index_in_pool: 0,
                descriptor_type,
            })),

            ResourceRef::Pool(slot) => {
                let (ty, index_in_pool) = self.scope.resolve(slot)?;

                Ok(Binding::Fixed(ResourceDesc {
                    ty,
                    index_in_pool,
                    descriptor_type,
                }))
            }

            ResourceRef::Swap(a, b) => {
                if !matches!(
                    (a, b),
                    (PoolSlot::Permanent(_), PoolSlot::Permanent(_))
                ) {
                    return Err(Error::InvalidPingPong);
                }

                let (_, a) = self.scope.resolve(a)?;
                let (_, b) = self.scope.resolve(b)?;
                let entry = self.decl.ping_pong.register_swap(a, b)?;

                Ok(Binding::PingPong {
                    entry,
                    index_in_pool: a,
                    descriptor_type,
                })
            }
        }
    }
}
