use std::ops::Range;
use std::sync::Arc;

use derivative::Derivative;
use fxhash::FxHashMap;
use glam::{uvec2, UVec2};
use hush_gpu::{AtrousPassConstants, BlurPassConstants};
use log::{info, trace};

use crate::families::{self, SharedConstants};
use crate::{
    common_constants, selector, utils, AccumulationMode, AtrousIteration,
    CommonSettings, ConstantBuffer, Declarations, DenoiserDesc,
    DenoiserLayout, DenoiserSettings, DescriptorType, Error, HistoryState,
    Identifier, MemoryAllocator, PassConstants, ResourceDesc, Result,
    Sampler, Selected, ShaderBytecode, ShaderKey, ShaderStore, Stage,
    SystemAllocator, TextureDesc,
};

#[derive(Clone, Derivative)]
#[derivative(Debug, Default)]
pub struct InstanceCreationDesc {
    pub denoisers: Vec<DenoiserDesc>,

    /// Allocator for the per-frame scratch memory; defaults to
    /// [`SystemAllocator`].
    #[derivative(Debug = "ignore")]
    pub allocator: Option<Arc<dyn MemoryAllocator>>,
}

impl InstanceCreationDesc {
    pub fn new(denoisers: impl IntoIterator<Item = DenoiserDesc>) -> Self {
        Self {
            denoisers: denoisers.into_iter().collect(),
            allocator: None,
        }
    }

    pub fn with_allocator(
        mut self,
        allocator: Arc<dyn MemoryAllocator>,
    ) -> Self {
        self.allocator = Some(allocator);
        self
    }
}

/// Everything the host has to create before dispatching anything.
#[derive(Clone, Debug)]
pub struct InstanceDesc {
    pub pipelines: Vec<PipelineDesc>,
    pub permanent_pool: Vec<TextureDesc>,
    pub transient_pool: Vec<TextureDesc>,
    pub samplers: Vec<Sampler>,

    /// Size of the largest constant block a dispatch can receive.
    pub constant_buffer_max_data_size: usize,

    pub descriptor_pool_desc: DescriptorPoolDesc,
}

#[derive(Clone, Debug)]
pub struct PipelineDesc {
    pub shader: ShaderKey,
    pub identifier: String,
    pub bytecode: ShaderBytecode,
    pub resource_ranges: Vec<ResourceRange>,
    pub num_threads: UVec2,
    pub has_constant_data: bool,
}

/// Consecutive resources of the same type, in binding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceRange {
    pub descriptor_type: DescriptorType,
    pub count: u32,
}

/// Upper bounds of descriptors needed to bind every declared dispatch, each
/// one weighted by its repeat count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DescriptorPoolDesc {
    pub sets_max_num: u32,
    pub constant_buffers_max_num: u32,
    pub samplers_max_num: u32,
    pub textures_max_num: u32,
    pub storage_textures_max_num: u32,
}

/// Set of denoisers, compiled into pipelines and pools, producing a list of
/// dispatches every frame.
#[derive(Debug)]
pub struct Instance {
    desc: InstanceDesc,
    decl: Declarations,
    denoisers: Vec<DenoiserState>,
    lookup: FxHashMap<Identifier, usize>,
    common: CommonSettings,
    constants: ConstantBuffer,
    selected: Vec<Selected>,
    resources: Vec<ResourceDesc>,
    dispatches: Vec<ActiveDispatch>,
}

#[derive(Debug)]
struct DenoiserState {
    desc: DenoiserDesc,
    settings: DenoiserSettings,
    layout: DenoiserLayout,
    history: Option<HistorySnapshot>,
    accumulated_frame_num: u32,
}

/// Sizes seen during the last non-passthrough frame of a denoiser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HistorySnapshot {
    rect_size: UVec2,
    resource_size: UVec2,
}

#[derive(Clone, Debug)]
struct ActiveDispatch {
    identifier: Identifier,
    dispatch: usize,
    resources: Range<usize>,
    constants: Range<usize>,
    grid: UVec2,
}

impl Instance {
    pub fn new(
        desc: &InstanceCreationDesc,
        shaders: &dyn ShaderStore,
    ) -> Result<Self> {
        if desc.denoisers.is_empty() {
            return Err(Error::NoDenoisers);
        }

        let mut decl = Declarations::default();
        let mut denoisers = Vec::with_capacity(desc.denoisers.len());
        let mut lookup = FxHashMap::default();

        for &denoiser in &desc.denoisers {
            if lookup
                .insert(denoiser.identifier, denoisers.len())
                .is_some()
            {
                return Err(Error::DuplicateIdentifier(denoiser.identifier));
            }

            let layout = families::declare(&mut decl, denoiser.denoiser)?;

            denoisers.push(DenoiserState {
                desc: denoiser,
                settings: DenoiserSettings::new(denoiser.denoiser.family()),
                layout,
                history: None,
                accumulated_frame_num: 0,
            });
        }

        let desc_ = Self::describe(&decl, shaders);

        info!(
            "Instance created; denoisers = {}, pipelines = {}, \
             permanent-pool = {}, transient-pool = {}",
            denoisers.len(),
            desc_.pipelines.len(),
            desc_.permanent_pool.len(),
            desc_.transient_pool.len(),
        );

        let allocator = desc
            .allocator
            .clone()
            .unwrap_or_else(|| Arc::new(SystemAllocator));

        Ok(Self {
            desc: desc_,
            decl,
            denoisers,
            lookup,
            common: Default::default(),
            constants: ConstantBuffer::new(allocator),
            selected: Default::default(),
            resources: Default::default(),
            dispatches: Default::default(),
        })
    }

    fn describe(
        decl: &Declarations,
        shaders: &dyn ShaderStore,
    ) -> InstanceDesc {
        let pipelines = decl
            .pipelines
            .iter()
            .map(|pipeline| {
                let layout = pipeline.layout;

                let resource_ranges = [
                    (DescriptorType::Texture, layout.textures),
                    (DescriptorType::StorageTexture, layout.storage_textures),
                ]
                .into_iter()
                .filter(|(_, count)| *count > 0)
                .map(|(descriptor_type, count)| ResourceRange {
                    descriptor_type,
                    count,
                })
                .collect();

                PipelineDesc {
                    shader: pipeline.key.clone(),
                    identifier: pipeline.identifier.clone(),
                    bytecode: ShaderBytecode::resolve(shaders, &pipeline.key),
                    resource_ranges,
                    num_threads: layout.num_threads,
                    has_constant_data: layout.has_constant_data,
                }
            })
            .collect();

        let mut descriptor_pool_desc = DescriptorPoolDesc::default();

        for dispatch in &decl.dispatches {
            let layout = decl.pipelines[usize::from(dispatch.pipeline)].layout;
            let repeat_num = u32::from(dispatch.repeat_num);
            let pool = &mut descriptor_pool_desc;

            pool.sets_max_num += repeat_num;
            pool.samplers_max_num += repeat_num * Sampler::ALL.len() as u32;
            pool.textures_max_num += repeat_num * layout.textures;
            pool.storage_textures_max_num +=
                repeat_num * layout.storage_textures;

            if dispatch.constant_buffer_size > 0 {
                pool.constant_buffers_max_num += repeat_num;
            }
        }

        let constant_buffer_max_data_size = decl
            .dispatches
            .iter()
            .map(|dispatch| dispatch.constant_buffer_size)
            .max()
            .unwrap_or_default();

        InstanceDesc {
            pipelines,
            permanent_pool: decl.pools.permanent().to_vec(),
            transient_pool: decl.pools.transient().to_vec(),
            samplers: Sampler::ALL.to_vec(),
            constant_buffer_max_data_size,
            descriptor_pool_desc,
        }
    }

    pub fn desc(&self) -> &InstanceDesc {
        &self.desc
    }

    pub fn set_common_settings(
        &mut self,
        settings: &CommonSettings,
    ) -> Result<()> {
        settings.validate()?;
        self.common = settings.clone();

        Ok(())
    }

    pub fn set_denoiser_settings(
        &mut self,
        identifier: Identifier,
        settings: impl Into<DenoiserSettings>,
    ) -> Result<()> {
        let settings = settings.into();
        let idx = self.index(identifier)?;
        let denoiser = &mut self.denoisers[idx];
        let expected = denoiser.desc.denoiser.family();

        if settings.family() != expected {
            return Err(Error::InvalidSettings {
                identifier,
                expected,
                given: settings.family(),
            });
        }

        settings.validate()?;
        denoiser.settings = settings;

        Ok(())
    }

    /// Builds this frame's dispatches of given denoisers, in given order.
    ///
    /// Returned dispatches borrow the instance's scratch memory, which gets
    /// overwritten by the next call.
    pub fn get_compute_dispatches(
        &mut self,
        identifiers: &[Identifier],
    ) -> Result<Dispatches<'_>> {
        let mut denoisers = Vec::with_capacity(identifiers.len());

        for &identifier in identifiers {
            let idx = self.index(identifier)?;

            if denoisers.contains(&idx) {
                return Err(Error::DuplicateIdentifier(identifier));
            }

            denoisers.push(idx);
        }

        utils::measure("get_compute_dispatches", || {
            self.constants.clear();
            self.resources.clear();
            self.dispatches.clear();

            for idx in denoisers {
                self.dispatch_denoiser(idx)?;
            }

            Ok(())
        })?;

        Ok(Dispatches { instance: self })
    }

    fn index(&self, identifier: Identifier) -> Result<usize> {
        self.lookup
            .get(&identifier)
            .copied()
            .ok_or(Error::UnknownIdentifier(identifier))
    }

    fn dispatch_denoiser(&mut self, idx: usize) -> Result<()> {
        let common = &self.common;
        let denoiser = &mut self.denoisers[idx];

        let mut flags = families::stage_flags(
            denoiser.desc.denoiser,
            &denoiser.settings,
            common,
        );

        let history = denoiser.history;

        let is_reset = common.accumulation_mode != AccumulationMode::Continue
            || history.map_or(true, |history| {
                history.rect_size != common.rect_size
            });

        flags.clear = common.accumulation_mode
            == AccumulationMode::ClearAndRestart
            || history.map_or(true, |history| {
                history.resource_size != common.resource_size
            });

        let accumulated_frame_num = if is_reset {
            0
        } else {
            denoiser.accumulated_frame_num.saturating_add(1)
        };

        trace!(
            "{:?}: reset = {}, clear = {}, accumulated-frames = {}",
            denoiser.desc.identifier,
            is_reset,
            flags.clear,
            accumulated_frame_num
        );

        let shared = SharedConstants::new(
            denoiser.desc.denoiser,
            &denoiser.settings,
            &flags,
            common_constants(
                common,
                HistoryState {
                    is_reset,
                    accumulated_frame_num,
                },
            ),
        );

        self.selected.clear();
        selector::select(&denoiser.layout.passes, &flags, &mut self.selected);

        let shared = shared.as_bytes();

        for selected in &self.selected {
            let dispatch = &self.decl.dispatches[selected.dispatch];

            let constants = match dispatch.constants {
                PassConstants::None => self.constants.push(&[])?,
                PassConstants::Shared => self.constants.push(&[shared])?,

                PassConstants::Blur { phase } => {
                    let pass =
                        BlurPassConstants::new(common.frame_index, phase);

                    self.constants
                        .push(&[shared, bytemuck::bytes_of(&pass)])?
                }

                PassConstants::Atrous => {
                    debug_assert!(selected.atrous.is_some());

                    let AtrousIteration { iteration, is_last } =
                        selected.atrous.unwrap_or(AtrousIteration {
                            iteration: 0,
                            is_last: false,
                        });

                    let pass = AtrousPassConstants::new(iteration, is_last);

                    self.constants
                        .push(&[shared, bytemuck::bytes_of(&pass)])?
                }
            };

            debug_assert_eq!(dispatch.constant_buffer_size, constants.len());

            let resources = {
                let start = self.resources.len();

                self.resources.extend(
                    self.decl
                        .bindings(dispatch)
                        .iter()
                        .map(|binding| binding.resolve(&self.decl.ping_pong)),
                );

                start..self.resources.len()
            };

            let extent = if dispatch.stage == Stage::Clear {
                common.resource_size
            } else {
                common.rect_size
            };

            self.dispatches.push(ActiveDispatch {
                identifier: denoiser.desc.identifier,
                dispatch: selected.dispatch,
                resources,
                constants,
                grid: grid(
                    extent,
                    dispatch.downsample_factor,
                    dispatch.num_threads,
                ),
            });
        }

        if !flags.is_passthrough() {
            self.decl
                .ping_pong
                .apply_swaps(denoiser.layout.ping_pong.clone());

            denoiser.history = Some(HistorySnapshot {
                rect_size: common.rect_size,
                resource_size: common.resource_size,
            });

            denoiser.accumulated_frame_num = accumulated_frame_num;
        }

        Ok(())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        info!("Instance dropped; denoisers = {}", self.denoisers.len());
    }
}

/// Returns the number of thread groups covering `extent`.
fn grid(extent: UVec2, downsample_factor: u16, num_threads: UVec2) -> UVec2 {
    let div_ceil = |a: UVec2, b: UVec2| {
        let rem = a % b;

        a / b + uvec2(u32::from(rem.x != 0), u32::from(rem.y != 0))
    };

    div_ceil(
        div_ceil(extent, UVec2::splat(u32::from(downsample_factor))),
        num_threads,
    )
}

/// Dispatches of the current frame, in submission order.
#[derive(Clone, Copy, Debug)]
pub struct Dispatches<'a> {
    instance: &'a Instance,
}

impl<'a> Dispatches<'a> {
    pub fn len(&self) -> usize {
        self.instance.dispatches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instance.dispatches.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<DispatchDesc<'a>> {
        let instance = self.instance;
        let active = instance.dispatches.get(idx)?;
        let declared = &instance.decl.dispatches[active.dispatch];
        let pipeline = &instance.desc.pipelines[usize::from(declared.pipeline)];

        Some(DispatchDesc {
            name: &declared.name,
            identifier: active.identifier,
            stage: declared.stage,
            pipeline_index: declared.pipeline,
            bytecode: &pipeline.bytecode,
            resources: &instance.resources[active.resources.clone()],
            constant_buffer: instance.constants.get(active.constants.clone()),
            grid: active.grid,
            downsample_factor: declared.downsample_factor,
            repeat_num: declared.repeat_num,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = DispatchDesc<'a>> + 'a {
        let this = *self;

        (0..this.len()).filter_map(move |idx| this.get(idx))
    }
}

/// Compute dispatch, ready to be recorded by the host.
#[derive(Clone, Copy, Debug)]
pub struct DispatchDesc<'a> {
    pub name: &'a str,
    pub identifier: Identifier,
    pub stage: Stage,

    /// Index into [`InstanceDesc::pipelines`].
    pub pipeline_index: u16,

    pub bytecode: &'a ShaderBytecode,

    /// Inputs (as [`DescriptorType::Texture`]) followed by outputs (as
    /// [`DescriptorType::StorageTexture`]).
    pub resources: &'a [ResourceDesc],

    pub constant_buffer: &'a [u8],

    /// Number of thread groups to dispatch.
    pub grid: UVec2,

    pub downsample_factor: u16,

    /// Maximum number of times this dispatch can be emitted within a frame.
    pub repeat_num: u16,
}

#[cfg(test)]
mod tests {
    use std::alloc::Layout;
    use std::collections::BTreeSet;
    use std::mem;
    use std::ptr::NonNull;
    use std::sync::atomic::{AtomicIsize, Ordering};

    use hush_gpu::CommonConstants;

    use super::*;
    use crate::{
        families, Denoiser, Family, HitDistanceReconstructionMode,
        Permutation, ReblurSettings, RelaxSettings, ResourceType,
        ShaderFormat, ShaderLibrary, SigmaSettings, StageFlags,
    };

    fn common() -> CommonSettings {
        CommonSettings {
            resource_size: uvec2(1920, 1080),
            rect_size: uvec2(1920, 1080),
            ..Default::default()
        }
    }

    fn instance(denoisers: &[Denoiser]) -> Instance {
        let desc = InstanceCreationDesc::new(
            denoisers.iter().enumerate().map(|(idx, &denoiser)| {
                DenoiserDesc {
                    identifier: Identifier(idx as u32),
                    denoiser,
                }
            }),
        );

        let mut instance =
            Instance::new(&desc, &ShaderLibrary::default()).unwrap();

        instance.set_common_settings(&common()).unwrap();
        instance
    }

    fn stages(dispatches: Dispatches) -> Vec<Stage> {
        dispatches.iter().map(|dispatch| dispatch.stage).collect()
    }

    fn frame(target: &mut Instance) -> Vec<Stage> {
        stages(target.get_compute_dispatches(&[Identifier(0)]).unwrap())
    }

    /// Identifies a pooled texture, regardless of how it's bound.
    fn key(resource: &ResourceDesc) -> (bool, u16) {
        (
            resource.ty == ResourceType::PermanentPool,
            resource.index_in_pool,
        )
    }

    fn shared_constants(dispatches: Dispatches) -> CommonConstants {
        let dispatch = dispatches
            .iter()
            .find(|dispatch| !dispatch.constant_buffer.is_empty())
            .unwrap();

        bytemuck::pod_read_unaligned(
            &dispatch.constant_buffer[..mem::size_of::<CommonConstants>()],
        )
    }

    /// Enables every optional stage a denoiser has.
    fn enable_everything(target: &mut Instance, denoiser: Denoiser) {
        let id = Identifier(0);

        match denoiser.family() {
            Family::Reblur => {
                let settings = ReblurSettings {
                    hit_distance_reconstruction_mode:
                        HitDistanceReconstructionMode::Area5x5,
                    ..Default::default()
                };

                target.set_denoiser_settings(id, settings).unwrap();
            }

            Family::Relax => {
                let settings = RelaxSettings {
                    hit_distance_reconstruction_mode:
                        HitDistanceReconstructionMode::Area5x5,
                    enable_anti_firefly: true,
                    ..Default::default()
                };

                target.set_denoiser_settings(id, settings).unwrap();
            }

            Family::Sigma | Family::Reference => (),
        }

        target
            .set_common_settings(&CommonSettings {
                split_screen: 0.5,
                enable_validation: true,
                is_history_confidence_available: true,
                is_disocclusion_threshold_mix_available: true,
                ..common()
            })
            .unwrap();
    }

    #[test]
    fn every_denoiser_dispatches() {
        for denoiser in Denoiser::ALL {
            let mut target = instance(&[denoiser]);
            let permanent_pool = target.desc().permanent_pool.len();
            let transient_pool = target.desc().transient_pool.len();

            let dispatches =
                target.get_compute_dispatches(&[Identifier(0)]).unwrap();

            assert!(!dispatches.is_empty(), "{denoiser:?}");

            for dispatch in dispatches.iter() {
                assert_eq!(Identifier(0), dispatch.identifier);

                for resource in dispatch.resources {
                    let idx = usize::from(resource.index_in_pool);

                    match resource.ty {
                        ResourceType::PermanentPool => {
                            assert!(idx < permanent_pool, "{denoiser:?}");
                        }
                        ResourceType::TransientPool => {
                            assert!(idx < transient_pool, "{denoiser:?}");
                        }
                        _ => (),
                    }
                }
            }
        }
    }

    #[test]
    fn first_frame_clears() {
        let mut target = instance(&[Denoiser::RelaxDiffuse]);
        let permanent_pool = target.desc().permanent_pool.len();

        let actual = frame(&mut target);

        assert_eq!(
            permanent_pool,
            actual.iter().filter(|&&stage| stage == Stage::Clear).count()
        );

        assert!(!frame(&mut target).contains(&Stage::Clear));

        target
            .set_common_settings(&CommonSettings {
                resource_size: uvec2(2560, 1440),
                ..common()
            })
            .unwrap();

        assert_eq!(Some(&Stage::Clear), frame(&mut target).first());
    }

    #[test]
    fn dispatch_shape() {
        let mut target = instance(&[Denoiser::SigmaShadow]);

        target.get_compute_dispatches(&[Identifier(0)]).unwrap();

        let dispatches =
            target.get_compute_dispatches(&[Identifier(0)]).unwrap();

        let tiles = dispatches.get(0).unwrap();

        assert_eq!(Stage::ClassifyTiles, tiles.stage);
        assert_eq!("SigmaShadow - ClassifyTiles", tiles.name);
        assert_eq!(16, tiles.downsample_factor);
        assert_eq!(uvec2(15, 9), tiles.grid);

        let smooth = dispatches.get(1).unwrap();

        assert_eq!(Stage::SmoothTiles, smooth.stage);
        assert_eq!(uvec2(8, 5), smooth.grid);

        let blur = dispatches.get(2).unwrap();

        assert_eq!(Stage::Blur, blur.stage);
        assert_eq!(uvec2(240, 135), blur.grid);

        assert_eq!(
            mem::size_of::<hush_gpu::SigmaConstants>()
                + mem::size_of::<BlurPassConstants>(),
            blur.constant_buffer.len()
        );

        assert!(dispatches.get(dispatches.len()).is_none());
    }

    #[test]
    fn constant_buffer_ranges() {
        let mut target = instance(&[
            Denoiser::ReblurDiffuseSpecular,
            Denoiser::RelaxDiffuseSpecular,
            Denoiser::SigmaShadow,
        ]);

        let max = target.desc().constant_buffer_max_data_size;

        let dispatches = target
            .get_compute_dispatches(&[
                Identifier(2),
                Identifier(0),
                Identifier(1),
            ])
            .unwrap();

        let mut ranges: Vec<_> = dispatches
            .iter()
            .map(|dispatch| dispatch.constant_buffer)
            .filter(|cb| !cb.is_empty())
            .map(|cb| {
                let start = cb.as_ptr() as usize;

                assert_eq!(0, start % ConstantBuffer::ALIGNMENT);
                assert!(cb.len() <= max);

                start..start + cb.len()
            })
            .collect();

        ranges.sort_by_key(|range| range.start);

        for pair in ranges.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }

        let identifiers: Vec<_> = dispatches
            .iter()
            .map(|dispatch| dispatch.identifier)
            .collect();

        assert_eq!(Some(&Identifier(2)), identifiers.first());
        assert_eq!(Some(&Identifier(1)), identifiers.last());
    }

    /// Checks that no dispatch reads a texture it writes, and that scratch
    /// textures are written before they're read.
    fn assert_hazard_free(dispatches: Dispatches) {
        let mut written = BTreeSet::new();

        for dispatch in dispatches.iter() {
            let (reads, writes): (Vec<_>, Vec<_>) = dispatch
                .resources
                .iter()
                .filter(|resource| resource.ty.is_pool())
                .partition(|resource| {
                    resource.descriptor_type == DescriptorType::Texture
                });

            for &read in &reads {
                assert!(
                    writes.iter().all(|&write| key(write) != key(read)),
                    "{}: reads and writes {:?}",
                    dispatch.name,
                    read
                );

                if read.ty == ResourceType::TransientPool {
                    assert!(
                        written.contains(&key(read)),
                        "{}: reads undefined {:?}",
                        dispatch.name,
                        read
                    );
                }
            }

            written.extend(writes.iter().map(|&write| key(write)));
        }
    }

    /// Returns settings of given denoiser with its optional stages toggled
    /// by the bits of `mask`.
    fn settings_variant(
        denoiser: Denoiser,
        mask: u32,
        atrous_iteration_num: u32,
    ) -> Option<DenoiserSettings> {
        let bit = |idx: u32| mask & (1 << idx) != 0;

        let hit_distance_reconstruction_mode = match (bit(0), bit(1)) {
            (false, _) => HitDistanceReconstructionMode::Off,
            (true, false) => HitDistanceReconstructionMode::Area3x3,
            (true, true) => HitDistanceReconstructionMode::Area5x5,
        };

        let prepass_blur_radius = if bit(2) { 30.0 } else { 0.0 };

        match denoiser.family() {
            Family::Reblur => Some(
                ReblurSettings {
                    hit_distance_reconstruction_mode,
                    diffuse_prepass_blur_radius: prepass_blur_radius,
                    specular_prepass_blur_radius: prepass_blur_radius,
                    stabilization_strength: if bit(3) { 1.0 } else { 0.0 },
                    ..Default::default()
                }
                .into(),
            ),

            Family::Relax => Some(
                RelaxSettings {
                    hit_distance_reconstruction_mode,
                    diffuse_prepass_blur_radius: prepass_blur_radius,
                    specular_prepass_blur_radius: prepass_blur_radius,
                    enable_anti_firefly: bit(3),
                    atrous_iteration_num,
                    ..Default::default()
                }
                .into(),
            ),

            Family::Sigma => Some(
                SigmaSettings {
                    max_stabilized_frame_num: if bit(3) { 5 } else { 0 },
                    ..Default::default()
                }
                .into(),
            ),

            Family::Reference => None,
        }
    }

    #[test]
    fn hazards() {
        let id = Identifier(0);

        for denoiser in Denoiser::ALL {
            let mut target = instance(&[denoiser]);

            enable_everything(&mut target, denoiser);

            for _ in 0..3 {
                assert_hazard_free(
                    target.get_compute_dispatches(&[id]).unwrap(),
                );
            }

            let atrous_iteration_nums: &[u32] =
                if denoiser.family() == Family::Relax {
                    &[2, 3, 5]
                } else {
                    &[2]
                };

            for mask in 0..(1 << 8) {
                for &atrous_iteration_num in atrous_iteration_nums {
                    let settings =
                        settings_variant(denoiser, mask, atrous_iteration_num);

                    if let Some(settings) = settings {
                        target.set_denoiser_settings(id, settings).unwrap();
                    }

                    let bit = |idx: u32| mask & (1 << idx) != 0;

                    target
                        .set_common_settings(&CommonSettings {
                            is_history_confidence_available: bit(4),
                            is_disocclusion_threshold_mix_available: bit(5),
                            split_screen: if bit(6) { 0.5 } else { 0.0 },
                            accumulation_mode: if bit(7) {
                                AccumulationMode::ClearAndRestart
                            } else {
                                AccumulationMode::Continue
                            },
                            enable_validation: true,
                            ..common()
                        })
                        .unwrap();

                    assert_hazard_free(
                        target.get_compute_dispatches(&[id]).unwrap(),
                    );
                }
            }
        }
    }

    #[test]
    fn grid_covers_extent() {
        assert_eq!(
            uvec2(240, 135),
            grid(uvec2(1920, 1080), 1, uvec2(8, 8))
        );

        assert_eq!(uvec2(1, 1), grid(uvec2(1, 1), 2, uvec2(16, 16)));
        assert_eq!(uvec2(4, 3), grid(uvec2(127, 65), 2, uvec2(16, 16)));
        assert_eq!(UVec2::ZERO, grid(UVec2::ZERO, 1, uvec2(8, 8)));

        assert_eq!(
            uvec2(536_870_912, 1),
            grid(uvec2(u32::MAX, 1), 1, uvec2(8, 8))
        );

        assert_eq!(
            uvec2(1, 268_435_456),
            grid(uvec2(1, u32::MAX), 2, uvec2(8, 8))
        );
    }

    #[test]
    fn oversized_resources_are_rejected() {
        let mut target = instance(&[Denoiser::RelaxDiffuse]);

        let size = uvec2(CommonSettings::MAX_RESOURCE_SIZE + 1, 1);

        assert_eq!(
            Err(Error::InvalidArgument("resource size must fit in 16 bits")),
            target.set_common_settings(&CommonSettings {
                resource_size: size,
                rect_size: size,
                ..common()
            })
        );

        let size = uvec2(CommonSettings::MAX_RESOURCE_SIZE, 1);

        target
            .set_common_settings(&CommonSettings {
                resource_size: size,
                rect_size: size,
                ..common()
            })
            .unwrap();

        let dispatches =
            target.get_compute_dispatches(&[Identifier(0)]).unwrap();

        for dispatch in dispatches.iter() {
            assert_eq!(1, dispatch.grid.y);
            assert!(dispatch.grid.x > 0);
        }
    }

    #[test]
    fn permutations_are_reachable() {
        for denoiser in Denoiser::ALL {
            let mut decl = Declarations::default();
            let layout = families::declare(&mut decl, denoiser).unwrap();

            for pass in &layout.passes {
                assert_eq!(
                    1 << pass.axes.len(),
                    Permutation::count(pass.axes),
                    "{denoiser:?} / {:?}",
                    pass.stage
                );
            }

            let mut reached = BTreeSet::new();
            let mut selected = Vec::new();

            for bits in 0..(1 << 8) {
                for atrous_iteration_num in [2, 3, 4] {
                    let flags = StageFlags {
                        clear: bits & 1 != 0,
                        hit_distance_reconstruction: bits & 2 != 0,
                        hit_distance_5x5: bits & 4 != 0,
                        pre_pass: bits & 8 != 0,
                        confidence: bits & 16 != 0,
                        disocclusion_mix: bits & 32 != 0,
                        temporal_stabilization: bits & 64 != 0,
                        anti_firefly: bits & 128 != 0,
                        atrous_iteration_num,
                        split_screen: 0.5,
                        validation: true,
                    };

                    selected.clear();
                    selector::select(&layout.passes, &flags, &mut selected);

                    reached.extend(selected.iter().map(|s| s.dispatch));
                }
            }

            let expected: BTreeSet<_> = layout.dispatches.clone().collect();

            assert_eq!(expected, reached, "{denoiser:?}");
        }
    }

    #[test]
    fn history_reset() {
        use AccumulationMode::*;

        let mut target = instance(&[Denoiser::ReblurDiffuse]);
        let id = [Identifier(0)];

        let accumulate = |target: &mut Instance, mode| {
            target
                .set_common_settings(&CommonSettings {
                    accumulation_mode: mode,
                    ..common()
                })
                .unwrap();

            let constants =
                shared_constants(target.get_compute_dispatches(&id).unwrap());

            (constants.is_history_reset(), constants.accumulated_frame_num())
        };

        assert_eq!((true, 0), accumulate(&mut target, Continue));
        assert_eq!((false, 1), accumulate(&mut target, Continue));
        assert_eq!((false, 2), accumulate(&mut target, Continue));
        assert_eq!((true, 0), accumulate(&mut target, Restart));
        assert_eq!((false, 1), accumulate(&mut target, Continue));

        assert!(!frame(&mut target).contains(&Stage::Clear));

        assert_eq!((true, 0), accumulate(&mut target, ClearAndRestart));

        assert_eq!((false, 1), accumulate(&mut target, Continue));
    }

    #[test]
    fn rect_change_resets_history() {
        let mut target = instance(&[Denoiser::RelaxDiffuse]);
        let id = [Identifier(0)];

        target.get_compute_dispatches(&id).unwrap();
        target.get_compute_dispatches(&id).unwrap();

        target
            .set_common_settings(&CommonSettings {
                rect_size: uvec2(960, 540),
                ..common()
            })
            .unwrap();

        let dispatches = target.get_compute_dispatches(&id).unwrap();

        assert!(shared_constants(dispatches).is_history_reset());
        assert!(!stages(dispatches).contains(&Stage::Clear));
    }

    #[test]
    fn split_screen() {
        for denoiser in Denoiser::ALL {
            let mut target = instance(&[denoiser]);

            let count = |stages: &[Stage]| {
                stages
                    .iter()
                    .filter(|&&stage| stage == Stage::SplitScreen)
                    .count()
            };

            assert_eq!(0, count(&frame(&mut target)), "{denoiser:?}");

            for split_screen in [0.25, 0.999] {
                target
                    .set_common_settings(&CommonSettings {
                        split_screen,
                        ..common()
                    })
                    .unwrap();

                let actual = frame(&mut target);

                assert_eq!(1, count(&actual), "{denoiser:?}");
                assert!(actual.len() > 1, "{denoiser:?}");

                let last = actual
                    .iter()
                    .rev()
                    .find(|&&stage| stage != Stage::Validation);

                assert_eq!(Some(&Stage::SplitScreen), last, "{denoiser:?}");
            }

            for split_screen in [1.0, 2.0] {
                target
                    .set_common_settings(&CommonSettings {
                        split_screen,
                        ..common()
                    })
                    .unwrap();

                let actual = frame(&mut target);

                assert_eq!(vec![Stage::SplitScreen], actual, "{denoiser:?}");
            }
        }
    }

    #[test]
    fn passthrough_keeps_history() {
        let mut target = instance(&[Denoiser::Reference]);
        let id = [Identifier(0)];

        target.get_compute_dispatches(&id).unwrap();

        target
            .set_common_settings(&CommonSettings {
                split_screen: 1.0,
                ..common()
            })
            .unwrap();

        target.get_compute_dispatches(&id).unwrap();
        target.get_compute_dispatches(&id).unwrap();
        target.set_common_settings(&common()).unwrap();

        let constants =
            shared_constants(target.get_compute_dispatches(&id).unwrap());

        assert_eq!(1, constants.accumulated_frame_num());
    }

    #[test]
    fn atrous_iterations() {
        let mut target = instance(&[Denoiser::RelaxDiffuseSpecular]);
        let id = Identifier(0);

        for (iterations, expected) in [(0, 2), (2, 2), (5, 5), (8, 8), (100, 8)]
        {
            let settings = RelaxSettings {
                atrous_iteration_num: iterations,
                ..Default::default()
            };

            target.set_denoiser_settings(id, settings).unwrap();

            let dispatches = target.get_compute_dispatches(&[id]).unwrap();

            let atrous: Vec<_> = dispatches
                .iter()
                .filter(|dispatch| dispatch.stage.is_atrous())
                .collect();

            assert_eq!(expected, atrous.len());
            assert_eq!(Stage::AtrousFirst, atrous[0].stage);
            assert_eq!(Stage::AtrousLast, atrous[expected - 1].stage);

            for (iteration, dispatch) in atrous.iter().enumerate() {
                let constants: AtrousPassConstants =
                    bytemuck::pod_read_unaligned(
                        &dispatch.constant_buffer[dispatch.constant_buffer.len()
                            - mem::size_of::<AtrousPassConstants>()..],
                    );

                assert_eq!(iteration as u32, constants.iteration());
                assert_eq!(iteration + 1 == expected, constants.is_last());
            }

            for dispatch in &atrous[1..expected - 1] {
                assert_eq!(Stage::Atrous, dispatch.stage);
            }
        }
    }

    #[test]
    fn atrous_passes_share_pipelines() {
        let mut target = instance(&[Denoiser::RelaxDiffuse]);
        let id = Identifier(0);

        let atrous_pipelines = target
            .desc()
            .pipelines
            .iter()
            .filter(|pipeline| pipeline.shader.name == "RELAX_Atrous")
            .count();

        assert_eq!(2, atrous_pipelines);

        let settings = RelaxSettings {
            atrous_iteration_num: 4,
            ..Default::default()
        };

        target.set_denoiser_settings(id, settings).unwrap();

        let dispatches = target.get_compute_dispatches(&[id]).unwrap();

        let atrous: Vec<_> = dispatches
            .iter()
            .filter(|dispatch| dispatch.stage.is_atrous())
            .map(|dispatch| (dispatch.stage, dispatch.pipeline_index))
            .collect();

        assert_eq!(Stage::Atrous, atrous[1].0);
        assert_eq!(Stage::Atrous, atrous[2].0);
        assert_eq!(Stage::AtrousLast, atrous[3].0);

        // Both the first middle and the last iteration read pong
        assert_eq!(atrous[1].1, atrous[3].1);
        assert_ne!(atrous[1].1, atrous[2].1);
    }

    #[test]
    fn denoiser_settings() {
        let mut target =
            instance(&[Denoiser::RelaxDiffuse, Denoiser::RelaxSpecular]);

        let atrous = |target: &mut Instance, id: Identifier| {
            target
                .get_compute_dispatches(&[id])
                .unwrap()
                .iter()
                .filter(|dispatch| dispatch.stage.is_atrous())
                .count()
        };

        let settings = RelaxSettings {
            atrous_iteration_num: 6,
            ..Default::default()
        };

        assert_eq!(
            Ok(()),
            target.set_denoiser_settings(Identifier(1), settings)
        );

        let default = RelaxSettings::default().atrous_iteration_num as usize;

        assert_eq!(default, atrous(&mut target, Identifier(0)));
        assert_eq!(6, atrous(&mut target, Identifier(1)));

        let settings = RelaxSettings {
            lobe_angle_fraction: 2.0,
            ..Default::default()
        };

        assert!(target
            .set_denoiser_settings(Identifier(1), settings)
            .is_err());

        assert_eq!(6, atrous(&mut target, Identifier(1)));
    }

    #[test]
    fn ping_pong() {
        let mut target = instance(&[Denoiser::Reference]);
        let id = [Identifier(0)];

        let history = |target: &mut Instance| {
            let dispatches = target.get_compute_dispatches(&id).unwrap();

            let accumulation = dispatches
                .iter()
                .find(|dispatch| {
                    dispatch.stage == Stage::TemporalAccumulation
                })
                .unwrap();

            (
                accumulation.resources[1].index_in_pool,
                accumulation.resources[2].index_in_pool,
            )
        };

        let (read0, write0) = history(&mut target);
        let (read1, write1) = history(&mut target);
        let (read2, write2) = history(&mut target);

        assert_ne!(read0, write0);
        assert_eq!((write0, read0), (read1, write1));
        assert_eq!((read0, write0), (read2, write2));
    }

    #[test]
    fn transient_aliasing() {
        let one = instance(&[Denoiser::ReblurDiffuse]);
        let two = instance(&[Denoiser::ReblurDiffuse, Denoiser::ReblurDiffuse]);

        assert_eq!(
            one.desc().transient_pool.len(),
            two.desc().transient_pool.len()
        );

        assert_eq!(
            2 * one.desc().permanent_pool.len(),
            two.desc().permanent_pool.len()
        );

        assert_eq!(one.desc().pipelines.len(), two.desc().pipelines.len());
    }

    #[test]
    fn descriptor_pool() {
        let target = instance(&[Denoiser::RelaxDiffuse]);
        let desc = target.desc();
        let pool = desc.descriptor_pool_desc;

        assert!(desc.pipelines.len() <= pool.sets_max_num as usize);

        assert_eq!(
            pool.sets_max_num * Sampler::ALL.len() as u32,
            pool.samplers_max_num
        );

        assert!(pool.constant_buffers_max_num < pool.sets_max_num);
        assert!(pool.textures_max_num > 0);
        assert!(pool.storage_textures_max_num > 0);

        for pipeline in &desc.pipelines {
            assert_eq!(pipeline.identifier, pipeline.shader.identifier());
            assert!(pipeline.bytecode.is_empty());
        }
    }

    #[test]
    fn shader_bytecode() {
        let mut library = ShaderLibrary::default();

        library.insert(
            ShaderFormat::Spirv,
            ShaderKey::new("Clear_f", Vec::new()),
            vec![1_u8, 2, 3],
        );

        let desc = InstanceCreationDesc::new([DenoiserDesc {
            identifier: Identifier(7),
            denoiser: Denoiser::SigmaShadow,
        }]);

        let mut target = Instance::new(&desc, &library).unwrap();

        let dispatches =
            target.get_compute_dispatches(&[Identifier(7)]).unwrap();

        for dispatch in dispatches.iter() {
            if dispatch.stage == Stage::Clear {
                assert_eq!(
                    &[1_u8, 2, 3][..],
                    dispatch.bytecode.get(ShaderFormat::Spirv)
                );

                assert!(dispatch.bytecode.get(ShaderFormat::Dxil).is_empty());
            } else {
                assert!(dispatch.bytecode.is_empty());
            }
        }
    }

    #[derive(Default)]
    struct TrackingAllocator {
        live: AtomicIsize,
    }

    impl MemoryAllocator for TrackingAllocator {
        fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            self.live.fetch_add(1, Ordering::SeqCst);
            SystemAllocator.allocate(layout)
        }

        unsafe fn reallocate(
            &self,
            ptr: NonNull<u8>,
            layout: Layout,
            new_size: usize,
        ) -> Option<NonNull<u8>> {
            SystemAllocator.reallocate(ptr, layout, new_size)
        }

        unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
            self.live.fetch_sub(1, Ordering::SeqCst);
            SystemAllocator.free(ptr, layout);
        }
    }

    #[test]
    fn custom_allocator() {
        let allocator = Arc::new(TrackingAllocator::default());

        let desc = InstanceCreationDesc::new([DenoiserDesc {
            identifier: Identifier(0),
            denoiser: Denoiser::RelaxDiffuse,
        }])
        .with_allocator(allocator.clone());

        let mut target =
            Instance::new(&desc, &ShaderLibrary::default()).unwrap();

        assert_eq!(0, allocator.live.load(Ordering::SeqCst));

        target.get_compute_dispatches(&[Identifier(0)]).unwrap();
        target.get_compute_dispatches(&[Identifier(0)]).unwrap();

        assert_eq!(1, allocator.live.load(Ordering::SeqCst));

        drop(target);

        assert_eq!(0, allocator.live.load(Ordering::SeqCst));
    }

    /// Allocator whose memory has run out.
    struct ExhaustedAllocator;

    impl MemoryAllocator for ExhaustedAllocator {
        fn allocate(&self, _: Layout) -> Option<NonNull<u8>> {
            None
        }

        unsafe fn reallocate(
            &self,
            _: NonNull<u8>,
            _: Layout,
            _: usize,
        ) -> Option<NonNull<u8>> {
            None
        }

        unsafe fn free(&self, _: NonNull<u8>, _: Layout) {
            unreachable!();
        }
    }

    #[test]
    fn out_of_memory() {
        let desc = InstanceCreationDesc::new([DenoiserDesc {
            identifier: Identifier(0),
            denoiser: Denoiser::RelaxDiffuse,
        }])
        .with_allocator(Arc::new(ExhaustedAllocator));

        let mut target =
            Instance::new(&desc, &ShaderLibrary::default()).unwrap();

        assert!(matches!(
            target.get_compute_dispatches(&[Identifier(0)]),
            Err(Error::OutOfMemory(_))
        ));
    }

    #[test]
    fn errors() {
        let library = ShaderLibrary::default();

        assert_eq!(
            Some(Error::NoDenoisers),
            Instance::new(&Default::default(), &library).err()
        );

        let desc = InstanceCreationDesc::new([
            DenoiserDesc {
                identifier: Identifier(1),
                denoiser: Denoiser::SigmaShadow,
            },
            DenoiserDesc {
                identifier: Identifier(1),
                denoiser: Denoiser::Reference,
            },
        ]);

        assert_eq!(
            Some(Error::DuplicateIdentifier(Identifier(1))),
            Instance::new(&desc, &library).err()
        );

        let mut target = instance(&[Denoiser::SigmaShadow]);

        assert_eq!(
            Err(Error::InvalidSettings {
                identifier: Identifier(0),
                expected: Family::Sigma,
                given: Family::Relax,
            }),
            target
                .set_denoiser_settings(Identifier(0), RelaxSettings::default())
        );

        assert_eq!(
            Err(Error::UnknownIdentifier(Identifier(5))),
            target
                .set_denoiser_settings(Identifier(5), SigmaSettings::default())
        );

        assert_eq!(
            Some(Error::UnknownIdentifier(Identifier(5))),
            target.get_compute_dispatches(&[Identifier(5)]).err()
        );

        assert_eq!(
            Some(Error::DuplicateIdentifier(Identifier(0))),
            target
                .get_compute_dispatches(&[Identifier(0), Identifier(0)])
                .err()
        );

        assert!(target
            .set_common_settings(&CommonSettings {
                rect_size: uvec2(4096, 4096),
                ..common()
            })
            .is_err());
    }
}
