use std::alloc::Layout;
use std::ops::Range;
use std::ptr::NonNull;
use std::sync::Arc;
use std::{fmt, slice};

use glam::{vec2, vec3, vec4, Mat4, UVec2, Vec2, Vec4, Vec4Swizzles};
use hush_gpu::{CommonConstants, Word};

use crate::{CommonSettings, Error, MemoryAllocator, Result};

/// Scratch buffer holding constant data of all dispatches of a frame.
///
/// Every pushed block starts at a 16-byte boundary (with the gap zeroed) and
/// blocks never overlap; the buffer is rewound at the beginning of every
/// frame, reusing its memory.
pub struct ConstantBuffer {
    allocator: Arc<dyn MemoryAllocator>,
    ptr: Option<NonNull<u8>>,
    capacity: usize,
    len: usize,
}

impl ConstantBuffer {
    pub const ALIGNMENT: usize = 16;

    const MIN_CAPACITY: usize = 256;

    pub fn new(allocator: Arc<dyn MemoryAllocator>) -> Self {
        Self {
            allocator,
            ptr: None,
            capacity: 0,
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends given chunks as a single block and returns its range.
    pub fn push(&mut self, chunks: &[&[u8]]) -> Result<Range<usize>> {
        let size: usize = chunks.iter().map(|chunk| chunk.len()).sum();

        if size == 0 {
            return Ok(self.len..self.len);
        }

        let start = align_up(self.len, Self::ALIGNMENT);
        let end = start + size;

        let ptr = self.reserve(end)?;

        // Safety: `reserve()` has made room for `end` bytes
        unsafe {
            ptr.as_ptr().add(self.len).write_bytes(0, start - self.len);

            let mut offset = start;

            for chunk in chunks {
                ptr.as_ptr()
                    .add(offset)
                    .copy_from_nonoverlapping(chunk.as_ptr(), chunk.len());

                offset += chunk.len();
            }
        }

        self.len = end;

        Ok(start..end)
    }

    pub fn get(&self, range: Range<usize>) -> &[u8] {
        debug_assert!(range.end <= self.len);

        match self.ptr {
            Some(ptr) if !range.is_empty() => {
                // Safety: `range` has been returned by `push()`, so it's
                // initialized and within the allocation
                unsafe {
                    slice::from_raw_parts(
                        ptr.as_ptr().add(range.start),
                        range.len(),
                    )
                }
            }

            _ => &[],
        }
    }

    fn reserve(&mut self, required: usize) -> Result<NonNull<u8>> {
        if let Some(ptr) = self.ptr {
            if required <= self.capacity {
                return Ok(ptr);
            }
        }

        let capacity = required
            .checked_next_power_of_two()
            .ok_or(Error::OutOfMemory(required))?
            .max(Self::MIN_CAPACITY);

        let layout = Layout::from_size_align(capacity, Self::ALIGNMENT)
            .map_err(|_| Error::OutOfMemory(capacity))?;

        let ptr = match self.ptr {
            Some(ptr) => unsafe {
                // Safety: `ptr` has been allocated with `self.layout()`
                self.allocator.reallocate(ptr, self.layout(), capacity)
            },

            None => self.allocator.allocate(layout),
        };

        let ptr = ptr.ok_or(Error::OutOfMemory(capacity))?;

        log::debug!("Constant buffer resized: {} bytes", capacity);

        self.ptr = Some(ptr);
        self.capacity = capacity;

        Ok(ptr)
    }

    fn layout(&self) -> Layout {
        // Safety: `self.capacity` has passed `Layout::from_size_align()`
        // during `reserve()`
        unsafe {
            Layout::from_size_align_unchecked(self.capacity, Self::ALIGNMENT)
        }
    }
}

impl Drop for ConstantBuffer {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            // Safety: `ptr` has been allocated with `self.layout()`
            unsafe {
                self.allocator.free(ptr, self.layout());
            }
        }
    }
}

impl fmt::Debug for ConstantBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstantBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .finish()
    }
}

// Safety: the buffer exclusively owns its allocation, and the allocator is
// `Send + Sync`
unsafe impl Send for ConstantBuffer {}
unsafe impl Sync for ConstantBuffer {}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) / alignment * alignment
}

/// History-related state of a denoiser for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryState {
    pub is_reset: bool,
    pub accumulated_frame_num: u32,
}

/// Derives constants shared by all passes of all denoiser families.
pub fn common_constants(
    settings: &CommonSettings,
    history: HistoryState,
) -> CommonConstants {
    let world_to_clip = settings.view_to_clip * settings.world_to_view;

    let world_to_clip_prev =
        settings.view_to_clip_prev * settings.world_to_view_prev;

    let camera_delta = {
        let pos = settings.world_to_view.inverse().w_axis.xyz();

        let pos_prev = settings.world_to_view_prev.inverse().w_axis.xyz();
        let pos_prev = settings.world_prev_to_world.transform_point3(pos_prev);

        (pos - pos_prev).extend(0.0)
    };

    let jitter_delta =
        (settings.camera_jitter - settings.camera_jitter_prev).length();

    let disocclusion_threshold_bonus = if settings.rect_size.y > 0 {
        (1.0 + jitter_delta) / (settings.rect_size.y as f32)
    } else {
        0.0
    };

    let mut features = 0_u32;

    if settings.is_motion_vector_in_world_space {
        features |= CommonConstants::FEATURE_MV_IN_WORLD_SPACE;
    }

    if settings.is_history_confidence_available {
        features |= CommonConstants::FEATURE_HISTORY_CONFIDENCE;
    }

    if settings.is_disocclusion_threshold_mix_available {
        features |= CommonConstants::FEATURE_DISOCCLUSION_THRESHOLD_MIX;
    }

    if settings.enable_validation {
        features |= CommonConstants::FEATURE_VALIDATION;
    }

    CommonConstants {
        view_to_clip: settings.view_to_clip,
        world_to_view: settings.world_to_view,
        world_to_view_prev: settings.world_to_view_prev,
        world_to_clip,
        world_to_clip_prev,
        world_prev_to_world: settings.world_prev_to_world,
        frustum: frustum(settings.view_to_clip),
        frustum_prev: frustum(settings.view_to_clip_prev),
        camera_delta,
        mv_scale: settings
            .motion_vector_scale
            .extend(settings.is_motion_vector_in_world_space.to_word()),
        resource_size: size_and_inverse(settings.resource_size),
        rect_size: size_and_inverse(settings.rect_size),
        rect_prev: vec4(
            settings.rect_size_prev.x as f32,
            settings.rect_size_prev.y as f32,
            settings.rect_origin.x as f32,
            settings.rect_origin.y as f32,
        ),
        resolution_scale: {
            let curr = ratio(settings.rect_size, settings.resource_size);

            let prev =
                ratio(settings.rect_size_prev, settings.resource_size_prev);

            vec4(curr.x, curr.y, prev.x, prev.y)
        },
        jitter: vec4(
            settings.camera_jitter.x,
            settings.camera_jitter.y,
            jitter_delta,
            settings.debug,
        ),
        thresholds: vec4(
            settings.disocclusion_threshold + disocclusion_threshold_bonus,
            settings.disocclusion_threshold_alternate
                + disocclusion_threshold_bonus,
            settings.denoising_range,
            settings.split_screen,
        ),
        frame: vec4(
            settings.frame_index.to_word(),
            history.accumulated_frame_num.to_word(),
            history.is_reset.to_word(),
            features.to_word(),
        ),
    }
}

/// Returns the top-left corner and size of the view frustum at depth 1.
fn frustum(view_to_clip: Mat4) -> Vec4 {
    let clip_to_view = view_to_clip.inverse();

    let corner = |x, y| {
        let point = clip_to_view.project_point3(vec3(x, y, 0.5));

        if point.z.abs() > f32::EPSILON {
            point.truncate() / point.z.abs()
        } else {
            point.truncate()
        }
    };

    let top_left = corner(-1.0, 1.0);
    let bottom_right = corner(1.0, -1.0);

    let size = bottom_right - top_left;

    vec4(top_left.x, top_left.y, size.x, size.y)
}

fn size_and_inverse(size: UVec2) -> Vec4 {
    let size = size.as_vec2();

    vec4(size.x, size.y, inverse(size.x), inverse(size.y))
}

fn ratio(a: UVec2, b: UVec2) -> Vec2 {
    let a = a.as_vec2();
    let b = b.as_vec2();

    vec2(a.x * inverse(b.x), a.y * inverse(b.y))
}

fn inverse(value: f32) -> f32 {
    if value > 0.0 {
        1.0 / value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::alloc::Layout;
    use std::f32::consts::FRAC_PI_2;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use approx::assert_relative_eq;
    use glam::uvec2;

    use super::*;
    use crate::SystemAllocator;

    #[derive(Default)]
    struct CountingAllocator {
        allocations: AtomicUsize,
        reallocations: AtomicUsize,
        frees: AtomicUsize,
    }

    impl MemoryAllocator for CountingAllocator {
        fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
            self.allocations.fetch_add(1, Ordering::SeqCst);
            SystemAllocator.allocate(layout)
        }

        unsafe fn reallocate(
            &self,
            ptr: NonNull<u8>,
            layout: Layout,
            new_size: usize,
        ) -> Option<NonNull<u8>> {
            self.reallocations.fetch_add(1, Ordering::SeqCst);
            SystemAllocator.reallocate(ptr, layout, new_size)
        }

        unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
            self.frees.fetch_add(1, Ordering::SeqCst);
            SystemAllocator.free(ptr, layout);
        }
    }

    #[test]
    fn constant_buffer() {
        let allocator = Arc::new(CountingAllocator::default());
        let mut target = ConstantBuffer::new(allocator.clone());

        assert_eq!(Ok(0..0), target.push(&[]));
        assert!(target.is_empty());
        assert_eq!(0, allocator.allocations.load(Ordering::SeqCst));

        let a = target.push(&[&[1, 2, 3]]).unwrap();
        let b = target.push(&[&[4, 5], &[6]]).unwrap();
        let c = target.push(&[&[7; 300]]).unwrap();

        assert_eq!(0..3, a);
        assert_eq!(16..19, b);
        assert_eq!(32..332, c);
        assert_eq!(332, target.len());

        assert_eq!(&[1, 2, 3], target.get(a.clone()));
        assert_eq!(&[4, 5, 6], target.get(b));
        assert_eq!(&[7; 300][..], target.get(c));
        assert_eq!(&[0; 13][..], target.get(3..16));

        assert_eq!(1, allocator.allocations.load(Ordering::SeqCst));
        assert_eq!(1, allocator.reallocations.load(Ordering::SeqCst));

        target.clear();

        assert!(target.is_empty());
        assert_eq!(Ok(a.clone()), target.push(&[&[9, 9, 9]]));
        assert_eq!(&[9, 9, 9], target.get(a));
        assert_eq!(1, allocator.reallocations.load(Ordering::SeqCst));

        drop(target);

        assert_eq!(1, allocator.frees.load(Ordering::SeqCst));
    }

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
    fn constant_buffer_out_of_memory() {
        let mut target = ConstantBuffer::new(Arc::new(ExhaustedAllocator));

        assert_eq!(Ok(0..0), target.push(&[]));

        assert_eq!(
            Err(Error::OutOfMemory(ConstantBuffer::MIN_CAPACITY)),
            target.push(&[&[1, 2, 3]])
        );

        assert!(target.is_empty());
        assert_eq!(&[0_u8; 0][..], target.get(0..0));

        assert_eq!(
            Err(Error::OutOfMemory(usize::MAX)),
            target.reserve(usize::MAX)
        );
    }

    #[test]
    fn thresholds() {
        let settings = CommonSettings {
            rect_size: uvec2(100, 50),
            resource_size: uvec2(200, 100),
            camera_jitter: vec2(0.3, 0.4),
            ..Default::default()
        };

        let target = common_constants(&settings, Default::default());

        // jitter delta = 0.5; bonus = 1.5 / 50
        assert_relative_eq!(0.5, target.jitter.z);
        assert_relative_eq!(0.01 + 0.03, target.disocclusion_threshold());
        assert_relative_eq!(
            0.05 + 0.03,
            target.disocclusion_threshold_alternate()
        );
        assert_relative_eq!(0.5, target.resolution_scale.x);
        assert_relative_eq!(0.0, target.resolution_scale.z);
        assert_relative_eq!(0.01, target.rect_size.z);
    }

    #[test]
    fn history() {
        let settings = CommonSettings {
            frame_index: 123,
            enable_validation: true,
            ..Default::default()
        };

        let target = common_constants(
            &settings,
            HistoryState {
                is_reset: true,
                accumulated_frame_num: 0,
            },
        );

        assert_eq!(123, target.frame_index());
        assert_eq!(0, target.accumulated_frame_num());
        assert!(target.is_history_reset());
        assert_eq!(CommonConstants::FEATURE_VALIDATION, target.features());

        // Degenerate sizes don't produce infinities
        assert_eq!(Vec4::ZERO, target.rect_size);
        assert_relative_eq!(0.01, target.disocclusion_threshold());
    }

    #[test]
    fn frustum() {
        let target =
            super::frustum(Mat4::perspective_rh(FRAC_PI_2, 1.0, 0.1, 100.0));

        assert_relative_eq!(-1.0, target.x, epsilon = 1e-4);
        assert_relative_eq!(1.0, target.y, epsilon = 1e-4);
        assert_relative_eq!(2.0, target.z, epsilon = 1e-4);
        assert_relative_eq!(-2.0, target.w, epsilon = 1e-4);
    }
}
