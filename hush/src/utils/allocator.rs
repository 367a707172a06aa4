use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Source of the memory Hush allocates per frame.
pub trait MemoryAllocator: Send + Sync {
    /// Allocates a block of memory fitting `layout`; returns `None` on
    /// failure.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Grows or shrinks a block, preserving its contents up to the smaller of
    /// both sizes.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `layout`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `layout`, and
    /// must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

/// [`MemoryAllocator`] backed by the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl MemoryAllocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }

        // Safety: `layout` is not zero-sized
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if new_size == 0 {
            return None;
        }

        NonNull::new(alloc::realloc(ptr.as_ptr(), layout, new_size))
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}
