//! Allocator interface consumed by the table core.
//!
//! A table keeps every byte it owns (flag words, keys, values, cached
//! hashes) inside regions obtained from a [`MemPool`]. Passing no pool means
//! the process heap. Implementations must not return on allocation failure;
//! the default one aborts through [`handle_alloc_error`].

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc::{self, handle_alloc_error};

/// A source of raw memory regions.
///
/// One pool may back many tables. The core calls it under the table's
/// single-threaded access pattern only, but a pool is shared by-reference
/// (`&'static`), so it must be `Sync`.
pub trait MemPool: Sync {
    /// Allocate a zero-initialized region.
    fn alloc(&self, layout: Layout) -> NonNull<u8>;

    /// Allocate an uninitialized region.
    fn alloc_raw(&self, layout: Layout) -> NonNull<u8>;

    /// Grow or shrink a region, preserving its contents up to
    /// `min(layout.size(), new_size)`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this pool with exactly `layout`, and `new_size`
    /// must be nonzero and not overflow `isize` when rounded to alignment.
    unsafe fn realloc(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> NonNull<u8>;

    /// Return a region to the pool.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this pool with exactly `layout`.
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process heap, via `std::alloc`.
pub struct HeapPool;

/// Shared instance used when a table is built without an explicit pool.
pub static HEAP: HeapPool = HeapPool;

impl MemPool for HeapPool {
    #[inline]
    fn alloc(&self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() > 0);
        NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
            .unwrap_or_else(|| handle_alloc_error(layout))
    }

    #[inline]
    fn alloc_raw(&self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() > 0);
        NonNull::new(unsafe { alloc::alloc(layout) }).unwrap_or_else(|| handle_alloc_error(layout))
    }

    #[inline]
    unsafe fn realloc(&self, ptr: NonNull<u8>, layout: Layout, new_size: usize) -> NonNull<u8> {
        debug_assert!(new_size > 0);
        NonNull::new(alloc::realloc(ptr.as_ptr(), layout, new_size)).unwrap_or_else(|| {
            handle_alloc_error(Layout::from_size_align_unchecked(new_size, layout.align()))
        })
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: NonNull<u8>, layout: Layout) {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}
