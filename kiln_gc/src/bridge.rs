//! Bridge to the host's unmanaged allocator.
//!
//! The collector never allocates backing memory itself. Both the managed
//! arena and the registry's map storage are acquired once, at startup,
//! through this callback pair. Embedders running on a custom allocator
//! (dlmalloc, a pool, a static buffer) install their own functions here.

use std::alloc::Layout;

/// Allocation callback. Must return memory satisfying `layout`, or null.
pub type AllocFn = unsafe fn(Layout) -> *mut u8;

/// Deallocation callback. Receives the pointer and layout from the
/// matching [`AllocFn`] call.
pub type FreeFn = unsafe fn(*mut u8, Layout);

/// Host-supplied allocate/free pair for all unmanaged storage.
///
/// The default bridge forwards to `std::alloc` with zeroed allocation,
/// which is what the arena assumes for fresh memory.
#[derive(Clone, Copy, Debug)]
pub struct UnmanagedAlloc {
    /// Acquire a buffer.
    pub alloc: AllocFn,
    /// Release a buffer acquired through `alloc`.
    pub free: FreeFn,
}

unsafe fn std_alloc(layout: Layout) -> *mut u8 {
    std::alloc::alloc_zeroed(layout)
}

unsafe fn std_free(ptr: *mut u8, layout: Layout) {
    std::alloc::dealloc(ptr, layout)
}

impl Default for UnmanagedAlloc {
    fn default() -> Self {
        Self {
            alloc: std_alloc,
            free: std_free,
        }
    }
}
