//! Managed object header and the per-type trace dispatch contract.
//!
//! Every allocation in the arena is preceded by a fixed 16-byte header.
//! The `map` field points at the object's registry entry and is its only
//! type tag; the collector reads the entry's leading [`TraceHooks`] to
//! dispatch tracing and finalization without knowing concrete types.
//! The code generator supplies the hook functions per registered type;
//! the runtime never synthesizes them.

use crate::trace::Marker;
use std::mem;

/// Size of the header preceding every managed payload.
pub const HEADER_SIZE: usize = 16;

/// Per-type trace function.
///
/// Called with a pointer to the object payload during the tracing phase.
/// The implementation must call [`Marker::mark`] for every reference
/// field the object exposes. Types with no outgoing references are trace
/// leaves and do nothing.
///
/// # Safety
///
/// - `object` points to a live payload of the function's type
/// - the function must not allocate or trigger a collection
pub type TraceFn = unsafe fn(object: *mut u8, marker: &mut Marker<'_>);

/// Optional per-type destruction hook, run at sweep time before the slot
/// is reused.
///
/// # Safety
///
/// - `object` points to a payload that is about to be reclaimed
/// - the hook must not allocate; other objects reclaimed in the same
///   cycle may already be gone
pub type FinalizeFn = unsafe fn(object: *mut u8);

/// Collector-visible prefix of a registry entry.
///
/// The `map` pointer stored in each object header addresses one of
/// these; whatever the registry appends after it is opaque to the
/// collector.
#[repr(C)]
pub struct TraceHooks {
    /// Visits the object's reference fields.
    pub trace: TraceFn,
    /// Runs before the object's slot is reclaimed.
    pub finalize: Option<FinalizeFn>,
}

/// Header preceding every managed payload in the arena.
#[repr(C)]
pub struct ObjectHeader {
    map: *const TraceHooks,
    mark: u8,
    _pad: [u8; 3],
    /// Total block size, header included. The sweep uses this to
    /// coalesce reclaimed slots.
    size: u32,
}

// The allocator and the conservative scanner both assume this layout.
const _: () = assert!(mem::size_of::<ObjectHeader>() == HEADER_SIZE);
const _: () = assert!(mem::align_of::<ObjectHeader>() <= crate::arena::ALIGN);

impl ObjectHeader {
    /// Locate the header of a payload pointer.
    ///
    /// # Safety
    ///
    /// `payload` must point at the start of a managed allocation.
    #[inline]
    pub unsafe fn of(payload: *mut u8) -> *mut ObjectHeader {
        payload.sub(HEADER_SIZE) as *mut ObjectHeader
    }

    pub(crate) fn init(&mut self, map: *const TraceHooks, mark: u8, size: u32) {
        self.map = map;
        self.mark = mark;
        self._pad = [0; 3];
        self.size = size;
    }

    /// The object's registry entry; its only type tag.
    #[inline]
    pub fn map(&self) -> *const TraceHooks {
        self.map
    }

    /// Replace the registry entry pointer.
    ///
    /// Only the registry bootstrap does this: the system type's first
    /// instance is constructed before its own map exists and is patched
    /// afterwards.
    #[inline]
    pub fn set_map(&mut self, map: *const TraceHooks) {
        self.map = map;
    }

    /// Generation stamp from the last cycle that reached this object.
    #[inline]
    pub fn mark(&self) -> u8 {
        self.mark
    }

    #[inline]
    pub(crate) fn set_mark(&mut self, mark: u8) {
        self.mark = mark;
    }

    /// Total block size in bytes, header included.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }
}
