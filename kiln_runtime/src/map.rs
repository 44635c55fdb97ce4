//! Interface maps and type handles.
//!
//! Every registered concrete type owns exactly one [`InterfaceMap`],
//! created at registration, immutable afterwards (the cached descriptor
//! cell aside), and stored for the process lifetime in the registry's
//! buffer. The map's address doubles as the type's identity: object
//! headers store it as their only type tag, and the collector reads its
//! leading [`TraceHooks`].
//!
//! Capability dispatch sits on every interface-typed call and every
//! type-safety check, so [`TypeHandle::implements`] resolves through a
//! frozen open-addressed probe table in near-constant time, touching no
//! locks and no registry state.

use kiln_gc::{TraceHooks, Marker};
use std::cell::Cell;
use std::num::NonZeroU32;
use std::ptr::NonNull;

use crate::descriptor::TypeDescriptor;

/// Process-wide unique identifier of a registered concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// Raw numeric value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Process-wide unique identifier of a declared capability set.
///
/// Non-zero so the probe table can use zero as its empty marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId(pub(crate) NonZeroU32);

impl CapabilityId {
    /// Raw numeric value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

/// Opaque pointer to a generator-emitted dispatch table.
pub type DispatchTable = NonNull<()>;

/// One probe-table slot: capability id (zero when empty) and its
/// dispatch table.
#[repr(C)]
pub(crate) struct CapSlot {
    pub cap: u32,
    pub table: *const (),
}

/// Per-type registry entry.
///
/// `#[repr(C)]` with the trace hooks first: the collector reaches them
/// through the object header without knowing this layout.
#[repr(C)]
pub struct InterfaceMap {
    pub(crate) hooks: TraceHooks,
    pub(crate) type_id: TypeId,
    pub(crate) object_size: u32,
    /// Probe table length minus one; length is a power of two.
    pub(crate) slot_mask: u32,
    pub(crate) name: &'static str,
    /// Frozen capability table, in registry storage.
    pub(crate) slots: *const CapSlot,
    /// Lazily created reflective descriptor; null until first queried.
    pub(crate) descriptor: Cell<*mut TypeDescriptor>,
}

impl InterfaceMap {
    fn lookup(&self, cap: CapabilityId) -> Option<DispatchTable> {
        let mask = self.slot_mask as usize;
        let mut index = cap.raw() as usize & mask;
        loop {
            // The table is never full, so an empty slot terminates
            // every probe sequence.
            let slot = unsafe { &*self.slots.add(index) };
            if slot.cap == cap.raw() {
                return NonNull::new(slot.table as *mut ());
            }
            if slot.cap == 0 {
                return None;
            }
            index = (index + 1) & mask;
        }
    }
}

/// Copyable handle to a registered type's interface map.
///
/// Valid until registry teardown; generated code stores one per concrete
/// type and hands it to the allocator as the object's type tag.
#[derive(Clone, Copy)]
pub struct TypeHandle(pub(crate) NonNull<InterfaceMap>);

impl TypeHandle {
    #[inline]
    fn map(&self) -> &InterfaceMap {
        unsafe { self.0.as_ref() }
    }

    /// The type's process-wide identifier.
    #[inline]
    pub fn type_id(self) -> TypeId {
        self.map().type_id
    }

    /// The registered type name.
    #[inline]
    pub fn name(self) -> &'static str {
        self.map().name
    }

    /// Payload size of the type's instances in bytes.
    #[inline]
    pub fn object_size(self) -> usize {
        self.map().object_size as usize
    }

    /// The collector-visible view of this map, stored in object headers.
    #[inline]
    pub fn hooks_ptr(self) -> *const TraceHooks {
        self.0.as_ptr() as *const TraceHooks
    }

    /// Resolve a capability to its dispatch table.
    ///
    /// Present iff the capability was declared at registration, directly
    /// or transitively through a declared base.
    #[inline]
    pub fn implements(self, cap: CapabilityId) -> Option<DispatchTable> {
        self.map().lookup(cap)
    }

    pub(crate) fn descriptor(self) -> Option<NonNull<TypeDescriptor>> {
        NonNull::new(self.map().descriptor.get())
    }

    pub(crate) fn set_descriptor(self, descriptor: *mut TypeDescriptor) {
        self.map().descriptor.set(descriptor);
    }

    pub(crate) fn capability_slots(self) -> &'static [CapSlot] {
        let map = self.map();
        let len = map.slot_mask as usize + 1;
        unsafe { std::slice::from_raw_parts(map.slots, len) }
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for TypeHandle {}

impl std::fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandle")
            .field("name", &self.name())
            .field("type_id", &self.type_id())
            .finish()
    }
}

/// Leaf trace for types without reference fields.
pub unsafe fn leaf_trace(_object: *mut u8, _marker: &mut Marker<'_>) {}

#[cfg(test)]
mod tests {
    use super::*;

    // Map construction is exercised through the registry; only the
    // layout contract is checked here.
    #[test]
    fn test_hooks_are_first() {
        assert_eq!(std::mem::offset_of!(InterfaceMap, hooks), 0);
    }
}
