//! Reflective type descriptors.
//!
//! A descriptor is an ordinary managed object carrying a registered
//! type's identity. It is built lazily on the first `get_type` query,
//! cached in the interface map, and registered as an implicit root, so
//! once materialized it is never reclaimed.

use kiln_gc::Marker;

use crate::map::{TypeHandle, TypeId};

/// Reflective identity of a registered type.
///
/// Lives in the managed arena; exempt from reclamation once created.
#[repr(C)]
pub struct TypeDescriptor {
    id: TypeId,
    object_size: u32,
    name: &'static str,
}

impl TypeDescriptor {
    pub(crate) fn new(handle: TypeHandle) -> Self {
        Self {
            id: handle.type_id(),
            object_size: handle.object_size() as u32,
            name: handle.name(),
        }
    }

    /// The described type's process-wide identifier.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Payload size of the described type's instances.
    #[inline]
    pub fn object_size(&self) -> usize {
        self.object_size as usize
    }

    /// The registered type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Descriptors hold no managed references.
pub(crate) unsafe fn descriptor_trace(_object: *mut u8, _marker: &mut Marker<'_>) {}
