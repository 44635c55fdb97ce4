//! Process-wide interface/type registry.
//!
//! The registry gives every concrete type a stable identity and lets
//! one object dispatch through arbitrarily many independently declared
//! capability sets, without multi-rooted inheritance: "is-instance-of"
//! is a probe-table lookup, never a pointer-chain walk.
//!
//! Registration happens once, in dependency order, before any managed
//! allocation; afterwards the tables are append-only and read without
//! locking on the hot path. Interface maps and their capability tables
//! live in a dedicated non-collected arena sized by the host
//! configuration, so they survive untouched for the process lifetime.

use kiln_gc::{Arena, FinalizeFn, GcManager, TraceFn, TraceHooks, UnmanagedAlloc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cell::Cell;
use std::mem;
use std::num::NonZeroU32;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::descriptor::{descriptor_trace, TypeDescriptor};
use crate::map::{CapSlot, CapabilityId, DispatchTable, InterfaceMap, TypeHandle, TypeId};

/// Name of the bootstrap reflective type.
pub const SYSTEM_TYPE_NAME: &str = "system.Type";

/// Everything the code generator supplies when registering a type.
pub struct TypeSpec<'a> {
    /// Unique type name; registering the same name twice is fatal.
    pub name: &'static str,
    /// Payload size of instances in bytes.
    pub object_size: u32,
    /// Generated trace function visiting the type's reference fields.
    pub trace: TraceFn,
    /// Optional destruction hook run at sweep time.
    pub finalize: Option<FinalizeFn>,
    /// Base type whose capability table is inherited. Must already be
    /// registered.
    pub extends: Option<TypeHandle>,
    /// Directly declared capabilities and their dispatch tables.
    pub capabilities: &'a [(CapabilityId, DispatchTable)],
}

/// Process-wide type and capability registry.
///
/// One explicit object with an init/teardown lifecycle; dropping it
/// releases the map buffer through the bridge and invalidates every
/// handle it issued.
pub struct Registry {
    /// Backing storage for interface maps and capability tables.
    storage: Arena,
    /// Name index for duplicate detection and lookup.
    types: RwLock<FxHashMap<&'static str, TypeHandle>>,
    /// Capability name to id.
    capabilities: RwLock<FxHashMap<&'static str, CapabilityId>>,
    /// Declared base capabilities per capability.
    capability_bases: RwLock<FxHashMap<u32, SmallVec<[CapabilityId; 4]>>>,
    next_type_id: AtomicU32,
    next_capability_id: AtomicU32,
    /// Bootstrap type backing all descriptors; set once during setup.
    system_type: Cell<Option<TypeHandle>>,
}

impl Registry {
    /// Reserve `storage_size` bytes of map storage through the bridge.
    pub fn new(storage_size: usize, bridge: UnmanagedAlloc) -> Self {
        Self {
            storage: Arena::new(storage_size, bridge),
            types: RwLock::new(FxHashMap::default()),
            capabilities: RwLock::new(FxHashMap::default()),
            capability_bases: RwLock::new(FxHashMap::default()),
            next_type_id: AtomicU32::new(0),
            next_capability_id: AtomicU32::new(1),
            system_type: Cell::new(None),
        }
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    /// Declare a capability set, assigning it a process-wide id.
    ///
    /// Base capabilities must already be declared (dependency order).
    /// Re-declaring a name with the same bases returns the existing id;
    /// with different bases it panics, since two generators disagreeing
    /// about a capability is a code-generation defect.
    pub fn declare_capability(
        &self,
        name: &'static str,
        extends: &[CapabilityId],
    ) -> CapabilityId {
        let mut capabilities = self.capabilities.write();
        if let Some(&existing) = capabilities.get(name) {
            let bases = self.capability_bases.read();
            let known = bases.get(&existing.raw()).expect("declared capability has bases");
            assert!(
                known.as_slice() == extends,
                "capability '{}' redeclared with different bases",
                name
            );
            return existing;
        }

        let raw = self.next_capability_id.fetch_add(1, Ordering::Relaxed);
        let id = CapabilityId(NonZeroU32::new(raw).expect("capability id overflow"));
        capabilities.insert(name, id);
        self.capability_bases
            .write()
            .insert(id.raw(), SmallVec::from_slice(extends));
        id
    }

    /// Look up a declared capability by name.
    pub fn capability(&self, name: &str) -> Option<CapabilityId> {
        self.capabilities.read().get(name).copied()
    }

    // =========================================================================
    // Type registration
    // =========================================================================

    /// Register a concrete type, returning its permanent handle.
    ///
    /// Called once per type by generated bootstrap code, in dependency
    /// order. The declared capability set is flattened transitively
    /// (declared bases, then the base type's table; the first entry for
    /// a capability wins) and frozen. Registering the same type twice is
    /// fatal: it signals a code-generation defect.
    pub fn register_object(&self, spec: TypeSpec<'_>) -> TypeHandle {
        let mut types = self.types.write();
        assert!(
            !types.contains_key(spec.name),
            "type '{}' registered twice",
            spec.name
        );

        let entries = self.flatten_capabilities(&spec);
        let slots = self.freeze_slots(&entries);

        let type_id = TypeId(self.next_type_id.fetch_add(1, Ordering::Relaxed));
        let map = InterfaceMap {
            hooks: TraceHooks {
                trace: spec.trace,
                finalize: spec.finalize,
            },
            type_id,
            object_size: spec.object_size,
            slot_mask: (slots.1 - 1) as u32,
            name: spec.name,
            slots: slots.0,
            descriptor: Cell::new(ptr::null_mut()),
        };

        let map_ptr = self.storage_alloc(mem::size_of::<InterfaceMap>()) as *mut InterfaceMap;
        unsafe { ptr::write(map_ptr, map) };

        let handle = TypeHandle(NonNull::new(map_ptr).expect("map storage is non-null"));
        types.insert(spec.name, handle);
        handle
    }

    /// Look up a registered type by name.
    pub fn type_by_name(&self, name: &str) -> Option<TypeHandle> {
        self.types.read().get(name).copied()
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.types.read().len()
    }

    /// Number of declared capabilities.
    pub fn capability_count(&self) -> usize {
        self.capabilities.read().len()
    }

    /// Flatten declared capabilities plus transitive bases plus the base
    /// type's table into one entry list. First entry per capability
    /// wins.
    fn flatten_capabilities(&self, spec: &TypeSpec<'_>) -> Vec<(u32, *const ())> {
        let mut seen: FxHashMap<u32, *const ()> = FxHashMap::default();
        let mut order: Vec<u32> = Vec::new();

        let bases = self.capability_bases.read();
        let mut pending: SmallVec<[(CapabilityId, DispatchTable); 8]> = SmallVec::new();

        // All declared entries claim their slots before any base
        // propagation, so a declared table always wins.
        for &(cap, table) in spec.capabilities {
            if seen.insert(cap.raw(), table.as_ptr() as *const ()).is_none() {
                order.push(cap.raw());
                pending.push((cap, table));
            }
        }

        // A declared base dispatches through the declaring capability's
        // table unless it is itself declared.
        while let Some((cap, table)) = pending.pop() {
            if let Some(cap_bases) = bases.get(&cap.raw()) {
                for &base in cap_bases {
                    if seen.insert(base.raw(), table.as_ptr() as *const ()).is_none() {
                        order.push(base.raw());
                        pending.push((base, table));
                    }
                }
            }
        }

        if let Some(base_type) = spec.extends {
            for slot in base_type.capability_slots() {
                if slot.cap != 0 && !seen.contains_key(&slot.cap) {
                    seen.insert(slot.cap, slot.table);
                    order.push(slot.cap);
                }
            }
        }

        order
            .into_iter()
            .map(|cap| (cap, seen[&cap]))
            .collect()
    }

    /// Build the frozen probe table in registry storage.
    ///
    /// Returns the slot array and its (power-of-two) length. Sized at
    /// twice the entry count so probes always terminate on an empty
    /// slot.
    fn freeze_slots(&self, entries: &[(u32, *const ())]) -> (*const CapSlot, usize) {
        let len = (entries.len() * 2).next_power_of_two().max(4);
        let slots = self.storage_alloc(len * mem::size_of::<CapSlot>()) as *mut CapSlot;

        for i in 0..len {
            unsafe {
                ptr::write(
                    slots.add(i),
                    CapSlot {
                        cap: 0,
                        table: ptr::null(),
                    },
                )
            };
        }

        let mask = len - 1;
        for &(cap, table) in entries {
            let mut index = cap as usize & mask;
            loop {
                let slot = unsafe { &mut *slots.add(index) };
                if slot.cap == 0 {
                    slot.cap = cap;
                    slot.table = table;
                    break;
                }
                debug_assert_ne!(slot.cap, cap);
                index = (index + 1) & mask;
            }
        }

        (slots, len)
    }

    fn storage_alloc(&self, size: usize) -> *mut u8 {
        let (offset, _) = self
            .storage
            .alloc(size)
            .unwrap_or_else(|| panic!("interface map buffer exhausted ({} bytes requested)", size));
        self.storage.ptr_at(offset)
    }

    // =========================================================================
    // Type descriptors
    // =========================================================================

    /// Get the reflective descriptor for a registered type.
    ///
    /// Built on first query as a managed object, registered as an
    /// implicit root (descriptors are exempt from reclamation), and
    /// cached: repeated calls return the identical object.
    pub fn get_type<'gc>(&self, handle: TypeHandle, gc: &'gc GcManager) -> &'gc TypeDescriptor {
        if let Some(existing) = handle.descriptor() {
            return unsafe { existing.as_ref() };
        }

        let system = self
            .system_type
            .get()
            .expect("registry bootstrap has not run");
        let object = gc.alloc(mem::size_of::<TypeDescriptor>(), system.hooks_ptr());
        let descriptor = object.as_ptr() as *mut TypeDescriptor;
        unsafe { ptr::write(descriptor, TypeDescriptor::new(handle)) };
        gc.register_implicit_root(object.as_ptr());
        handle.set_descriptor(descriptor);
        unsafe { &*descriptor }
    }

    /// Bootstrap the system reflective type.
    ///
    /// The system type's own descriptor must exist before its map does,
    /// so this runs in two phases: allocate the descriptor with a null
    /// type tag, register the `system.Type` map, then patch the tag and
    /// cache the descriptor.
    pub fn bootstrap_system_type(&self, gc: &GcManager) -> TypeHandle {
        assert!(
            self.system_type.get().is_none(),
            "system type already bootstrapped"
        );

        // Phase 1: the descriptor object, untagged.
        let object = gc.alloc(mem::size_of::<TypeDescriptor>(), ptr::null());

        // Phase 2: the map now exists; patch the tag.
        let handle = self.register_object(TypeSpec {
            name: SYSTEM_TYPE_NAME,
            object_size: mem::size_of::<TypeDescriptor>() as u32,
            trace: descriptor_trace,
            finalize: None,
            extends: None,
            capabilities: &[],
        });
        unsafe { gc.set_object_map(object.as_ptr(), handle.hooks_ptr()) };

        let descriptor = object.as_ptr() as *mut TypeDescriptor;
        unsafe { ptr::write(descriptor, TypeDescriptor::new(handle)) };
        gc.register_implicit_root(object.as_ptr());
        handle.set_descriptor(descriptor);

        self.system_type.set(Some(handle));
        handle
    }

    /// Install a host-bootstrapped system type.
    ///
    /// Used when the `register_system_type` callback replaces the
    /// built-in bootstrap.
    pub fn install_system_type(&self, handle: TypeHandle) {
        assert!(
            self.system_type.get().is_none(),
            "system type already bootstrapped"
        );
        self.system_type.set(Some(handle));
    }

    /// The bootstrap type backing all descriptors.
    pub fn system_type(&self) -> Option<TypeHandle> {
        self.system_type.get()
    }
}
