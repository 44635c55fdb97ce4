//! Process lifecycle: setup, teardown, and the host configuration
//! surface.
//!
//! `Runtime::setup` brackets all process-wide state: it reserves the
//! managed arena and the registry's map buffer through the unmanaged
//! bridge, wires the collector hooks, and runs the system-type
//! bootstrap. Dropping the `Runtime` is teardown; both buffers go back
//! through the bridge and every handle and object pointer becomes
//! invalid.

use kiln_gc::{
    AllocAfterGcFn, ConfigError, DestructFn, GcConfig, GcError, GcManager, MainTraceFn,
    UnmanagedAlloc,
};
use std::ptr::NonNull;

use crate::descriptor::TypeDescriptor;
use crate::map::TypeHandle;
use crate::registry::Registry;

/// Host callback replacing the built-in system-type bootstrap.
///
/// Must register the reflective bootstrap type (two-phase: allocate its
/// descriptor, then patch the map pointer) and return its handle.
pub type RegisterSystemTypeFn = fn(&Registry, &GcManager) -> TypeHandle;

/// Host initialization options.
///
/// # Example
///
/// ```ignore
/// use kiln_runtime::{Runtime, RuntimeConfig};
///
/// let runtime = Runtime::setup(RuntimeConfig {
///     arena_size: 40 * 1024 * 1024,
///     registry_size: 1024 * 1024,
///     ..Default::default()
/// })?;
/// runtime.set_top_of_stack(kiln_gc::stack_base!());
/// ```
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Bytes reserved for the managed arena.
    ///
    /// Default: 32MB
    pub arena_size: usize,

    /// Bytes reserved for the registry's interface map storage.
    ///
    /// Default: 1MB
    pub registry_size: usize,

    /// Print a one-line summary of each collection to stderr.
    pub trace: bool,

    /// Verify allocation records after each sweep.
    pub verify_heap: bool,

    /// Bridge to the host allocator for both buffers.
    pub unmanaged: UnmanagedAlloc,

    /// Global per-object destruction hook run during sweeps.
    pub destruct: Option<DestructFn>,

    /// Diagnostic hook fired before out-of-memory is reported.
    pub alloc_after_gc: Option<AllocAfterGcFn>,

    /// Generated static-root tracing entry point.
    pub main_trace: Option<MainTraceFn>,

    /// Replacement for the built-in system-type bootstrap.
    pub register_system_type: Option<RegisterSystemTypeFn>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            arena_size: 32 * 1024 * 1024,
            registry_size: 1024 * 1024,
            trace: false,
            verify_heap: cfg!(debug_assertions),
            unmanaged: UnmanagedAlloc::default(),
            destruct: None,
            alloc_after_gc: None,
            main_trace: None,
            register_system_type: None,
        }
    }
}

impl RuntimeConfig {
    /// Configuration matching the reference benchmark setup.
    pub fn benchmark() -> Self {
        Self {
            arena_size: 40 * 1024 * 1024,
            registry_size: 1024 * 1024,
            verify_heap: false,
            ..Default::default()
        }
    }

    fn gc_config(&self) -> GcConfig {
        GcConfig {
            arena_size: self.arena_size,
            trace: self.trace,
            verify_heap: self.verify_heap,
            unmanaged: self.unmanaged,
            destruct: self.destruct,
            alloc_after_gc: self.alloc_after_gc,
            main_trace: self.main_trace,
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), SetupError> {
        self.gc_config().validate()?;
        if self.registry_size < 4096 {
            return Err(SetupError::RegistryTooSmall);
        }
        Ok(())
    }
}

/// Setup failures. All are fatal before any managed allocation occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    /// Invalid collector configuration.
    Gc(ConfigError),
    /// Registry buffer is zero or below the 4KB minimum.
    RegistryTooSmall,
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::Gc(err) => write!(f, "{}", err),
            SetupError::RegistryTooSmall => {
                write!(f, "interface map buffer must be at least 4KB")
            }
        }
    }
}

impl std::error::Error for SetupError {}

impl From<ConfigError> for SetupError {
    fn from(err: ConfigError) -> Self {
        SetupError::Gc(err)
    }
}

/// The assembled runtime substrate.
///
/// Owns the collector and the registry; single logical mutator thread.
/// Dropping it tears the process-wide state down.
pub struct Runtime {
    gc: GcManager,
    registry: Registry,
    system_type: TypeHandle,
}

impl Runtime {
    /// Bring up the substrate from host configuration.
    ///
    /// Reserves both buffers, wires the hooks, and bootstraps the
    /// system reflective type. Fails before any allocation on invalid
    /// sizes.
    pub fn setup(config: RuntimeConfig) -> Result<Self, SetupError> {
        config.validate()?;

        let gc = GcManager::new(config.gc_config())?;
        let registry = Registry::new(config.registry_size, config.unmanaged);

        let system_type = match config.register_system_type {
            Some(bootstrap) => {
                let handle = bootstrap(&registry, &gc);
                registry.install_system_type(handle);
                handle
            }
            None => registry.bootstrap_system_type(&gc),
        };

        Ok(Self {
            gc,
            registry,
            system_type,
        })
    }

    /// Record the conservative scan boundary.
    ///
    /// Call exactly once with [`kiln_gc::stack_base!`], as close as
    /// possible to the true base of the call stack, before any managed
    /// allocation.
    pub fn set_top_of_stack(&self, base: usize) {
        self.gc.set_top_of_stack(base);
    }

    /// Allocate an instance of a registered type.
    ///
    /// The returned payload reads as zeroed: recycled blocks are
    /// cleared during the sweep and the default bridge zeroes fresh
    /// memory. A host installing a non-zeroing bridge must clear its
    /// buffers itself if generated constructors rely on zeroed fields.
    pub fn alloc_object(&self, handle: TypeHandle) -> NonNull<u8> {
        self.gc.alloc(handle.object_size(), handle.hooks_ptr())
    }

    /// Fallible variant of [`alloc_object`](Self::alloc_object).
    pub fn try_alloc_object(&self, handle: TypeHandle) -> Result<NonNull<u8>, GcError> {
        self.gc.try_alloc(handle.object_size(), handle.hooks_ptr())
    }

    /// Get the cached reflective descriptor for a type.
    pub fn get_type(&self, handle: TypeHandle) -> &TypeDescriptor {
        self.registry.get_type(handle, &self.gc)
    }

    /// Run a full collection cycle now.
    pub fn collect(&self) {
        self.gc.collect();
    }

    /// The collector.
    pub fn gc(&self) -> &GcManager {
        &self.gc
    }

    /// The type and capability registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The bootstrap reflective type.
    pub fn system_type(&self) -> TypeHandle {
        self.system_type
    }
}
