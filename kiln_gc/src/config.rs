//! Collector configuration.
//!
//! The arena capacity is fixed at setup from these values; there is no
//! growth or resize path afterwards, so an invalid size must be rejected
//! before any allocation happens.

use crate::bridge::UnmanagedAlloc;
use crate::trace::Marker;

/// Global destruction hook, invoked for every reclaimed object during
/// the sweep, after the object's own finalize hook.
///
/// # Safety
///
/// The object is about to be reclaimed; the hook must not allocate.
pub type DestructFn = unsafe fn(object: *mut u8);

/// Diagnostic hook fired when an allocation still fails after a full
/// collection, just before out-of-memory is reported. Receives the
/// requested payload size.
pub type AllocAfterGcFn = fn(requested: usize);

/// Entry point fanning out to generated per-assembly static tracing.
/// Invoked once per cycle during root scanning.
pub type MainTraceFn = fn(marker: &mut Marker<'_>);

/// Configuration for the collector.
///
/// # Example
///
/// ```ignore
/// use kiln_gc::GcConfig;
///
/// let config = GcConfig {
///     arena_size: 64 * 1024 * 1024,
///     trace: true,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct GcConfig {
    /// Bytes reserved for the managed arena. Fixed for the process
    /// lifetime; exhaustion after a full collection is fatal.
    ///
    /// Default: 32MB
    pub arena_size: usize,

    /// Print a one-line summary of each collection to stderr.
    ///
    /// Default: false
    pub trace: bool,

    /// Walk all allocation records after each sweep and check header
    /// sanity. Expensive but useful when debugging trace functions.
    ///
    /// Default: enabled in debug builds
    pub verify_heap: bool,

    /// Bridge to the host allocator supplying the arena's backing
    /// buffer.
    pub unmanaged: UnmanagedAlloc,

    /// Global per-object destruction hook run during the sweep.
    pub destruct: Option<DestructFn>,

    /// Diagnostic hook fired before out-of-memory is reported.
    pub alloc_after_gc: Option<AllocAfterGcFn>,

    /// Generated static-root tracing entry point.
    pub main_trace: Option<MainTraceFn>,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            arena_size: 32 * 1024 * 1024,
            trace: false,
            verify_heap: cfg!(debug_assertions),
            unmanaged: UnmanagedAlloc::default(),
            destruct: None,
            alloc_after_gc: None,
            main_trace: None,
        }
    }
}

impl GcConfig {
    /// Configuration sized for constrained hosts.
    pub fn low_memory() -> Self {
        Self {
            arena_size: 4 * 1024 * 1024,
            ..Default::default()
        }
    }

    /// Configuration matching the reference benchmark setup.
    pub fn benchmark() -> Self {
        Self {
            arena_size: 40 * 1024 * 1024,
            verify_heap: false,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena_size < 4096 {
            return Err(ConfigError::ArenaTooSmall);
        }
        if self.arena_size > isize::MAX as usize / 2 {
            return Err(ConfigError::ArenaTooLarge);
        }
        Ok(())
    }
}

/// Configuration validation errors. All are fatal at setup, before any
/// managed allocation occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Arena size is zero or below the 4KB minimum.
    ArenaTooSmall,
    /// Arena size exceeds what the address space can back.
    ArenaTooLarge,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ArenaTooSmall => write!(f, "arena size must be at least 4KB"),
            ConfigError::ArenaTooLarge => write!(f, "arena size exceeds addressable memory"),
        }
    }
}

impl std::error::Error for ConfigError {}
