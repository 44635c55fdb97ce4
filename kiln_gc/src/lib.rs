//! Kiln Garbage Collector
//!
//! A conservative, stop-the-world mark-sweep collector for the Kiln
//! native runtime substrate. Generated native code allocates every
//! managed object out of one pre-reserved arena; when the arena runs
//! dry, a full cycle reclaims everything unreachable from the stack and
//! the registered roots.
//!
//! # Architecture
//!
//! - **Arena**: a single contiguous, 16-byte-aligned region obtained
//!   once from the host allocator bridge. Bump allocation with a
//!   coalescing free list fed by the sweep. Capacity is fixed; there is
//!   no growth path.
//!
//! - **Conservative roots**: every word on the stack between a recorded
//!   base and the collector's position that addresses the start of a
//!   live allocation is treated as a root, along with registered static
//!   slots. False positives over-retain; reachable objects are never
//!   dropped.
//!
//! - **Trace dispatch**: each object header carries a pointer to its
//!   registry entry, whose leading [`TraceHooks`] supply the per-type
//!   trace and finalize functions emitted by the code generator.
//!
//! - **Mark generations**: a rotating stamp distinguishes "traced this
//!   cycle" from stale marks, so the sweep needs no clear pass.
//!
//! # Usage
//!
//! ```ignore
//! use kiln_gc::{stack_base, GcConfig, GcManager};
//!
//! let gc = GcManager::new(GcConfig::default())?;
//! gc.set_top_of_stack(stack_base!());
//!
//! let obj = gc.alloc(size, type_map);
//! // ... allocation pressure triggers collection automatically
//! ```
//!
//! # Safety
//!
//! The collector requires that:
//! - every registered type's trace function visits all its reference
//!   fields
//! - arena references held in unmanaged storage are registered as roots
//! - destruction hooks never allocate

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod bridge;
pub mod collector;
pub mod config;
pub mod header;
pub mod stats;
pub mod trace;

pub use arena::{align_up, Arena, ALIGN};
pub use bridge::{AllocFn, FreeFn, UnmanagedAlloc};
pub use collector::{GcError, GcManager, GcPhase};
pub use config::{AllocAfterGcFn, ConfigError, DestructFn, GcConfig, MainTraceFn};
pub use header::{FinalizeFn, ObjectHeader, TraceFn, TraceHooks, HEADER_SIZE};
pub use stats::{GcStats, GcTimer};
pub use trace::Marker;
