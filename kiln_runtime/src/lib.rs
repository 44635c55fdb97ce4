//! Kiln Runtime
//!
//! The native substrate that lets a managed, interface-polymorphic
//! object model run as compiled code without a hosted virtual machine.
//! It pairs the conservative collector from `kiln_gc` with a
//! process-wide interface/type registry:
//!
//! - every concrete type registers once and receives a permanent
//!   [`TypeHandle`]; the handle's address is the type tag stored in
//!   object headers
//! - capability dispatch (`implements`) is a frozen probe-table lookup,
//!   giving interface polymorphism without multi-rooted inheritance
//! - reflective [`TypeDescriptor`]s are managed objects, built lazily
//!   and exempt from reclamation
//!
//! # Bootstrap order
//!
//! ```ignore
//! let runtime = Runtime::setup(RuntimeConfig::default())?;
//! runtime.set_top_of_stack(kiln_gc::stack_base!());
//! // generated code registers capabilities and types, then allocates
//! ```
//!
//! Generated trace functions, dispatch tables, and registration calls
//! come from the code generator; this crate only consumes them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod map;
pub mod registry;
pub mod runtime;

pub use descriptor::TypeDescriptor;
pub use map::{leaf_trace, CapabilityId, DispatchTable, InterfaceMap, TypeHandle, TypeId};
pub use registry::{Registry, TypeSpec, SYSTEM_TYPE_NAME};
pub use runtime::{RegisterSystemTypeFn, Runtime, RuntimeConfig, SetupError};

pub use kiln_gc;
