// Mon Oct 19 2026 - Alex

pub mod cli;
pub mod config;
pub mod introspect;
pub mod memory;
pub mod runtime;
pub mod utils;

pub use config::Config;
pub use introspect::{Introspector, IntrospectError, ObjectVerdict, PointerClassifier};
pub use memory::{probe, Address, FaultKind, MemoryProbe, ProbeOutcome};
pub use runtime::{AllocationSizer, ClassBuilder, ClassRef, ClassRegistry, InstanceHeap, TypeMetadata, TypeTag};
