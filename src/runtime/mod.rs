// Thu Oct 15 2026 - Alex

pub mod class;
pub mod error;
pub mod field;
pub mod heap;
pub mod metadata;
pub mod registry;
pub mod type_tag;

pub use class::{ClassBuilder, ClassDescriptor, ClassRef, MethodScope};
pub use error::MetadataError;
pub use field::FieldDecl;
pub use heap::InstanceHeap;
pub use metadata::{AllocationSizer, TypeMetadata, MAX_HIERARCHY_DEPTH};
pub use registry::ClassRegistry;
pub use type_tag::{PrimitiveType, TypeTag};
