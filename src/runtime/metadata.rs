// Fri Oct 16 2026 - Alex

use crate::memory::Address;
use crate::runtime::{ClassRef, FieldDecl, MetadataError, MethodScope};

/// Hard stop for superclass walks done by provided methods.
pub const MAX_HIERARCHY_DEPTH: usize = 256;

/// Source of class metadata. Implementations must be safe to query concurrently.
pub trait TypeMetadata: Send + Sync {
    /// Treat `address` as a candidate class descriptor and look it up. Must not dereference it.
    fn resolve_class(&self, address: Address) -> Option<ClassRef>;

    fn class_name(&self, class: ClassRef) -> Option<String>;

    /// `Ok(None)` for a root class.
    fn superclass(&self, class: ClassRef) -> Result<Option<ClassRef>, MetadataError>;

    /// Fields declared by `class` itself, in declaration order.
    fn declared_fields(&self, class: ClassRef) -> Result<Vec<FieldDecl>, MetadataError>;

    fn method_table(&self, class: ClassRef, scope: MethodScope) -> Result<Vec<String>, MetadataError>;

    fn instance_size(&self, class: ClassRef) -> Result<usize, MetadataError>;

    fn is_subclass_of(&self, class: ClassRef, ancestor: ClassRef) -> bool {
        let mut current = Some(class);
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match current {
                Some(c) if c == ancestor => return true,
                Some(c) => current = self.superclass(c).ok().flatten(),
                None => return false,
            }
        }
        false
    }
}

/// Optional allocator introspection: how many bytes the allocation at `address` spans.
pub trait AllocationSizer: Send + Sync {
    fn allocation_size(&self, address: Address) -> Option<usize>;
}
