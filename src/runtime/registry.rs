// Fri Oct 16 2026 - Alex

use crate::memory::{Address, WORD_SIZE};
use crate::runtime::{
    ClassBuilder, ClassDescriptor, ClassRef, FieldDecl, MetadataError, MethodScope, TypeMetadata,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct RegistryInner {
    by_name: IndexMap<String, Arc<ClassDescriptor>>,
    by_address: HashMap<usize, Arc<ClassDescriptor>>,
}

/// In-process class table. A class's descriptor lives on the heap for as long as the registry
/// does, so its address is stable and can be written into object headers.
#[derive(Default)]
pub struct ClassRegistry {
    inner: RwLock<RegistryInner>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. A superclass that is not registered yet is allowed; its instance is
    /// taken to be just the header, and walks through it report it as unresolved.
    pub fn register(&self, builder: ClassBuilder) -> Result<ClassRef, MetadataError> {
        let mut inner = self.inner.write();
        if inner.by_name.contains_key(builder.name()) {
            return Err(MetadataError::DuplicateClass(builder.name().to_string()));
        }

        let base = match builder.superclass_name() {
            Some(superclass) => match inner.by_name.get(superclass) {
                Some(parent) => parent.instance_size(),
                None => {
                    log::warn!(
                        "registering '{}' before its superclass '{}'",
                        builder.name(),
                        superclass
                    );
                    WORD_SIZE
                }
            },
            None => WORD_SIZE,
        };

        let descriptor = Arc::new(builder.finish(base)?);
        let class = Self::class_ref(&descriptor);
        log::debug!(
            "registered class '{}' at {} ({} bytes, {} fields)",
            descriptor.name(),
            class.address(),
            descriptor.instance_size(),
            descriptor.fields().len()
        );
        inner.by_name.insert(descriptor.name().to_string(), Arc::clone(&descriptor));
        inner.by_address.insert(class.header_word(), descriptor);
        Ok(class)
    }

    pub fn lookup(&self, name: &str) -> Option<ClassRef> {
        self.inner.read().by_name.get(name).map(Self::class_ref)
    }

    pub fn descriptor(&self, class: ClassRef) -> Option<Arc<ClassDescriptor>> {
        self.inner.read().by_address.get(&class.header_word()).cloned()
    }

    /// All classes in registration order.
    pub fn classes(&self) -> Vec<ClassRef> {
        self.inner.read().by_name.values().map(Self::class_ref).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a field by name on `class` or the nearest ancestor that declares it.
    pub fn field(&self, class: ClassRef, name: &str) -> Option<FieldDecl> {
        let mut current = Some(class);
        for _ in 0..crate::runtime::MAX_HIERARCHY_DEPTH {
            let descriptor = self.descriptor(current?)?;
            if let Some(field) = descriptor.field(name) {
                return Some(field.clone());
            }
            current = self.superclass(current?).ok().flatten();
        }
        None
    }

    fn class_ref(descriptor: &Arc<ClassDescriptor>) -> ClassRef {
        ClassRef::new(Address::from_ptr(Arc::as_ptr(descriptor)))
    }

    fn require(&self, class: ClassRef) -> Result<Arc<ClassDescriptor>, MetadataError> {
        self.descriptor(class)
            .ok_or(MetadataError::UnknownClass(class.address()))
    }
}

impl TypeMetadata for ClassRegistry {
    fn resolve_class(&self, address: Address) -> Option<ClassRef> {
        self.inner
            .read()
            .by_address
            .get(&address.as_usize())
            .map(Self::class_ref)
    }

    fn class_name(&self, class: ClassRef) -> Option<String> {
        self.descriptor(class).map(|d| d.name().to_string())
    }

    fn superclass(&self, class: ClassRef) -> Result<Option<ClassRef>, MetadataError> {
        let descriptor = self.require(class)?;
        match descriptor.superclass_name() {
            None => Ok(None),
            Some(name) => self
                .lookup(name)
                .map(Some)
                .ok_or_else(|| MetadataError::UnresolvedSuperclass {
                    class: descriptor.name().to_string(),
                    superclass: name.to_string(),
                }),
        }
    }

    fn declared_fields(&self, class: ClassRef) -> Result<Vec<FieldDecl>, MetadataError> {
        Ok(self.require(class)?.fields().to_vec())
    }

    fn method_table(&self, class: ClassRef, scope: MethodScope) -> Result<Vec<String>, MetadataError> {
        Ok(self.require(class)?.methods(scope).to_vec())
    }

    fn instance_size(&self, class: ClassRef) -> Result<usize, MetadataError> {
        Ok(self.require(class)?.instance_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{PrimitiveType, TypeTag};

    fn sample() -> (ClassRegistry, ClassRef, ClassRef) {
        let registry = ClassRegistry::new();
        let base = registry
            .register(
                ClassBuilder::new("Base")
                    .ivar("id", TypeTag::Primitive(PrimitiveType::LongLong))
                    .instance_method("describe"),
            )
            .unwrap();
        let child = registry
            .register(
                ClassBuilder::new("Child")
                    .superclass("Base")
                    .ivar("next", TypeTag::object())
                    .class_method("make"),
            )
            .unwrap();
        (registry, base, child)
    }

    #[test]
    fn test_resolve_by_descriptor_address() {
        let (registry, base, child) = sample();
        assert_eq!(registry.resolve_class(base.address()), Some(base));
        assert_eq!(registry.resolve_class(child.address()), Some(child));
        assert_eq!(registry.resolve_class(Address::new(0x1234)), None);
        assert_eq!(registry.classes(), vec![base, child]);
    }

    #[test]
    fn test_superclass_and_layout() {
        let (registry, base, child) = sample();
        assert_eq!(registry.superclass(child).unwrap(), Some(base));
        assert_eq!(registry.superclass(base).unwrap(), None);
        assert_eq!(registry.instance_size(base).unwrap(), 16);
        assert_eq!(registry.declared_fields(child).unwrap()[0].offset(), 16);
        assert!(registry.is_subclass_of(child, base));
        assert!(!registry.is_subclass_of(base, child));
        assert_eq!(registry.field(child, "id").unwrap().offset(), 8);
    }

    #[test]
    fn test_duplicate_and_unresolved() {
        let (registry, _, _) = sample();
        let dup = registry.register(ClassBuilder::new("Base"));
        assert_eq!(dup, Err(MetadataError::DuplicateClass("Base".to_string())));

        let orphan = registry
            .register(ClassBuilder::new("Orphan").superclass("Missing"))
            .unwrap();
        assert!(matches!(
            registry.superclass(orphan),
            Err(MetadataError::UnresolvedSuperclass { .. })
        ));
    }

    #[test]
    fn test_unknown_class_queries() {
        let registry = ClassRegistry::new();
        let bogus = ClassRef::new(Address::new(0x4000));
        assert_eq!(
            registry.instance_size(bogus),
            Err(MetadataError::UnknownClass(Address::new(0x4000)))
        );
        assert_eq!(registry.class_name(bogus), None);
    }
}
