// Sat Oct 17 2026 - Alex

use crate::config::Config;
use crate::introspect::classifier::{HeaderRead, PointerClassifier};
use crate::introspect::{
    AncestorFailure, FieldRecord, FieldReport, FieldValue, IntrospectError, MethodRecord, ObjectVerdict,
};
use crate::memory::{Address, FaultGuardedProber, FaultKind, MemoryProbe, ProbeOutcome, WORD_SIZE};
use crate::runtime::{AllocationSizer, ClassRef, MethodScope, TypeMetadata};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

pub struct IntrospectorBuilder {
    metadata: Arc<dyn TypeMetadata>,
    prober: Option<Arc<dyn MemoryProbe>>,
    sizer: Option<Arc<dyn AllocationSizer>>,
    config: Config,
}

impl IntrospectorBuilder {
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_prober(mut self, prober: Arc<dyn MemoryProbe>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn with_allocation_sizer(mut self, sizer: Arc<dyn AllocationSizer>) -> Self {
        self.sizer = Some(sizer);
        self
    }

    pub fn build(self) -> Result<Introspector, crate::config::ConfigError> {
        self.config.validate().map_err(crate::config::ConfigError::Invalid)?;
        let prober: Arc<dyn MemoryProbe> = match self.prober {
            Some(prober) => prober,
            None => Arc::new(FaultGuardedProber::new().with_max_len(self.config.max_probe_len)),
        };
        let mut classifier = PointerClassifier::new(Arc::clone(&prober), Arc::clone(&self.metadata), self.config);
        if let Some(sizer) = self.sizer {
            classifier = classifier.with_sizer(sizer);
        }
        Ok(Introspector {
            metadata: self.metadata,
            prober,
            classifier,
        })
    }
}

/// Field and method enumeration over objects the classifier accepted.
pub struct Introspector {
    metadata: Arc<dyn TypeMetadata>,
    prober: Arc<dyn MemoryProbe>,
    classifier: PointerClassifier,
}

impl Introspector {
    pub fn builder(metadata: Arc<dyn TypeMetadata>) -> IntrospectorBuilder {
        IntrospectorBuilder {
            metadata,
            prober: None,
            sizer: None,
            config: Config::default(),
        }
    }

    pub fn new(metadata: Arc<dyn TypeMetadata>) -> Self {
        let config = Config::default();
        let prober: Arc<dyn MemoryProbe> = Arc::new(FaultGuardedProber::new().with_max_len(config.max_probe_len));
        Self {
            classifier: PointerClassifier::new(Arc::clone(&prober), Arc::clone(&metadata), config),
            metadata,
            prober,
        }
    }

    pub fn config(&self) -> &Config {
        self.classifier.config()
    }

    pub fn metadata(&self) -> &Arc<dyn TypeMetadata> {
        &self.metadata
    }

    pub fn classify(&self, address: Address) -> Result<ObjectVerdict, IntrospectError> {
        self.classifier.classify(address)
    }

    /// Verdicts in input order. Stops at the first fatal guard failure.
    pub fn classify_batch(&self, addresses: &[Address]) -> Result<Vec<ObjectVerdict>, IntrospectError> {
        addresses
            .par_iter()
            .map(|&address| self.classifier.classify(address))
            .collect()
    }

    /// `class` followed by its superclasses, most specific first. The second element says why
    /// the walk stopped before reaching a root class.
    pub fn ancestry(&self, class: ClassRef) -> (Vec<ClassRef>, Option<AncestorFailure>) {
        let max_depth = self.config().max_ancestor_depth;
        let mut chain = vec![class];
        let mut seen: HashSet<ClassRef> = HashSet::from([class]);
        let mut current = class;

        loop {
            let next = match self.metadata.superclass(current) {
                Ok(Some(next)) => next,
                Ok(None) => return (chain, None),
                Err(err) => return (chain, Some(self.ancestor_failure(current, err.to_string()))),
            };
            if !seen.insert(next) {
                let reason = format!("cycle back to {}", self.name_of(next));
                return (chain, Some(self.ancestor_failure(current, reason)));
            }
            if chain.len() >= max_depth {
                let reason = format!("deeper than {} levels", max_depth);
                return (chain, Some(self.ancestor_failure(current, reason)));
            }
            chain.push(next);
            current = next;
        }
    }

    pub fn list_instance_fields(&self, object: Address) -> Result<FieldReport, IntrospectError> {
        let class = match self.classifier.read_header(object)? {
            HeaderRead::Class(class) => class,
            HeaderRead::Unreadable(kind) => return Err(IntrospectError::UnreadableMemory(kind)),
            HeaderRead::Unknown(_) => return Err(IntrospectError::NotAnObject(object)),
        };

        let (chain, mut ancestor_failure) = self.ancestry(class);
        let max_len = self.config().max_probe_len;
        let mut fields = Vec::new();

        for level in chain {
            let declared = match self.metadata.declared_fields(level) {
                Ok(declared) => declared,
                Err(err) => {
                    ancestor_failure = Some(self.ancestor_failure(level, err.to_string()));
                    break;
                }
            };
            let declaring_class = self.name_of(level);

            for decl in declared {
                let value = match object.checked_add(decl.offset()) {
                    Some(at) => match self.prober.probe(at, decl.size().min(max_len))? {
                        ProbeOutcome::Readable(bytes) => FieldValue::Bytes(bytes),
                        ProbeOutcome::Unreadable(kind) => {
                            log::debug!("{}.{} at {} unreadable: {}", declaring_class, decl.name(), at, kind);
                            FieldValue::Unreadable(kind)
                        }
                    },
                    None => FieldValue::Unreadable(FaultKind::AddressOverflow),
                };
                fields.push(FieldRecord {
                    name: decl.name().to_string(),
                    is_pointer_shaped: decl.type_tag().is_pointer_shaped() && decl.size() == WORD_SIZE,
                    type_tag: decl.type_tag().clone(),
                    declaring_class: declaring_class.clone(),
                    offset: decl.offset(),
                    value,
                });
            }
        }

        if let Some(failure) = &ancestor_failure {
            log::warn!(
                "field list for {} is partial: {} ({})",
                object,
                failure.class,
                failure.reason
            );
        }

        Ok(FieldReport {
            object,
            class_name: self.name_of(class),
            fields,
            ancestor_failure,
        })
    }

    pub fn list_methods(&self, class: ClassRef, scope: MethodScope) -> Result<Vec<MethodRecord>, IntrospectError> {
        let is_class_level = scope == MethodScope::ClassLevel;
        Ok(self
            .metadata
            .method_table(class, scope)?
            .into_iter()
            .map(|selector_name| MethodRecord {
                selector_name,
                is_class_level,
            })
            .collect())
    }

    pub fn list_class_methods(&self, class: ClassRef) -> Result<Vec<MethodRecord>, IntrospectError> {
        self.list_methods(class, MethodScope::ClassLevel)
    }

    /// Names of the object's pointer-shaped object fields whose current value classifies as an
    /// instance of `class` or one of its subclasses.
    pub fn field_names_conforming_to(&self, object: Address, class: ClassRef) -> Result<Vec<String>, IntrospectError> {
        let report = self.list_instance_fields(object)?;
        let mut names = Vec::new();
        for record in report.fields {
            if !record.is_pointer_shaped || !record.type_tag.is_object() {
                continue;
            }
            let Some(target) = record.value.pointer() else {
                continue;
            };
            let verdict = self.classifier.classify(target)?;
            match verdict.class {
                Some(found) if self.metadata.is_subclass_of(found, class) => names.push(record.name),
                _ => {}
            }
        }
        Ok(names)
    }

    fn name_of(&self, class: ClassRef) -> String {
        self.metadata
            .class_name(class)
            .unwrap_or_else(|| class.address().to_string())
    }

    fn ancestor_failure(&self, class: ClassRef, reason: String) -> AncestorFailure {
        AncestorFailure {
            class: self.name_of(class),
            reason,
        }
    }
}

impl From<AncestorFailure> for IntrospectError {
    fn from(failure: AncestorFailure) -> Self {
        IntrospectError::AncestorResolutionFailed {
            class: failure.class,
            reason: failure.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{arch, fault_dispositions, guard_stats};
    use crate::runtime::{ClassBuilder, ClassRegistry, InstanceHeap, MetadataError, TypeTag};
    use crate::utils::pages::ScratchPages;

    fn registry_with_c() -> (Arc<ClassRegistry>, ClassRef) {
        let registry = Arc::new(ClassRegistry::new());
        let class = registry
            .register(
                ClassBuilder::new("C")
                    .ivar("f1", TypeTag::parse("i"))
                    .ivar("f2", TypeTag::object())
                    .instance_method("describe")
                    .class_method("new"),
            )
            .unwrap();
        (registry, class)
    }

    #[test]
    fn test_fields_in_declaration_order() {
        if !arch::SUPPORTED {
            return;
        }
        let (registry, class) = registry_with_c();
        let heap = Arc::new(InstanceHeap::new());
        let object = heap.allocate(registry.as_ref(), class).unwrap();
        let introspector = Introspector::builder(registry.clone())
            .with_allocation_sizer(heap.clone())
            .build()
            .unwrap();

        let verdict = introspector.classify(object).unwrap();
        assert!(verdict.is_likely_object);
        assert_eq!(verdict.allocation_large_enough, Some(true));

        let report = introspector.list_instance_fields(object).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.class_name, "C");
        assert_eq!(report.names(), vec!["f1", "f2"]);
        assert!(!report.fields[0].is_pointer_shaped);
        assert!(report.fields[1].is_pointer_shaped);
        assert_eq!(report.fields[1].value.pointer(), Some(Address::zero()));
        assert!(report.fields.iter().all(|f| f.declaring_class == "C"));
    }

    #[test]
    fn test_field_values_are_read() {
        if !arch::SUPPORTED {
            return;
        }
        let (registry, class) = registry_with_c();
        let heap = InstanceHeap::new();
        let object = heap.allocate(registry.as_ref(), class).unwrap();
        let f1 = registry.field(class, "f1").unwrap();
        heap.write_bytes(object, f1.offset(), &42i32.to_ne_bytes()).unwrap();

        let introspector = Introspector::new(registry.clone());
        let report = introspector.list_instance_fields(object).unwrap();
        assert_eq!(report.field("f1").unwrap().value.as_u64(), Some(42));
    }

    #[test]
    fn test_subclass_fields_come_first() {
        if !arch::SUPPORTED {
            return;
        }
        let registry = Arc::new(ClassRegistry::new());
        registry
            .register(ClassBuilder::new("Shape").ivar("origin", TypeTag::parse("d")))
            .unwrap();
        let circle = registry
            .register(
                ClassBuilder::new("Circle")
                    .superclass("Shape")
                    .ivar("radius", TypeTag::parse("d"))
                    .ivar("label", TypeTag::parse("*")),
            )
            .unwrap();
        let heap = InstanceHeap::new();
        let object = heap.allocate(registry.as_ref(), circle).unwrap();

        let introspector = Introspector::new(registry.clone());
        let report = introspector.list_instance_fields(object).unwrap();
        assert_eq!(report.names(), vec!["radius", "label", "origin"]);
        assert_eq!(report.field("origin").unwrap().declaring_class, "Shape");
        assert!(report.field("label").unwrap().is_pointer_shaped);
        assert!(report.fields[0].offset > report.fields[2].offset);
    }

    #[test]
    fn test_unreadable_field_keeps_the_rest() {
        if !arch::SUPPORTED {
            return;
        }
        let registry = Arc::new(ClassRegistry::new());
        let class = registry
            .register(
                ClassBuilder::new("Straddler")
                    .ivar("count", TypeTag::parse("q"))
                    .ivar("owner", TypeTag::object())
                    .ivar("flags", TypeTag::parse("I")),
            )
            .unwrap();
        let pages = ScratchPages::new(2).unwrap();
        // Header, count and owner fit before the boundary; flags falls on the next page.
        let start = pages.page_size() - 3 * WORD_SIZE;
        pages.write_word(start, class.header_word());
        pages.write_word(start + WORD_SIZE, 7);
        pages.protect_tail(1).unwrap();
        let object = pages.base().wrapping_add(start);

        let introspector = Introspector::new(registry.clone());
        let report = introspector.list_instance_fields(object).unwrap();
        assert_eq!(report.names(), vec!["count", "owner", "flags"]);
        assert_eq!(report.field("count").unwrap().value.as_u64(), Some(7));
        assert!(report.field("owner").unwrap().value.is_readable());
        assert_eq!(
            report.field("flags").unwrap().value,
            FieldValue::Unreadable(FaultKind::AccessDenied)
        );
    }

    #[test]
    fn test_missing_superclass_gives_partial_report() {
        if !arch::SUPPORTED {
            return;
        }
        let registry = Arc::new(ClassRegistry::new());
        let orphan = registry
            .register(
                ClassBuilder::new("Orphan")
                    .superclass("Ghost")
                    .ivar("value", TypeTag::parse("q")),
            )
            .unwrap();
        let heap = InstanceHeap::new();
        let object = heap.allocate(registry.as_ref(), orphan).unwrap();

        let introspector = Introspector::new(registry.clone());
        let report = introspector.list_instance_fields(object).unwrap();
        assert_eq!(report.names(), vec!["value"]);
        let failure = report.ancestor_failure.clone().unwrap();
        assert_eq!(failure.class, "Orphan");
        assert!(failure.reason.contains("Ghost"));

        let err: IntrospectError = failure.into();
        assert!(matches!(err, IntrospectError::AncestorResolutionFailed { .. }));
    }

    #[test]
    fn test_ancestry_depth_limit() {
        let registry = Arc::new(ClassRegistry::new());
        let mut last = registry.register(ClassBuilder::new("L0")).unwrap();
        for i in 1..6 {
            last = registry
                .register(ClassBuilder::new(format!("L{}", i)).superclass(format!("L{}", i - 1)))
                .unwrap();
        }

        let introspector = Introspector::new(registry.clone());
        let (chain, failure) = introspector.ancestry(last);
        assert_eq!(chain.len(), 6);
        assert!(failure.is_none());

        let shallow = Introspector::builder(registry.clone())
            .with_config(Config::default().with_max_ancestor_depth(3))
            .build()
            .unwrap();
        let (chain, failure) = shallow.ancestry(last);
        assert_eq!(chain.len(), 3);
        assert!(failure.unwrap().reason.contains("deeper"));
    }

    #[test]
    fn test_ancestry_cycle() {
        let registry = Arc::new(ClassRegistry::new());
        let a = registry.register(ClassBuilder::new("A").superclass("B")).unwrap();
        registry.register(ClassBuilder::new("B").superclass("A")).unwrap();

        let introspector = Introspector::new(registry.clone());
        let (chain, failure) = introspector.ancestry(a);
        assert_eq!(chain.len(), 2);
        assert!(failure.unwrap().reason.contains("cycle"));
    }

    #[test]
    fn test_method_scopes_stay_separate() {
        let (registry, class) = registry_with_c();
        let introspector = Introspector::new(registry.clone());

        let instance = introspector.list_methods(class, MethodScope::Instance).unwrap();
        assert_eq!(instance.len(), 1);
        assert_eq!(instance[0].selector_name, "describe");
        assert!(!instance[0].is_class_level);

        let class_level = introspector.list_class_methods(class).unwrap();
        assert_eq!(class_level.len(), 1);
        assert_eq!(class_level[0].to_string(), "+new");
    }

    #[test]
    fn test_list_methods_unknown_class() {
        let (registry, _) = registry_with_c();
        let introspector = Introspector::new(registry.clone());
        let bogus = ClassRef::new(Address::new(0x1000));
        assert!(matches!(
            introspector.list_methods(bogus, MethodScope::Instance),
            Err(IntrospectError::Metadata(MetadataError::UnknownClass(_)))
        ));
    }

    #[test]
    fn test_non_objects_are_errors() {
        if !arch::SUPPORTED {
            return;
        }
        let (registry, _) = registry_with_c();
        let introspector = Introspector::new(registry.clone());
        let data = [0x77usize; 2];
        assert!(matches!(
            introspector.list_instance_fields(Address::from_ref(&data)),
            Err(IntrospectError::NotAnObject(_))
        ));

        let pages = ScratchPages::new(1).unwrap();
        pages.protect_tail(1).unwrap();
        assert!(matches!(
            introspector.list_instance_fields(pages.base()),
            Err(IntrospectError::UnreadableMemory(_))
        ));
    }

    #[test]
    fn test_field_names_conforming_to() {
        if !arch::SUPPORTED {
            return;
        }
        let registry = Arc::new(ClassRegistry::new());
        let animal = registry.register(ClassBuilder::new("Animal")).unwrap();
        let dog = registry.register(ClassBuilder::new("Dog").superclass("Animal")).unwrap();
        let owner = registry
            .register(
                ClassBuilder::new("Owner")
                    .ivar("pet", TypeTag::object_of("Animal"))
                    .ivar("friend", TypeTag::object())
                    .ivar("nothing", TypeTag::object())
                    .ivar("age", TypeTag::parse("q")),
            )
            .unwrap();

        let heap = InstanceHeap::new();
        let rex = heap.allocate(registry.as_ref(), dog).unwrap();
        let other = heap.allocate(registry.as_ref(), owner).unwrap();
        let object = heap.allocate(registry.as_ref(), owner).unwrap();
        for (name, value) in [("pet", rex.as_usize()), ("friend", other.as_usize()), ("age", rex.as_usize())] {
            let field = registry.field(owner, name).unwrap();
            heap.write_word(object, field.offset(), value).unwrap();
        }

        let introspector = Introspector::new(registry.clone());
        assert_eq!(introspector.field_names_conforming_to(object, animal).unwrap(), vec!["pet"]);
        assert_eq!(introspector.field_names_conforming_to(object, dog).unwrap(), vec!["pet"]);
        assert_eq!(introspector.field_names_conforming_to(object, owner).unwrap(), vec!["friend"]);
    }

    #[test]
    fn test_classify_batch_preserves_order() {
        if !arch::SUPPORTED {
            return;
        }
        let (registry, class) = registry_with_c();
        let heap = InstanceHeap::new();
        let object = heap.allocate(registry.as_ref(), class).unwrap();
        let introspector = Introspector::new(registry.clone());

        let addresses = vec![Address::zero(), object, Address::new(0xdead_0000), object, Address::new(0x11)];
        let verdicts = introspector.classify_batch(&addresses).unwrap();
        let flags: Vec<bool> = verdicts.iter().map(|v| v.is_likely_object).collect();
        assert_eq!(flags, vec![false, true, false, true, false]);
        for (verdict, address) in verdicts.iter().zip(&addresses) {
            assert_eq!(verdict.address, *address);
        }
    }

    #[test]
    fn test_concurrent_introspection() {
        if !arch::SUPPORTED {
            return;
        }
        let (registry, class) = registry_with_c();
        let heap = InstanceHeap::new();
        let objects: Vec<Address> = (0..8)
            .map(|_| heap.allocate(registry.as_ref(), class).unwrap())
            .collect();
        let pages = ScratchPages::new(2).unwrap();
        pages.protect_tail(1).unwrap();
        let guard_page = pages.page(1);

        let before = fault_dispositions().unwrap();
        let violations_before = guard_stats().reentry_violations;
        let introspector = Introspector::new(registry.clone());

        std::thread::scope(|scope| {
            for t in 0..8 {
                let introspector = &introspector;
                let objects = &objects;
                scope.spawn(move || {
                    for i in 0..50 {
                        let object = objects[(t + i) % objects.len()];
                        assert!(introspector.classify(object).unwrap().is_likely_object);
                        assert_eq!(introspector.list_instance_fields(object).unwrap().fields.len(), 2);
                        assert!(!introspector.classify(guard_page).unwrap().is_likely_object);
                        assert!(!introspector.classify(Address::new(0x7_0000_0000 + i * 8)).unwrap().is_likely_object);
                    }
                });
            }
        });

        assert_eq!(guard_stats().reentry_violations, violations_before);
        assert_eq!(fault_dispositions().unwrap(), before);
    }
}
