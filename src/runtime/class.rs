// Fri Oct 16 2026 - Alex

use crate::memory::{Address, WORD_SIZE};
use crate::runtime::{FieldDecl, MetadataError, TypeTag};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Handle to a class descriptor: the descriptor's address, which is what object headers hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassRef(Address);

impl ClassRef {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }

    /// Value to store in an object header to mark it as an instance of this class.
    pub fn header_word(&self) -> usize {
        self.0.as_usize()
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class@{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodScope {
    Instance,
    ClassLevel,
}

#[derive(Debug)]
pub struct ClassDescriptor {
    name: String,
    superclass: Option<String>,
    fields: Vec<FieldDecl>,
    instance_methods: Vec<String>,
    class_methods: Vec<String>,
    instance_size: usize,
}

impl ClassDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass_name(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn methods(&self, scope: MethodScope) -> &[String] {
        match scope {
            MethodScope::Instance => &self.instance_methods,
            MethodScope::ClassLevel => &self.class_methods,
        }
    }

    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.name() == name)
    }
}

#[derive(Debug, Clone)]
enum PendingField {
    Auto { name: String, tag: TypeTag },
    Fixed { name: String, tag: TypeTag, offset: usize, size: Option<usize> },
}

impl PendingField {
    fn name(&self) -> &str {
        match self {
            Self::Auto { name, .. } | Self::Fixed { name, .. } => name,
        }
    }
}

/// Declares a class. Fields added with `ivar` are laid out after the superclass instance (or
/// after the header word for a root class), in call order.
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    superclass: Option<String>,
    fields: Vec<PendingField>,
    instance_methods: Vec<String>,
    class_methods: Vec<String>,
    instance_size: Option<usize>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            fields: Vec::new(),
            instance_methods: Vec::new(),
            class_methods: Vec::new(),
            instance_size: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    pub fn superclass_name(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub fn ivar(mut self, name: impl Into<String>, tag: TypeTag) -> Self {
        self.fields.push(PendingField::Auto { name: name.into(), tag });
        self
    }

    pub fn ivar_encoded(self, name: impl Into<String>, encoding: &str) -> Self {
        self.ivar(name, TypeTag::parse(encoding))
    }

    pub fn ivar_at(mut self, name: impl Into<String>, tag: TypeTag, offset: usize) -> Self {
        self.fields.push(PendingField::Fixed {
            name: name.into(),
            tag,
            offset,
            size: None,
        });
        self
    }

    pub fn ivar_sized(mut self, name: impl Into<String>, tag: TypeTag, offset: usize, size: usize) -> Self {
        self.fields.push(PendingField::Fixed {
            name: name.into(),
            tag,
            offset,
            size: Some(size),
        });
        self
    }

    pub fn instance_method(mut self, selector: impl Into<String>) -> Self {
        self.instance_methods.push(selector.into());
        self
    }

    pub fn class_method(mut self, selector: impl Into<String>) -> Self {
        self.class_methods.push(selector.into());
        self
    }

    pub fn instance_size(mut self, size: usize) -> Self {
        self.instance_size = Some(size);
        self
    }

    /// Lay out fields starting at `base` (the superclass instance size, or one word).
    pub(crate) fn finish(self, base: usize) -> Result<ClassDescriptor, MetadataError> {
        let invalid = |reason: String| MetadataError::InvalidLayout {
            class: self.name.clone(),
            reason,
        };

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name().to_string()) {
                return Err(invalid(format!("field '{}' declared twice", field.name())));
            }
        }

        let mut cursor = base.max(WORD_SIZE);
        let mut fields = Vec::with_capacity(self.fields.len());
        for pending in &self.fields {
            let decl = match pending {
                PendingField::Auto { name, tag } => {
                    let size = tag
                        .size()
                        .ok_or_else(|| invalid(format!("field '{}' has no known size", name)))?;
                    let offset = align_up(cursor, tag.alignment())
                        .ok_or_else(|| invalid(format!("field '{}' runs past the address space", name)))?;
                    FieldDecl::new(name.clone(), tag.clone(), offset, size)
                }
                PendingField::Fixed { name, tag, offset, size } => {
                    let size = size
                        .or_else(|| tag.size())
                        .ok_or_else(|| invalid(format!("field '{}' has no known size", name)))?;
                    if *offset < WORD_SIZE {
                        return Err(invalid(format!("field '{}' overlaps the header", name)));
                    }
                    FieldDecl::new(name.clone(), tag.clone(), *offset, size)
                }
            };
            let end = decl
                .end()
                .ok_or_else(|| invalid(format!("field '{}' runs past the address space", decl.name())))?;
            cursor = cursor.max(end);
            fields.push(decl);
        }

        let natural = align_up(cursor, WORD_SIZE)
            .ok_or_else(|| invalid(format!("instance size {} cannot be word aligned", cursor)))?;
        let instance_size = match self.instance_size {
            Some(size) if size < cursor => {
                return Err(invalid(format!("instance size {} is smaller than the fields ({})", size, cursor)))
            }
            Some(size) => size,
            None => natural,
        };

        Ok(ClassDescriptor {
            name: self.name,
            superclass: self.superclass,
            fields,
            instance_methods: self.instance_methods,
            class_methods: self.class_methods,
            instance_size,
        })
    }
}

fn align_up(value: usize, alignment: usize) -> Option<usize> {
    if alignment <= 1 {
        return Some(value);
    }
    Some(value.checked_add(alignment - 1)? & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::PrimitiveType;

    #[test]
    fn test_auto_layout_root() {
        let class = ClassBuilder::new("Pair")
            .ivar("flag", TypeTag::Primitive(PrimitiveType::Bool))
            .ivar("count", TypeTag::Primitive(PrimitiveType::LongLong))
            .ivar("next", TypeTag::object())
            .finish(0)
            .unwrap();
        let offsets: Vec<usize> = class.fields().iter().map(|f| f.offset()).collect();
        assert_eq!(offsets, vec![WORD_SIZE, 16, 24]);
        assert_eq!(class.instance_size(), 32);
    }

    #[test]
    fn test_layout_after_superclass() {
        let class = ClassBuilder::new("Child")
            .superclass("Base")
            .ivar("x", TypeTag::Primitive(PrimitiveType::Int))
            .finish(24)
            .unwrap();
        assert_eq!(class.fields()[0].offset(), 24);
        assert_eq!(class.instance_size(), 32);
        assert_eq!(class.superclass_name(), Some("Base"));
    }

    #[test]
    fn test_layout_errors() {
        let dup = ClassBuilder::new("Dup")
            .ivar("a", TypeTag::object())
            .ivar("a", TypeTag::object())
            .finish(0);
        assert!(matches!(dup, Err(MetadataError::InvalidLayout { .. })));

        let header = ClassBuilder::new("Header").ivar_at("a", TypeTag::object(), 0).finish(0);
        assert!(matches!(header, Err(MetadataError::InvalidLayout { .. })));

        let unsized_field = ClassBuilder::new("S").ivar_encoded("s", "{S=ii}").finish(0);
        assert!(matches!(unsized_field, Err(MetadataError::InvalidLayout { .. })));

        let small = ClassBuilder::new("Small")
            .ivar("a", TypeTag::object())
            .instance_size(8)
            .finish(0);
        assert!(matches!(small, Err(MetadataError::InvalidLayout { .. })));
    }

    #[test]
    fn test_layout_overflow_is_an_error() {
        let fixed = ClassBuilder::new("Big")
            .ivar_sized("x", TypeTag::object(), usize::MAX - 2, 8)
            .finish(0);
        assert!(matches!(fixed, Err(MetadataError::InvalidLayout { .. })));

        let after_fixed = ClassBuilder::new("Edge")
            .ivar_sized("blob", TypeTag::Struct("Blob".to_string()), WORD_SIZE, usize::MAX - 2 * WORD_SIZE)
            .ivar("tail", TypeTag::object())
            .finish(0);
        assert!(matches!(after_fixed, Err(MetadataError::InvalidLayout { .. })));

        let unaligned_end = ClassBuilder::new("Odd")
            .ivar_sized("bytes", TypeTag::Struct("Bytes".to_string()), WORD_SIZE, usize::MAX - WORD_SIZE - 1)
            .finish(0);
        assert!(matches!(unaligned_end, Err(MetadataError::InvalidLayout { .. })));
    }

    #[test]
    fn test_explicit_size_for_struct_field() {
        let class = ClassBuilder::new("Framed")
            .ivar_sized("frame", TypeTag::parse("{Rect=dddd}"), WORD_SIZE, 32)
            .ivar("next", TypeTag::object())
            .finish(0)
            .unwrap();
        assert_eq!(class.field("frame").unwrap().end(), Some(WORD_SIZE + 32));
        assert_eq!(class.field("next").unwrap().offset(), WORD_SIZE + 32);
        assert_eq!(class.instance_size(), 2 * WORD_SIZE + 32);
    }

    #[test]
    fn test_method_scopes_kept_apart() {
        let class = ClassBuilder::new("M")
            .instance_method("describe")
            .class_method("new")
            .class_method("alloc")
            .finish(0)
            .unwrap();
        assert_eq!(class.methods(MethodScope::Instance), &["describe".to_string()]);
        assert_eq!(class.methods(MethodScope::ClassLevel).len(), 2);
    }
}
