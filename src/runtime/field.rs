// Thu Oct 15 2026 - Alex

use crate::runtime::TypeTag;
use serde::Serialize;
use std::fmt;

/// One instance field as declared by a class: name, type, byte offset from the object start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDecl {
    name: String,
    type_tag: TypeTag,
    offset: usize,
    size: usize,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, type_tag: TypeTag, offset: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            type_tag,
            offset,
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_tag(&self) -> &TypeTag {
        &self.type_tag
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// One past the last byte, or `None` if the field runs off the end of the address space.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.size)
    }
}

impl fmt::Display for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ +{:#x}: {} ({} bytes)", self.name, self.offset, self.type_tag, self.size)
    }
}
