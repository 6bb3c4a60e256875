// Sat Oct 17 2026 - Alex

use crate::memory::{Address, FaultKind, WORD_SIZE};
use crate::runtime::TypeTag;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Bytes(Vec<u8>),
    /// Sentinel for a field whose memory could not be read.
    Unreadable(FaultKind),
}

impl FieldValue {
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Unreadable(_) => None,
        }
    }

    /// Native-endian unsigned value of up to eight bytes.
    pub fn as_u64(&self) -> Option<u64> {
        let bytes = self.bytes()?;
        if bytes.is_empty() || bytes.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        if cfg!(target_endian = "little") {
            buf[..bytes.len()].copy_from_slice(bytes);
        } else {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
        }
        Some(u64::from_ne_bytes(buf))
    }

    /// The value as an address, if it is exactly one word.
    pub fn pointer(&self) -> Option<Address> {
        let bytes = self.bytes()?;
        let word: [u8; WORD_SIZE] = bytes.try_into().ok()?;
        Some(Address::new(usize::from_ne_bytes(word)))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "{}", crate::utils::hex_string_spaced(bytes)),
            Self::Unreadable(kind) => write!(f, "<unreadable: {}>", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRecord {
    pub name: String,
    pub type_tag: TypeTag,
    pub declaring_class: String,
    pub offset: usize,
    pub value: FieldValue,
    /// The declared type is a word-sized address a caller may pass to `classify`.
    pub is_pointer_shaped: bool,
}

impl fmt::Display for FieldRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} +{:#x} ({}) = {}",
            self.declaring_class, self.name, self.offset, self.type_tag, self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodRecord {
    pub selector_name: String,
    pub is_class_level: bool,
}

impl fmt::Display for MethodRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = if self.is_class_level { '+' } else { '-' };
        write!(f, "{}{}", sigil, self.selector_name)
    }
}

/// Why the class chain stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorFailure {
    pub class: String,
    pub reason: String,
}

/// Fields of one object. `ancestor_failure` is set when only part of the class chain could be
/// walked; `fields` then holds everything gathered up to that point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub object: Address,
    pub class_name: String,
    pub fields: Vec<FieldRecord>,
    pub ancestor_failure: Option<AncestorFailure>,
}

impl FieldReport {
    pub fn is_complete(&self) -> bool {
        self.ancestor_failure.is_none()
    }

    pub fn field(&self, name: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|record| record.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|record| record.name.as_str()).collect()
    }
}
