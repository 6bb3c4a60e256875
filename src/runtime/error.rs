// Thu Oct 15 2026 - Alex

use crate::memory::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Unknown class descriptor at {0}")]
    UnknownClass(Address),
    #[error("Class not registered: {0}")]
    UnknownClassName(String),
    #[error("Superclass '{superclass}' of '{class}' is not registered")]
    UnresolvedSuperclass { class: String, superclass: String },
    #[error("Class already registered: {0}")]
    DuplicateClass(String),
    #[error("Invalid layout for '{class}': {reason}")]
    InvalidLayout { class: String, reason: String },
    #[error("Allocation of {0} bytes failed")]
    AllocationFailed(usize),
    #[error("Address {0} was not allocated by this heap")]
    NotAllocated(Address),
    #[error("Write of {len} bytes at offset {offset} exceeds the {size} byte allocation")]
    OutOfBounds { offset: usize, len: usize, size: usize },
}
