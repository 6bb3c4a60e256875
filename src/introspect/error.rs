// Sat Oct 17 2026 - Alex

use crate::memory::{Address, FaultKind, MemoryError};
use crate::runtime::MetadataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntrospectError {
    #[error("Unreadable memory: {0}")]
    UnreadableMemory(FaultKind),
    #[error("Not an object: {0}")]
    NotAnObject(Address),
    #[error("Ancestor resolution failed for '{class}': {reason}")]
    AncestorResolutionFailed { class: String, reason: String },
    #[error("Fault guard invariant violated, probing halted: {0}")]
    FatalGuardInvariantViolation(String),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Memory error: {0}")]
    Memory(MemoryError),
}

impl IntrospectError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalGuardInvariantViolation(_))
    }
}

impl From<MemoryError> for IntrospectError {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::GuardInvariantViolation(reason) | MemoryError::GuardPoisoned(reason) => {
                Self::FatalGuardInvariantViolation(reason)
            }
            other => Self::Memory(other),
        }
    }
}
