// Mon Oct 12 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Probe of {len} bytes exceeds the {max} byte limit")]
    ProbeTooLarge { len: usize, max: usize },
    #[error("Fault guard invariant violated: {0}")]
    GuardInvariantViolation(String),
    #[error("Fault guard is poisoned after an earlier violation: {0}")]
    GuardPoisoned(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Maps parse error: {0}")]
    MapsParse(String),
}
