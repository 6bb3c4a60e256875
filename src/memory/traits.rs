// Tue Oct 13 2026 - Alex

use crate::memory::{Address, MemoryError, ProbeOutcome, WORD_SIZE};

/// Crash-free reads of untrusted memory. `Unreadable` is a normal outcome; `Err` is reserved
/// for requests the probe refuses and for guard failures.
pub trait MemoryProbe: Send + Sync {
    fn probe(&self, address: Address, len: usize) -> Result<ProbeOutcome, MemoryError>;

    fn probe_word(&self, address: Address) -> Result<ProbeOutcome, MemoryError> {
        self.probe(address, WORD_SIZE)
    }
}
