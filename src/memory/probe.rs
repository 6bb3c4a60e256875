// Tue Oct 13 2026 - Alex

use crate::memory::{guard, Address, FaultKind, MemoryError, MemoryProbe, WORD_SIZE};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_MAX_PROBE_LEN: usize = 4096;

/// Result of one guarded read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    Readable(Vec<u8>),
    Unreadable(FaultKind),
}

impl ProbeOutcome {
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Readable(_))
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Readable(bytes) => Some(bytes),
            Self::Unreadable(_) => None,
        }
    }

    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            Self::Readable(_) => None,
            Self::Unreadable(kind) => Some(*kind),
        }
    }

    /// Native-endian pointer-sized value, if exactly one word was read.
    pub fn as_word(&self) -> Option<usize> {
        let bytes = self.bytes()?;
        let word: [u8; WORD_SIZE] = bytes.try_into().ok()?;
        Some(usize::from_ne_bytes(word))
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Readable(bytes) => write!(f, "readable ({} bytes)", bytes.len()),
            Self::Unreadable(kind) => write!(f, "unreadable ({})", kind),
        }
    }
}

/// Read `len` bytes at `address` without letting a bad address take the process down.
pub fn probe(address: Address, len: usize) -> Result<ProbeOutcome, MemoryError> {
    if len == 0 {
        return Ok(ProbeOutcome::Readable(Vec::new()));
    }
    if !address.span_fits(len) {
        return Ok(ProbeOutcome::Unreadable(FaultKind::AddressOverflow));
    }
    guard::guarded_read(address, len)
}

/// The production `MemoryProbe`: every read goes through the process fault guard.
#[derive(Debug, Clone)]
pub struct FaultGuardedProber {
    max_len: usize,
}

impl FaultGuardedProber {
    pub fn new() -> Self {
        Self {
            max_len: DEFAULT_MAX_PROBE_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

impl Default for FaultGuardedProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for FaultGuardedProber {
    fn probe(&self, address: Address, len: usize) -> Result<ProbeOutcome, MemoryError> {
        if len > self.max_len {
            return Err(MemoryError::ProbeTooLarge {
                len,
                max: self.max_len,
            });
        }
        probe(address, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{arch, fault_dispositions, guard_phase, GuardPhase};
    use crate::utils::pages::ScratchPages;

    #[test]
    fn test_zero_length_never_touches_memory() {
        let outcome = probe(Address::new(0xdead), 0).unwrap();
        assert_eq!(outcome, ProbeOutcome::Readable(Vec::new()));
        assert_eq!(probe(Address::zero(), 0).unwrap(), ProbeOutcome::Readable(Vec::new()));
        assert_eq!(probe(Address::new(usize::MAX), 0).unwrap(), ProbeOutcome::Readable(Vec::new()));
    }

    #[test]
    fn test_readable_stack_value() {
        if !arch::SUPPORTED {
            return;
        }
        let value: u64 = 0x1122_3344_5566_7788;
        let outcome = probe(Address::from_ref(&value), 8).unwrap();
        assert_eq!(outcome, ProbeOutcome::Readable(value.to_ne_bytes().to_vec()));
    }

    #[test]
    fn test_null_and_low_addresses_are_unreadable() {
        if !arch::SUPPORTED {
            return;
        }
        for raw in [0usize, 1, 8, 0x10, 0xfff] {
            let outcome = probe(Address::new(raw), 8).unwrap();
            assert_eq!(outcome, ProbeOutcome::Unreadable(FaultKind::Unmapped), "address {:#x}", raw);
        }
    }

    #[test]
    fn test_wild_addresses_survive() {
        if !arch::SUPPORTED {
            return;
        }
        for raw in [usize::MAX - 7, 0xdead_beef_dead_beef, 0x8000_0000_0000_0000] {
            let outcome = probe(Address::new(raw), 8).unwrap();
            assert!(!outcome.is_readable(), "address {:#x}", raw);
        }
        assert_eq!(guard_phase(), GuardPhase::Disarmed);
    }

    #[test]
    fn test_overflowing_span() {
        let outcome = probe(Address::new(usize::MAX), 2).unwrap();
        assert_eq!(outcome, ProbeOutcome::Unreadable(FaultKind::AddressOverflow));
    }

    #[test]
    fn test_no_access_page_restores_dispositions() {
        if !arch::SUPPORTED {
            return;
        }
        let pages = ScratchPages::new(2).unwrap();
        pages.protect_tail(1).unwrap();
        let before = fault_dispositions().unwrap();

        let blocked = pages.page(1);
        let outcome = probe(blocked, 16).unwrap();
        assert_eq!(outcome, ProbeOutcome::Unreadable(FaultKind::AccessDenied));

        let after = fault_dispositions().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_partial_read_exposes_no_bytes() {
        if !arch::SUPPORTED {
            return;
        }
        let pages = ScratchPages::new(2).unwrap();
        pages.protect_tail(1).unwrap();
        let straddling = Address::new(pages.page(1).as_usize() - 4);
        let outcome = probe(straddling, 8).unwrap();
        assert_eq!(outcome.bytes(), None);
        assert_eq!(outcome.fault(), Some(FaultKind::AccessDenied));
    }

    #[test]
    fn test_unmapped_page() {
        if !arch::SUPPORTED {
            return;
        }
        let pages = ScratchPages::new(2).unwrap();
        let hole = pages.page(1);
        pages.unmap_tail(1).unwrap();
        let outcome = probe(hole, 8).unwrap();
        assert_eq!(outcome, ProbeOutcome::Unreadable(FaultKind::Unmapped));
    }

    #[test]
    fn test_prober_limit() {
        let prober = FaultGuardedProber::new().with_max_len(16);
        let value = [0u8; 32];
        let err = prober.probe(Address::from_ref(&value), 32).unwrap_err();
        assert!(matches!(err, MemoryError::ProbeTooLarge { len: 32, max: 16 }));
    }

    #[test]
    fn test_as_word() {
        let word = 0x1234usize;
        let outcome = ProbeOutcome::Readable(word.to_ne_bytes().to_vec());
        assert_eq!(outcome.as_word(), Some(0x1234));
        assert_eq!(ProbeOutcome::Readable(vec![1, 2]).as_word(), None);
        assert_eq!(ProbeOutcome::Unreadable(FaultKind::Unmapped).as_word(), None);
    }
}
