// Wed Oct 14 2026 - Alex

use crate::memory::Address;
use serde::Serialize;
use std::fmt;

/// Half-open `[start, end)` span of addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MemoryRange {
    start: Address,
    end: Address,
}

impl MemoryRange {
    pub fn new(start: Address, end: Address) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn size(&self) -> usize {
        self.end.as_usize() - self.start.as_usize()
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.is_within_range(self.start, self.end)
    }

    /// Bytes from `addr` to the end of the range, if `addr` is inside it.
    pub fn remaining_from(&self, addr: Address) -> Option<usize> {
        if self.contains(addr) {
            Some(self.end.as_usize() - addr.as_usize())
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
