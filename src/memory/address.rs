// Mon Oct 12 2026 - Alex

use crate::memory::MemoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Untrusted machine address. Nothing about it is known until it has been probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    value: usize,
}

impl Address {
    pub const fn new(value: usize) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self { value: ptr as usize }
    }

    pub fn from_ref<T>(value: &T) -> Self {
        Self::from_ptr(value as *const T)
    }

    pub const fn as_usize(&self) -> usize {
        self.value
    }

    pub fn as_u64(&self) -> u64 {
        self.value as u64
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.value as *const u8
    }

    pub const fn is_null(&self) -> bool {
        self.value == 0
    }

    pub fn is_aligned(&self, alignment: usize) -> bool {
        alignment == 0 || self.value % alignment == 0
    }

    pub fn align_down(&self, alignment: usize) -> Self {
        Self { value: self.value & !(alignment - 1) }
    }

    pub fn checked_add(&self, offset: usize) -> Option<Self> {
        self.value.checked_add(offset).map(Self::new)
    }

    pub fn wrapping_add(&self, offset: usize) -> Self {
        Self { value: self.value.wrapping_add(offset) }
    }

    /// Whether `[self, self + len)` fits in the address space.
    pub fn span_fits(&self, len: usize) -> bool {
        len == 0 || self.value.checked_add(len - 1).is_some()
    }

    pub fn is_within_range(&self, start: Self, end: Self) -> bool {
        self.value >= start.value && self.value < end.value
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

impl FromStr for Address {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            usize::from_str_radix(&hex.replace('_', ""), 16)
        } else if trimmed.starts_with('-') {
            trimmed.parse::<isize>().map(|v| v as usize)
        } else {
            trimmed.parse::<usize>()
        };
        parsed
            .map(Self::new)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl From<usize> for Address {
    fn from(value: usize) -> Self {
        Self::new(value)
    }
}

impl From<Address> for usize {
    fn from(addr: Address) -> Self {
        addr.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_decimal() {
        assert_eq!("0x1000".parse::<Address>().unwrap(), Address::new(0x1000));
        assert_eq!("0XdeAD_beef".parse::<Address>().unwrap(), Address::new(0xdead_beef));
        assert_eq!("4096".parse::<Address>().unwrap(), Address::new(4096));
        assert_eq!("-1".parse::<Address>().unwrap(), Address::new(usize::MAX));
        assert!("zz".parse::<Address>().is_err());
    }

    #[test]
    fn test_span_fits() {
        assert!(Address::new(usize::MAX).span_fits(1));
        assert!(!Address::new(usize::MAX).span_fits(2));
        assert!(Address::new(usize::MAX).span_fits(0));
        assert!(Address::new(0x1000).span_fits(4096));
    }

    #[test]
    fn test_alignment() {
        let addr = Address::new(0x1003);
        assert!(!addr.is_aligned(WORD_SIZE));
        assert_eq!(addr.align_down(8), Address::new(0x1000));
        assert!(Address::new(0x1008).is_aligned(8));
    }
}
