// Sat Oct 17 2026 - Alex

use crate::memory::{Address, FaultKind};
use crate::runtime::ClassRef;
use serde::Serialize;
use std::fmt;

/// First check an address failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Null,
    BelowMinimumAddress,
    Misaligned,
    HeaderUnreadable(FaultKind),
    /// The header word, after masking, is not a known class descriptor.
    UnknownClass(Address),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::BelowMinimumAddress => write!(f, "below minimum object address"),
            Self::Misaligned => write!(f, "misaligned"),
            Self::HeaderUnreadable(kind) => write!(f, "header unreadable ({})", kind),
            Self::UnknownClass(isa) => write!(f, "header {} is not a known class", isa),
        }
    }
}

/// Best-effort answer to "does this address hold an object". Heuristic: unrelated memory that
/// happens to contain a registered descriptor address is reported as an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectVerdict {
    pub address: Address,
    pub is_likely_object: bool,
    /// `None` when no allocation size could be obtained.
    pub allocation_large_enough: Option<bool>,
    pub class: Option<ClassRef>,
    pub rejection: Option<Rejection>,
}

impl ObjectVerdict {
    pub fn rejected(address: Address, rejection: Rejection) -> Self {
        Self {
            address,
            is_likely_object: false,
            allocation_large_enough: None,
            class: None,
            rejection: Some(rejection),
        }
    }

    pub fn object(address: Address, class: ClassRef, allocation_large_enough: Option<bool>) -> Self {
        Self {
            address,
            is_likely_object: true,
            allocation_large_enough,
            class: Some(class),
            rejection: None,
        }
    }

    pub fn confidence(&self) -> f64 {
        if !self.is_likely_object {
            return 0.0;
        }
        match self.allocation_large_enough {
            Some(true) => 1.0,
            None => 0.75,
            Some(false) => 0.25,
        }
    }
}

impl fmt::Display for ObjectVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.class, &self.rejection) {
            (Some(class), _) => write!(
                f,
                "{}: object of {} (allocation {}, confidence {:.2})",
                self.address,
                class,
                match self.allocation_large_enough {
                    Some(true) => "large enough",
                    Some(false) => "too small",
                    None => "unknown",
                },
                self.confidence()
            ),
            (None, Some(rejection)) => write!(f, "{}: not an object ({})", self.address, rejection),
            (None, None) => write!(f, "{}: not an object", self.address),
        }
    }
}
