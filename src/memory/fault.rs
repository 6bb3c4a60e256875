// Mon Oct 12 2026 - Alex

use serde::Serialize;
use std::fmt;

const SEGV_MAPERR: i32 = 1;
const SEGV_ACCERR: i32 = 2;
const BUS_ADRALN: i32 = 1;

/// Why a guarded read could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FaultKind {
    /// No mapping at the address.
    Unmapped,
    /// Mapped, but the protection forbids reading.
    AccessDenied,
    /// Alignment trap.
    Misaligned,
    /// Bus error, e.g. a file mapping past end of file.
    BusError,
    /// The span wraps around the end of the address space; nothing was touched.
    AddressOverflow,
    Other { signal: i32, code: i32 },
}

impl FaultKind {
    pub fn from_signal(signal: i32, code: i32) -> Self {
        match (signal, code) {
            (libc::SIGSEGV, SEGV_MAPERR) => Self::Unmapped,
            (libc::SIGSEGV, SEGV_ACCERR) => Self::AccessDenied,
            (libc::SIGBUS, BUS_ADRALN) => Self::Misaligned,
            (libc::SIGBUS, _) => Self::BusError,
            (signal, code) => Self::Other { signal, code },
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unmapped => write!(f, "unmapped"),
            Self::AccessDenied => write!(f, "access denied"),
            Self::Misaligned => write!(f, "misaligned"),
            Self::BusError => write!(f, "bus error"),
            Self::AddressOverflow => write!(f, "address overflow"),
            Self::Other { signal, code } => write!(f, "signal {} (code {})", signal, code),
        }
    }
}
