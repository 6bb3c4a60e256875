// Wed Oct 14 2026 - Alex

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Protection {
    None = 0,
    Read = 1,
    Write = 2,
    ReadWrite = 3,
    Execute = 4,
    ReadExecute = 5,
    WriteExecute = 6,
    ReadWriteExecute = 7,
}

impl Protection {
    pub fn from_flags(flags: u32) -> Self {
        match flags & 7 {
            1 => Self::Read,
            2 => Self::Write,
            3 => Self::ReadWrite,
            4 => Self::Execute,
            5 => Self::ReadExecute,
            6 => Self::WriteExecute,
            7 => Self::ReadWriteExecute,
            _ => Self::None,
        }
    }

    /// Parse the `rwxp` column of a maps line. The sharing flag is ignored.
    pub fn from_perms(perms: &str) -> Option<Self> {
        let bytes = perms.as_bytes();
        if bytes.len() < 3 {
            return None;
        }
        let mut flags = 0;
        for (i, (set, bit)) in [(b'r', 1u32), (b'w', 2), (b'x', 4)].iter().enumerate() {
            match bytes[i] {
                b'-' => {}
                c if c == *set => flags |= bit,
                _ => return None,
            }
        }
        Some(Self::from_flags(flags))
    }

    pub fn to_flags(self) -> u32 {
        self as u32
    }

    pub fn can_read(self) -> bool {
        self.to_flags() & 1 != 0
    }

    pub fn can_write(self) -> bool {
        self.to_flags() & 2 != 0
    }

    pub fn can_execute(self) -> bool {
        self.to_flags() & 4 != 0
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = self.to_flags();
        write!(
            f,
            "{}{}{}",
            if flags & 1 != 0 { 'r' } else { '-' },
            if flags & 2 != 0 { 'w' } else { '-' },
            if flags & 4 != 0 { 'x' } else { '-' }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_perms() {
        assert_eq!(Protection::from_perms("r-xp"), Some(Protection::ReadExecute));
        assert_eq!(Protection::from_perms("rw-s"), Some(Protection::ReadWrite));
        assert_eq!(Protection::from_perms("---p"), Some(Protection::None));
        assert_eq!(Protection::from_perms("rq-p"), None);
        assert_eq!(Protection::from_perms("r"), None);
        assert_eq!(Protection::ReadWriteExecute.to_string(), "rwx");
    }
}
