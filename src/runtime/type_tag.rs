// Thu Oct 15 2026 - Alex

use crate::memory::WORD_SIZE;
use serde::Serialize;
use std::fmt;

/// Deepest qualifier, pointer or array nesting `parse` accepts.
pub const MAX_NESTING: usize = 64;

/// Declared type of an instance field, in the usual runtime type-encoding alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    Primitive(PrimitiveType),
    /// `@` or `@"ClassName"`
    Object(Option<String>),
    /// `#`
    Class,
    /// `:`
    Selector,
    /// `*`
    CString,
    /// `@?`
    Block,
    Pointer(Box<TypeTag>),
    Array(Box<TypeTag>, usize),
    /// `{Name=...}`; the size comes from the field declaration.
    Struct(String),
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Char,
    Short,
    Int,
    /// `l` is always 32 bits in the encoding.
    Long,
    LongLong,
    UChar,
    UShort,
    UInt,
    ULong,
    ULongLong,
    Float,
    Double,
    Bool,
    Void,
}

impl PrimitiveType {
    pub fn size(self) -> usize {
        match self {
            Self::Void => 0,
            Self::Char | Self::UChar | Self::Bool => 1,
            Self::Short | Self::UShort => 2,
            Self::Int | Self::UInt | Self::Long | Self::ULong | Self::Float => 4,
            Self::LongLong | Self::ULongLong | Self::Double => 8,
        }
    }

    pub fn alignment(self) -> usize {
        self.size().max(1)
    }

    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            b'c' => Self::Char,
            b's' => Self::Short,
            b'i' => Self::Int,
            b'l' => Self::Long,
            b'q' => Self::LongLong,
            b'C' => Self::UChar,
            b'S' => Self::UShort,
            b'I' => Self::UInt,
            b'L' => Self::ULong,
            b'Q' => Self::ULongLong,
            b'f' => Self::Float,
            b'd' => Self::Double,
            b'B' => Self::Bool,
            b'v' => Self::Void,
            _ => return None,
        })
    }

    fn code(self) -> char {
        match self {
            Self::Char => 'c',
            Self::Short => 's',
            Self::Int => 'i',
            Self::Long => 'l',
            Self::LongLong => 'q',
            Self::UChar => 'C',
            Self::UShort => 'S',
            Self::UInt => 'I',
            Self::ULong => 'L',
            Self::ULongLong => 'Q',
            Self::Float => 'f',
            Self::Double => 'd',
            Self::Bool => 'B',
            Self::Void => 'v',
        }
    }
}

impl TypeTag {
    pub fn object() -> Self {
        Self::Object(None)
    }

    pub fn object_of(class: &str) -> Self {
        Self::Object(Some(class.to_string()))
    }

    /// Parse an encoding string. Anything not fully understood becomes `Unknown`.
    pub fn parse(encoding: &str) -> Self {
        match parse_prefix(encoding.as_bytes(), 0) {
            Some((tag, rest)) if rest.is_empty() => tag,
            _ => Self::Unknown(encoding.to_string()),
        }
    }

    /// Byte size, if the tag alone determines it.
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Primitive(ty) => Some(ty.size()),
            Self::Object(_) | Self::Class | Self::Selector | Self::CString | Self::Block => {
                Some(WORD_SIZE)
            }
            Self::Pointer(_) => Some(WORD_SIZE),
            Self::Array(elem, count) => elem.size()?.checked_mul(*count),
            Self::Struct(_) | Self::Unknown(_) => None,
        }
    }

    pub fn alignment(&self) -> usize {
        match self {
            Self::Primitive(ty) => ty.alignment(),
            Self::Array(elem, _) => elem.alignment(),
            _ => WORD_SIZE,
        }
    }

    /// Whether values of this type are addresses a caller might hand back to `classify`.
    pub fn is_pointer_shaped(&self) -> bool {
        matches!(
            self,
            Self::Object(_) | Self::Class | Self::Selector | Self::CString | Self::Block | Self::Pointer(_)
        )
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn encoding(&self) -> String {
        match self {
            Self::Primitive(ty) => ty.code().to_string(),
            Self::Object(None) => "@".to_string(),
            Self::Object(Some(name)) => format!("@\"{}\"", name),
            Self::Class => "#".to_string(),
            Self::Selector => ":".to_string(),
            Self::CString => "*".to_string(),
            Self::Block => "@?".to_string(),
            Self::Pointer(inner) => format!("^{}", inner.encoding()),
            Self::Array(elem, count) => format!("[{}{}]", count, elem.encoding()),
            Self::Struct(name) => format!("{{{}}}", name),
            Self::Unknown(raw) => raw.clone(),
        }
    }
}

fn parse_prefix(bytes: &[u8], depth: usize) -> Option<(TypeTag, &[u8])> {
    if depth > MAX_NESTING {
        return None;
    }
    let (&first, rest) = bytes.split_first()?;
    if let Some(ty) = PrimitiveType::from_code(first) {
        return Some((TypeTag::Primitive(ty), rest));
    }
    match first {
        // const qualifier
        b'r' => parse_prefix(rest, depth + 1),
        b'*' => Some((TypeTag::CString, rest)),
        b'#' => Some((TypeTag::Class, rest)),
        b':' => Some((TypeTag::Selector, rest)),
        b'@' => match rest.first() {
            Some(b'?') => Some((TypeTag::Block, &rest[1..])),
            Some(b'"') => {
                let close = rest[1..].iter().position(|&b| b == b'"')?;
                let name = std::str::from_utf8(&rest[1..1 + close]).ok()?;
                let tag = if name.is_empty() {
                    TypeTag::Object(None)
                } else {
                    TypeTag::Object(Some(name.to_string()))
                };
                Some((tag, &rest[close + 2..]))
            }
            _ => Some((TypeTag::Object(None), rest)),
        },
        b'^' => {
            let (inner, rest) = parse_prefix(rest, depth + 1)?;
            Some((TypeTag::Pointer(Box::new(inner)), rest))
        }
        b'[' => {
            let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
            let count = std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()?;
            let (elem, rest) = parse_prefix(&rest[digits..], depth + 1)?;
            let (&close, rest) = rest.split_first()?;
            if close != b']' {
                return None;
            }
            Some((TypeTag::Array(Box::new(elem), count), rest))
        }
        b'{' => {
            let name_len = rest.iter().position(|&b| b == b'=' || b == b'}')?;
            let name = std::str::from_utf8(&rest[..name_len]).ok()?.to_string();
            let mut depth = 1usize;
            for (i, &b) in rest.iter().enumerate() {
                match b {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some((TypeTag::Struct(name), &rest[i + 1..]));
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(ty) => write!(f, "{:?}", ty),
            Self::Object(None) => write!(f, "id"),
            Self::Object(Some(name)) => write!(f, "{} *", name),
            Self::Class => write!(f, "Class"),
            Self::Selector => write!(f, "SEL"),
            Self::CString => write!(f, "char *"),
            Self::Block => write!(f, "block"),
            Self::Pointer(inner) => write!(f, "{} *", inner),
            Self::Array(elem, count) => write!(f, "{}[{}]", elem, count),
            Self::Struct(name) => write!(f, "struct {}", name),
            Self::Unknown(raw) => write!(f, "?{}", raw),
        }
    }
}
