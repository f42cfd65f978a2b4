//! Property stream names and the properties they carry.
//!
//! A message storage holds one stream per property, named
//! `__substg1.0_TTTTYYYY` where `TTTT` is the hex tag and `YYYY` the hex
//! wire type.

use std::fmt;

use crate::error::{MsgError, Result};

/// Prefix shared by every property stream name.
pub const PROPERTY_STREAM_PREFIX: &str = "__substg1.0_";

/// 8-bit string in the message code page.
pub const PT_STRING8: u16 = 0x001E;
/// UTF-16LE string.
pub const PT_UNICODE: u16 = 0x001F;
/// 64-bit tick count since 1601-01-01.
pub const PT_SYSTIME: u16 = 0x0040;
/// Opaque bytes.
pub const PT_BINARY: u16 = 0x0102;
/// Embedded object (attached messages).
pub const PT_OBJECT: u16 = 0x000D;
/// Wire type of a property whose type could not be determined (`-1`).
pub const PT_UNSPECIFIED: u16 = 0xFFFF;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyId {
    pub tag: u16,
    pub wire_type: u16,
}

impl PropertyId {
    pub fn new(tag: u16, wire_type: u16) -> Self {
        Self { tag, wire_type }
    }

    /// Parses a stream name into its tag and wire type.
    ///
    /// Returns `Ok(None)` for streams that are not property streams (no
    /// prefix), and an error when the prefix is present but either hex field
    /// is malformed.
    pub fn from_stream_name(name: &str) -> Result<Option<Self>> {
        let Some(rest) = name.strip_prefix(PROPERTY_STREAM_PREFIX) else {
            return Ok(None);
        };
        let tag = hex_field(name, rest.get(0..4), "tag")?;
        let wire_type = hex_field(name, rest.get(4..8), "wire type")?;
        Ok(Some(Self { tag, wire_type }))
    }

    /// The stream name this identifier would be stored under.
    pub fn stream_name(&self) -> String {
        format!("{PROPERTY_STREAM_PREFIX}{self}")
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}{:04X}", self.tag, self.wire_type)
    }
}

fn hex_field(name: &str, field: Option<&str>, what: &str) -> Result<u16> {
    let malformed = |reason: String| MsgError::PropertyName {
        name: name.to_string(),
        reason,
    };
    let digits = field.ok_or_else(|| malformed(format!("{what} field is truncated")))?;
    // from_str_radix tolerates a leading '+', the name format does not
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed(format!("{what} field {digits:?} is not hexadecimal")));
    }
    u16::from_str_radix(digits, 16).map_err(|e| malformed(format!("{what} field: {e}")))
}

/// One property stream read out of a container, before decoding.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageProperty {
    pub id: PropertyId,
    pub data: Vec<u8>,
}

impl MessageProperty {
    pub fn new(tag: u16, wire_type: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: PropertyId::new(tag, wire_type),
            data: data.into(),
        }
    }
}

impl fmt::Debug for MessageProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageProperty")
            .field("id", &format_args!("{}", self.id))
            .field("data", &self.data.len())
            .finish()
    }
}
