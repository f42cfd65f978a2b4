//! Decoding raw property bytes according to their wire type.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use encoding_rs::Encoding;

use crate::property::{PT_BINARY, PT_STRING8, PT_SYSTIME, PT_UNICODE, PT_UNSPECIFIED};
use crate::time::ticks_to_datetime;

/// A decoded property value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Timestamp(DateTime<Utc>),
    /// The bytes were not decoded; the marker says why.
    Unsupported(String),
}

impl PropertyValue {
    /// Decodes `data` as `wire_type`. Never fails: anything that cannot be
    /// decoded becomes [`PropertyValue::Unsupported`].
    pub fn decode(wire_type: u16, data: &[u8], narrow_charset: &'static Encoding) -> Self {
        match wire_type {
            PT_STRING8 => Self::Text(decode_narrow(data, narrow_charset)),
            PT_UNICODE => Self::Text(decode_wide(data)),
            PT_SYSTIME => decode_systime(data),
            PT_BINARY => Self::Unsupported(format!("binary wire type 0x{PT_BINARY:04X}")),
            PT_UNSPECIFIED => Self::Unsupported("-1".to_string()),
            other => Self::Unsupported(format!("unsupported wire type 0x{other:04X}")),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Unsupported(marker) => f.write_str(marker),
        }
    }
}

/// Decodes an 8-bit string in the given code page.
pub fn decode_narrow(data: &[u8], charset: &'static Encoding) -> String {
    let (text, had_errors) = charset.decode_without_bom_handling(data);
    if had_errors {
        tracing::debug!(charset = charset.name(), "Replaced malformed bytes in narrow string");
    }
    text.into_owned()
}

/// Decodes UTF-16LE bytes. A trailing odd byte is dropped and unpaired
/// surrogates become U+FFFD.
///
/// Each byte pair yields one `char` for BMP text, so `N` bytes give
/// `N / 2` chars. A surrogate pair collapses into a single `char`, making
/// non-BMP text shorter than that.
pub fn decode_wide(data: &[u8]) -> String {
    let units = data
        .chunks_exact(2)
        .map(|pair| (u16::from(pair[1]) << 8) | u16::from(pair[0]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn decode_systime(data: &[u8]) -> PropertyValue {
    let Some(head) = data.first_chunk::<8>() else {
        return PropertyValue::Unsupported(format!(
            "systime needs 8 bytes, stream has {}",
            data.len()
        ));
    };
    let ticks = u64::from_be_bytes(*head);
    match ticks_to_datetime(ticks) {
        Some(ts) => PropertyValue::Timestamp(ts),
        None => PropertyValue::Unsupported(format!("systime 0x{ticks:016X} out of range")),
    }
}
