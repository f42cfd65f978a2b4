use encoding_rs::{Encoding, WINDOWS_1252};

/// How date-routed properties (creation, last modification, client submit)
/// are turned into message dates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Binary tick payloads use the decoded instant; textual payloads are
    /// parsed as dates.
    #[default]
    ByWireType,
    /// Every payload goes through the textual date parser, so binary tick
    /// payloads leave the field unset.
    TextOnly,
}

/// Decoding knobs shared by every property of one container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    pub narrow_charset: &'static Encoding,
    pub timestamp_policy: TimestampPolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            // what the "ISO-8859-1" label resolves to
            narrow_charset: Encoding::for_label(b"iso-8859-1").unwrap_or(WINDOWS_1252),
            timestamp_policy: TimestampPolicy::default(),
        }
    }
}

impl DecodeOptions {
    pub fn with_narrow_charset(mut self, encoding: &'static Encoding) -> Self {
        self.narrow_charset = encoding;
        self
    }

    /// Selects the narrow charset by label (`"windows-1251"`, `"koi8-r"`...).
    /// Unknown labels leave the current charset in place.
    pub fn with_narrow_charset_label(self, label: &str) -> Self {
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => self.with_narrow_charset(encoding),
            None => {
                let current = self.narrow_charset.name();
                tracing::warn!(label, current, "Unknown charset label");
                self
            }
        }
    }

    pub fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }
}
