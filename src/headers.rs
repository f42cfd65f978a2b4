//! Splitting the transport header block into a multi-valued map.

use std::collections::BTreeMap;

use crate::error::Result;

/// Transport headers keyed by canonical name (`Content-Type`), each with its
/// values in block order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, Vec<String>>,
}

impl Headers {
    /// Parses a raw `Name: value` block. Folded continuation lines are joined
    /// and RFC 2047 encoded words are decoded.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut headers = Self::default();
        let raw = raw.trim_start_matches(['\r', '\n']).trim_end_matches('\0');
        if raw.trim().is_empty() {
            return Ok(headers);
        }
        let (parsed, _) = mailparse::parse_headers(raw.as_bytes())?;
        for header in parsed {
            headers
                .entries
                .entry(canonical_key(&header.get_key()))
                .or_default()
                .push(header.get_value().trim().to_string());
        }
        Ok(headers)
    }

    /// First value of `name`, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_key(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `content-TYPE` -> `Content-Type`.
pub fn canonical_key(name: &str) -> String {
    let mut upper = true;
    name.trim()
        .chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
