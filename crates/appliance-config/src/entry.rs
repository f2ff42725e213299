//! Tagged list entries
//!
//! Raw documents spell markers as string prefixes: `!value` excludes a
//! value, `~value` retracts the nearest earlier occurrence. They are parsed
//! once when a document is decoded, so the resolution code only ever sees
//! the closed set of variants below.

use std::fmt;

use serde::{Deserialize, Serialize};

const EXCLUDE_MARKER: char = '!';
const RETRACT_MARKER: char = '~';

/// One element of a mergeable string list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListEntry {
    /// A literal value.
    Plain(String),
    /// `!value`: drop every occurrence of `value` from the resolved list.
    Exclude(String),
    /// `~value`: cancel the nearest earlier entry spelled `value`.
    Retract(String),
}

impl ListEntry {
    /// Parse a raw list element, recognising the `!` and `~` prefixes.
    pub fn parse(raw: &str) -> Self {
        if let Some(value) = raw.strip_prefix(EXCLUDE_MARKER) {
            Self::Exclude(value.to_string())
        } else if let Some(value) = raw.strip_prefix(RETRACT_MARKER) {
            Self::Retract(value.to_string())
        } else {
            Self::Plain(raw.to_string())
        }
    }

    /// Shorthand for a plain entry.
    pub fn plain(value: impl Into<String>) -> Self {
        Self::Plain(value.into())
    }

    /// The value without its marker.
    pub fn value(&self) -> &str {
        match self {
            Self::Plain(v) | Self::Exclude(v) | Self::Retract(v) => v,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Self::Plain(_))
    }

    /// True when this is a plain entry holding exactly `value`.
    pub fn is_plain_value(&self, value: &str) -> bool {
        matches!(self, Self::Plain(v) if v == value)
    }

    /// True when the raw spelling of this entry (marker included) is `raw`.
    pub fn is_spelled(&self, raw: &str) -> bool {
        match self {
            Self::Plain(v) => v == raw,
            Self::Exclude(v) => raw.strip_prefix(EXCLUDE_MARKER) == Some(v.as_str()),
            Self::Retract(v) => raw.strip_prefix(RETRACT_MARKER) == Some(v.as_str()),
        }
    }
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(v) => write!(f, "{}", v),
            Self::Exclude(v) => write!(f, "{}{}", EXCLUDE_MARKER, v),
            Self::Retract(v) => write!(f, "{}{}", RETRACT_MARKER, v),
        }
    }
}

impl From<String> for ListEntry {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for ListEntry {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<ListEntry> for String {
    fn from(entry: ListEntry) -> Self {
        entry.to_string()
    }
}

/// Parse a slice of raw strings into entries.
pub fn entries<S: AsRef<str>>(raw: &[S]) -> Vec<ListEntry> {
    raw.iter().map(|s| ListEntry::parse(s.as_ref())).collect()
}
