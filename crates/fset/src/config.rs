use serde::{Deserialize, Serialize};

/// Character encoding of a byte-oriented line source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is one code point.
    Latin1,
}

/// Options controlling how a record is parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Repeated keys are joined with `;` instead of rejected.
    pub allow_multiple: bool,
    /// Blank lines are skipped and a missing terminator is reported rather
    /// than failing the parse.
    ///
    /// A record written with an empty end marker ends in a blank line, so a
    /// tolerant reader skips its terminator and reads on into the next
    /// record. Read such records strictly.
    pub tolerant: bool,
    /// When `false`, keys and values are interned through a shared pool.
    pub short_lived: bool,
    /// Encoding of byte sources.
    pub encoding: Encoding,
    /// Maximum line length in bytes, excluding the line break.
    pub max_line_length: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            tolerant: false,
            short_lived: true,
            encoding: Encoding::Utf8,
            max_line_length: None,
        }
    }
}

impl ReadOptions {
    /// Strict options with repeated keys aggregated.
    pub fn multiple() -> Self {
        Self {
            allow_multiple: true,
            ..Default::default()
        }
    }

    /// Options that log and continue on malformed framing.
    pub fn tolerant() -> Self {
        Self {
            tolerant: true,
            ..Default::default()
        }
    }
}

/// Order in which entries are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Order {
    /// The order the maps currently hold, which is insertion order.
    #[default]
    Insertion,
    /// Keys and subset names sorted bytewise at every level.
    Sorted,
}

/// Options controlling how a record is written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    pub order: Order,
}
