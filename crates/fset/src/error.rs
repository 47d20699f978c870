//! Error types for field-set operations.

use thiserror::Error;

/// Errors that can occur while building, querying or parsing a field set.
#[derive(Debug, Error)]
pub enum FieldSetError {
    /// A value exists but could not be parsed as the requested type.
    #[error("cannot parse {raw:?} as {target} for key {key}")]
    Parse {
        key: String,
        raw: String,
        target: &'static str,
    },

    /// A throwing getter found no value at the key.
    #[error("no such key: {key}")]
    MissingKey { key: String },

    /// A throwing subset lookup found nothing at the key.
    #[error("no such subset: {key}")]
    MissingSubset { key: String },

    /// The input ended before any line was read.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,

    /// The input ended after some lines but before a terminator line.
    #[error("no end marker after {lines} line(s)")]
    MissingTerminator { lines: usize },

    /// A line exceeded the configured length limit.
    #[error("line {line} exceeds {limit} bytes")]
    LineTooLong { line: usize, limit: usize },

    /// A value and a subset (or two subsets) collide on the same name.
    #[error("conflict at {key}: {reason}")]
    Conflict { key: String, reason: String },

    /// A single-set put found a value already stored at the key.
    #[error("value already exists for key {key}")]
    DuplicateKey { key: String },

    /// The value contains a line terminator.
    #[error("value for key {key} contains a line terminator")]
    InvalidValue { key: String },

    /// The key contains a line terminator or the key/value separator.
    #[error("invalid key: {key:?}")]
    InvalidKey { key: String },

    /// The end marker would not be recognised as a terminator line.
    #[error("invalid end marker: {marker:?}")]
    InvalidEndMarker { marker: String },

    /// Attaching the subset would make the tree contain itself.
    #[error("attaching subset at {key} would create a cycle")]
    Cycle { key: String },

    /// I/O error while reading or writing a record.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FieldSetError {
    /// True for the name-collision family: `Conflict`, `DuplicateKey` and `Cycle`.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::DuplicateKey { .. } | Self::Cycle { .. }
        )
    }

    /// True for errors that describe malformed record framing.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedEndOfInput | Self::MissingTerminator { .. } | Self::LineTooLong { .. }
        )
    }

    pub(crate) fn conflict(key: &str, reason: impl Into<String>) -> Self {
        Self::Conflict {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for field-set operations.
pub type Result<T> = std::result::Result<T, FieldSetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_family() {
        assert!(FieldSetError::conflict("a", "taken").is_conflict());
        assert!(FieldSetError::DuplicateKey { key: "a".into() }.is_conflict());
        assert!(FieldSetError::Cycle { key: "a".into() }.is_conflict());
        assert!(!FieldSetError::MissingKey { key: "a".into() }.is_conflict());
    }

    #[test]
    fn framing_family() {
        assert!(FieldSetError::UnexpectedEndOfInput.is_framing());
        assert!(FieldSetError::MissingTerminator { lines: 3 }.is_framing());
        assert!(!FieldSetError::InvalidValue { key: "k".into() }.is_framing());
    }

    #[test]
    fn display_includes_context() {
        let err = FieldSetError::Parse {
            key: "port".into(),
            raw: "eighty".into(),
            target: "i32",
        };
        let msg = err.to_string();
        assert!(msg.contains("port"));
        assert!(msg.contains("eighty"));
        assert!(msg.contains("i32"));
    }
}
