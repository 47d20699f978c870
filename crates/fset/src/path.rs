//! Dotted-key addressing and the separator characters of the text format.

use crate::error::{FieldSetError, Result};

/// Splits a key into nested subset segments.
pub const LEVEL_SEPARATOR: char = '.';
/// Joins several logical values into one stored value.
pub const MULTI_VALUE_SEPARATOR: char = ';';
/// Separates a key from its value on a line.
pub const KEY_VALUE_SEPARATOR: char = '=';
/// Terminator written when a set carries no end marker of its own.
pub const DEFAULT_END_MARKER: &str = "End";

/// Where a key lands relative to the node it is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route<'k> {
    /// The key names an entry of this node.
    Here(&'k str),
    /// The key continues into the child `segment` with the `rest` of the path.
    Descend { segment: &'k str, rest: &'k str },
}

/// Route a key on its first level separator.
///
/// A key that starts with the separator descends into the child named `""`.
pub fn route(key: &str) -> Route<'_> {
    match key.split_once(LEVEL_SEPARATOR) {
        None => Route::Here(key),
        Some((segment, rest)) => Route::Descend { segment, rest },
    }
}

/// Join a prefix and a segment with the level separator.
pub fn join(prefix: &str, segment: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + segment.len() + 1);
    out.push_str(prefix);
    out.push_str(segment);
    out.push(LEVEL_SEPARATOR);
    out
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if has_line_break(key) || key.contains(KEY_VALUE_SEPARATOR) {
        return Err(FieldSetError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_value(key: &str, value: &str) -> Result<()> {
    if has_line_break(value) {
        return Err(FieldSetError::InvalidValue {
            key: key.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_end_marker(marker: &str) -> Result<()> {
    if has_line_break(marker) || marker.contains(KEY_VALUE_SEPARATOR) {
        return Err(FieldSetError::InvalidEndMarker {
            marker: marker.to_string(),
        });
    }
    Ok(())
}

/// Split a stored value into its logical values.
pub fn split_values(value: &str) -> Vec<String> {
    value.split(MULTI_VALUE_SEPARATOR).map(str::to_string).collect()
}

/// Join logical values into one stored value.
pub fn join_values<S: AsRef<str>>(values: &[S]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i != 0 {
            out.push(MULTI_VALUE_SEPARATOR);
        }
        out.push_str(v.as_ref());
    }
    out
}
