//! Typed accessors layered on the string store.
//!
//! Every getter comes in two flavours: `get_x(key)` surfaces
//! [`FieldSetError::MissingKey`] or [`FieldSetError::Parse`], while
//! `get_x_or(key, default)` falls back to `default` on either.

use std::str::FromStr;

use tracing::warn;

use crate::error::{FieldSetError, Result};
use crate::node::FieldSet;

/// Parse a boolean spelled `true`/`yes` or `false`/`no`, ignoring case.
pub fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") || s.eq_ignore_ascii_case("no") {
        Some(false)
    } else {
        None
    }
}

/// Parse an optional boolean, returning `default` when absent or malformed.
pub fn parse_bool_or(s: Option<&str>, default: bool) -> bool {
    s.and_then(parse_bool).unwrap_or(default)
}

fn parse_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl FieldSet {
    fn parsed<T>(&self, key: &str, target: &'static str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
        let raw = self.get_string(key)?;
        parse(&raw).ok_or_else(|| FieldSetError::Parse {
            key: key.to_string(),
            raw,
            target,
        })
    }

    fn from_str_value<T: FromStr>(&self, key: &str, target: &'static str) -> Result<T> {
        self.parsed(key, target, |s| s.parse().ok())
    }

    pub fn get_int(&self, key: &str) -> Result<i32> {
        self.from_str_value(key, "i32")
    }

    pub fn get_int_or(&self, key: &str, default: i32) -> i32 {
        self.get_int(key).unwrap_or(default)
    }

    pub fn get_long(&self, key: &str) -> Result<i64> {
        self.from_str_value(key, "i64")
    }

    pub fn get_long_or(&self, key: &str, default: i64) -> i64 {
        self.get_long(key).unwrap_or(default)
    }

    pub fn get_short(&self, key: &str) -> Result<i16> {
        self.from_str_value(key, "i16")
    }

    pub fn get_short_or(&self, key: &str, default: i16) -> i16 {
        self.get_short(key).unwrap_or(default)
    }

    pub fn get_double(&self, key: &str) -> Result<f64> {
        self.from_str_value(key, "f64")
    }

    pub fn get_double_or(&self, key: &str, default: f64) -> f64 {
        self.get_double(key).unwrap_or(default)
    }

    /// A value holding exactly one character.
    pub fn get_char(&self, key: &str) -> Result<char> {
        self.parsed(key, "char", parse_char)
    }

    pub fn get_char_or(&self, key: &str, default: char) -> char {
        self.get_char(key).unwrap_or(default)
    }

    /// A boolean value; see [`parse_bool`] for the accepted spellings.
    pub fn get_boolean(&self, key: &str) -> Result<bool> {
        self.parsed(key, "bool", parse_bool)
    }

    pub fn get_boolean_or(&self, key: &str, default: bool) -> bool {
        parse_bool_or(self.get(key).as_deref(), default)
    }

    /// All values at `key` parsed as `i32`.
    ///
    /// Returns `None` when the key is absent or when any element fails to
    /// parse; a partial array is never returned.
    pub fn get_int_array(&self, key: &str) -> Option<Vec<i32>> {
        let parts = self.get_all(key)?;
        let mut out = Vec::with_capacity(parts.len());
        for part in &parts {
            match part.parse() {
                Ok(n) => out.push(n),
                Err(e) => {
                    warn!(key, element = %part, error = %e, "cannot parse int array element");
                    return None;
                }
            }
        }
        Some(out)
    }

    pub fn put_int(&self, key: &str, value: i32) -> Result<()> {
        self.put_single(key, &value.to_string())
    }

    pub fn put_long(&self, key: &str, value: i64) -> Result<()> {
        self.put_single(key, &value.to_string())
    }

    pub fn put_short(&self, key: &str, value: i16) -> Result<()> {
        self.put_single(key, &value.to_string())
    }

    pub fn put_double(&self, key: &str, value: f64) -> Result<()> {
        self.put_single(key, &value.to_string())
    }

    pub fn put_char(&self, key: &str, value: char) -> Result<()> {
        self.put_single(key, value.encode_utf8(&mut [0u8; 4]))
    }

    pub fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.put_single(key, if value { "true" } else { "false" })
    }

    /// Replace `key` with the elements of `values`.
    ///
    /// An empty slice leaves the key removed.
    pub fn put_int_array(&self, key: &str, values: &[i32]) -> Result<()> {
        self.remove_value(key);
        for v in values {
            self.put_append(key, &v.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("No"), Some(false));
        assert_eq!(parse_bool("1"), None);
        assert!(parse_bool_or(None, true));
        assert!(!parse_bool_or(Some("maybe"), false));
    }

    #[test]
    fn boolean_default_and_missing() {
        let fs = FieldSet::new();
        assert!(fs.get_boolean_or("missing", true));
        let err = fs.get_boolean("missing").unwrap_err();
        assert!(matches!(err, FieldSetError::MissingKey { ref key } if key == "missing"));
    }

    #[test]
    fn numeric_getters() {
        let fs = FieldSet::new();
        fs.put_int("i", -7).unwrap();
        fs.put_long("l", 1 << 40).unwrap();
        fs.put_short("s", 12).unwrap();
        fs.put_double("d", 2.5).unwrap();
        assert_eq!(fs.get_int("i").unwrap(), -7);
        assert_eq!(fs.get_long("l").unwrap(), 1 << 40);
        assert_eq!(fs.get_short("s").unwrap(), 12);
        assert_eq!(fs.get_double("d").unwrap(), 2.5);
    }

    #[test]
    fn parse_failure_carries_raw_value() {
        let fs = FieldSet::new();
        fs.put_single("port", "eighty").unwrap();
        match fs.get_int("port").unwrap_err() {
            FieldSetError::Parse { key, raw, target } => {
                assert_eq!(key, "port");
                assert_eq!(raw, "eighty");
                assert_eq!(target, "i32");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs.get_int_or("port", 80), 80);
        assert_eq!(fs.get_int_or("nope", 81), 81);
    }

    #[test]
    fn short_overflow_is_a_parse_error() {
        let fs = FieldSet::new();
        fs.put_int("big", 70_000).unwrap();
        assert!(matches!(fs.get_short("big"), Err(FieldSetError::Parse { .. })));
        assert_eq!(fs.get_short_or("big", 3), 3);
    }

    #[test]
    fn char_needs_exactly_one() {
        let fs = FieldSet::new();
        fs.put_char("c", 'é').unwrap();
        fs.put_single("two", "ab").unwrap();
        assert_eq!(fs.get_char("c").unwrap(), 'é');
        assert!(fs.get_char("two").is_err());
        assert_eq!(fs.get_char_or("two", 'x'), 'x');
    }

    #[test]
    fn bool_round_trip() {
        let fs = FieldSet::new();
        fs.put_bool("flag", true).unwrap();
        assert_eq!(fs.get("flag").as_deref(), Some("true"));
        assert!(fs.get_boolean("flag").unwrap());
        fs.put_overwrite("flag", "perhaps").unwrap();
        assert!(matches!(fs.get_boolean("flag"), Err(FieldSetError::Parse { .. })));
    }

    #[test]
    fn int_array_all_or_nothing() {
        let fs = FieldSet::new();
        fs.put_int_array("ports", &[80, 443, 8080]).unwrap();
        assert_eq!(fs.get("ports").as_deref(), Some("80;443;8080"));
        assert_eq!(fs.get_int_array("ports").unwrap(), vec![80, 443, 8080]);

        fs.put_append("ports", "x").unwrap();
        assert_eq!(fs.get_int_array("ports"), None);
        assert_eq!(fs.get_int_array("missing"), None);
    }

    #[test]
    fn int_array_replaces_previous() {
        let fs = FieldSet::new();
        fs.put_int_array("a.b", &[1, 2]).unwrap();
        fs.put_int_array("a.b", &[3]).unwrap();
        assert_eq!(fs.get_int_array("a.b").unwrap(), vec![3]);
        fs.put_int_array("a.b", &[]).unwrap();
        assert!(fs.subset("a").is_none());
    }

    #[test]
    fn typed_puts_refuse_duplicates() {
        let fs = FieldSet::new();
        fs.put_int("n", 1).unwrap();
        assert!(matches!(fs.put_int("n", 2), Err(FieldSetError::DuplicateKey { .. })));
    }
}
