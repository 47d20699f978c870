//! Serializing sets back to the line format.
//!
//! Values are written before subsets, each line as
//! `prefix + key + "=" + value`, with subsets extending the prefix by
//! `name + "."`. Only the outermost set writes a terminator line: its end
//! marker, or `End` when it has none.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::config::Order;
use crate::error::Result;
use crate::node::{FieldSet, NodeState};
use crate::path::{self, DEFAULT_END_MARKER, KEY_VALUE_SEPARATOR};

/// Bridges `fmt::Write` output onto an `io::Write`, keeping the I/O error.
struct IoAdapter<'w, W: Write + ?Sized> {
    inner: &'w mut W,
    error: Option<io::Error>,
}

impl<W: Write + ?Sized> fmt::Write for IoAdapter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

fn write_level(
    state: &NodeState,
    out: &mut dyn fmt::Write,
    prefix: &str,
    order: Order,
) -> fmt::Result {
    let mut values: Vec<(&Arc<str>, &Arc<str>)> = state.values.iter().collect();
    let mut children: Vec<(&Arc<str>, &Arc<FieldSet>)> = state.children.iter().collect();
    if order == Order::Sorted {
        values.sort_unstable_by(|a, b| a.0.cmp(b.0));
        children.sort_unstable_by(|a, b| a.0.cmp(b.0));
    }

    for (key, value) in values {
        out.write_str(prefix)?;
        out.write_str(key)?;
        out.write_char(KEY_VALUE_SEPARATOR)?;
        out.write_str(value)?;
        out.write_char('\n')?;
    }
    for (name, child) in children {
        write_level(&child.read(), out, &path::join(prefix, name), order)?;
    }
    Ok(())
}

impl FieldSet {
    /// Write the whole record, terminator included.
    pub fn write_fmt_to(&self, out: &mut dyn fmt::Write, order: Order) -> fmt::Result {
        // One guard for the body and the trailer of the top level.
        let state = self.read();
        write_level(&state, out, "", order)?;
        out.write_str(state.end_marker.as_deref().unwrap_or(DEFAULT_END_MARKER))?;
        out.write_char('\n')
    }

    /// Write the record to a byte stream as UTF-8.
    ///
    /// The stream is not buffered here; wrap files in a `BufWriter`.
    pub fn write_to<W: Write + ?Sized>(&self, w: &mut W, order: Order) -> io::Result<()> {
        let mut adapter = IoAdapter {
            inner: w,
            error: None,
        };
        match self.write_fmt_to(&mut adapter, order) {
            Ok(()) => Ok(()),
            Err(fmt::Error) => Err(adapter
                .error
                .unwrap_or_else(|| io::Error::other("formatter error"))),
        }
    }

    /// Write the record to `path`, replacing its contents.
    pub fn write_file(&self, path: impl AsRef<Path>, order: Order) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w, order)?;
        w.flush()?;
        Ok(())
    }

    /// The record in the given order.
    pub fn to_string_in(&self, order: Order) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_fmt_to(&mut out, order);
        out
    }

    /// The record with keys and subsets sorted at every level.
    pub fn to_ordered_string(&self) -> String {
        self.to_string_in(Order::Sorted)
    }
}

impl fmt::Display for FieldSet {
    /// The record in insertion order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_fmt_to(f, Order::Insertion)
    }
}
