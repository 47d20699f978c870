//! Parsing records from line sources.
//!
//! A record is a run of `key=value` lines closed by the first line that has
//! no `=`. That line is kept verbatim as the set's end marker; anything
//! after it stays in the source for the next record.
//!
//! ```text
//! title=Hello
//! cat.1=News
//! cat.2=Tech
//! End
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::{Encoding, ReadOptions};
use crate::error::{FieldSetError, Result};
use crate::node::{FieldSet, PutMode};
use crate::path::KEY_VALUE_SEPARATOR;

/// A supplier of raw text lines, without their line breaks.
pub trait LineSource {
    /// The next line, or `None` at end of input.
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Like [`next_line`](Self::next_line), but a source may stop buffering
    /// once a line is known to exceed `limit` bytes. The returned line is
    /// then longer than `limit` and possibly truncated.
    fn next_line_within(&mut self, _limit: usize) -> io::Result<Option<Vec<u8>>> {
        self.next_line()
    }
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        (**self).next_line()
    }

    fn next_line_within(&mut self, limit: usize) -> io::Result<Option<Vec<u8>>> {
        (**self).next_line_within(limit)
    }
}

fn strip_line_break(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// Lines of an in-memory string.
#[derive(Clone, Debug)]
pub struct StrLines<'a> {
    rest: &'a str,
}

impl<'a> StrLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    /// The text not yet consumed.
    pub fn remaining(&self) -> &'a str {
        self.rest
    }
}

impl LineSource for StrLines<'_> {
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        let (line, rest) = match self.rest.find('\n') {
            Some(i) => (&self.rest[..=i], &self.rest[i + 1..]),
            None => (self.rest, ""),
        };
        self.rest = rest;
        let mut line = line.as_bytes().to_vec();
        strip_line_break(&mut line);
        Ok(Some(line))
    }
}

/// Lines of any buffered byte reader.
#[derive(Debug)]
pub struct BufReadLines<R> {
    inner: R,
}

impl<R: BufRead> BufReadLines<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> LineSource for BufReadLines<R> {
    fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.inner.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        strip_line_break(&mut line);
        Ok(Some(line))
    }

    fn next_line_within(&mut self, limit: usize) -> io::Result<Option<Vec<u8>>> {
        // Room for the longest accepted line plus `\r\n`.
        let cap = limit.saturating_add(2) as u64;
        let mut line = Vec::new();
        if Read::take(&mut self.inner, cap).read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        strip_line_break(&mut line);
        Ok(Some(line))
    }
}

/// Something the reader tolerated instead of failing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A blank line was skipped in tolerant mode.
    BlankLineSkipped { line: usize },
    /// Input ended before a terminator in tolerant mode.
    MissingTerminator { lines: usize },
    /// A `key=value` line could not be stored and was skipped.
    LineRejected { line: usize, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankLineSkipped { line } => write!(f, "line {line}: blank line skipped"),
            Self::MissingTerminator { lines } => write!(f, "no end marker after {lines} line(s)"),
            Self::LineRejected { line, reason } => write!(f, "line {line}: {reason}"),
        }
    }
}

/// Receives the diagnostics of tolerant parses.
pub trait Diagnostics {
    fn report(&self, diagnostic: &Diagnostic);
}

impl<F: Fn(&Diagnostic)> Diagnostics for F {
    fn report(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Forwards diagnostics to `tracing` at warn level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        warn!(%diagnostic, "tolerated malformed field set input");
    }
}

/// Parses records into [`FieldSet`]s.
pub struct Reader<'d> {
    options: ReadOptions,
    diagnostics: &'d dyn Diagnostics,
}

impl fmt::Debug for Reader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader").field("options", &self.options).finish_non_exhaustive()
    }
}

impl Reader<'static> {
    /// A reader that reports diagnostics through `tracing`.
    pub fn new(options: ReadOptions) -> Self {
        Self {
            options,
            diagnostics: &TracingDiagnostics,
        }
    }
}

impl<'d> Reader<'d> {
    /// Route diagnostics to `sink` instead of `tracing`.
    pub fn with_diagnostics<'e>(self, sink: &'e dyn Diagnostics) -> Reader<'e> {
        Reader {
            options: self.options,
            diagnostics: sink,
        }
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Parse one record into a new set.
    pub fn read<S: LineSource + ?Sized>(&self, source: &mut S) -> Result<FieldSet> {
        let fs = FieldSet::with_lifetime(self.options.short_lived);
        self.read_into(&fs, source)?;
        Ok(fs)
    }

    /// Parse one record into an existing set.
    ///
    /// Values already in `fs` count as present for duplicate detection.
    /// On error, pairs parsed before the failing line remain in `fs`.
    pub fn read_into<S: LineSource + ?Sized>(&self, fs: &FieldSet, source: &mut S) -> Result<()> {
        let mode = if self.options.allow_multiple {
            PutMode::Append
        } else {
            PutMode::Single
        };
        let mut line_no = 0usize;
        let mut seen_line = false;

        loop {
            let next = match self.options.max_line_length {
                Some(limit) => source.next_line_within(limit)?,
                None => source.next_line()?,
            };
            let Some(raw) = next else {
                if !seen_line {
                    return Err(FieldSetError::UnexpectedEndOfInput);
                }
                if self.options.tolerant {
                    self.diagnostics
                        .report(&Diagnostic::MissingTerminator { lines: line_no });
                    return Ok(());
                }
                return Err(FieldSetError::MissingTerminator { lines: line_no });
            };
            line_no += 1;

            if let Some(limit) = self.options.max_line_length {
                if raw.len() > limit {
                    return Err(FieldSetError::LineTooLong {
                        line: line_no,
                        limit,
                    });
                }
            }
            let line = decode(raw, self.options.encoding)?;

            if line.is_empty() && self.options.tolerant {
                self.diagnostics
                    .report(&Diagnostic::BlankLineSkipped { line: line_no });
                continue;
            }
            seen_line = true;

            let Some(split) = line.find(KEY_VALUE_SEPARATOR) else {
                debug!(lines = line_no, end_marker = %line, "read field set record");
                fs.write().end_marker = Some(line);
                return Ok(());
            };

            let (key, value) = (&line[..split], &line[split + 1..]);
            match fs.put(key, value, mode) {
                Ok(()) => {}
                Err(e) if self.options.tolerant => {
                    self.diagnostics.report(&Diagnostic::LineRejected {
                        line: line_no,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn decode(raw: Vec<u8>, encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(raw)
            .map_err(|e| FieldSetError::Io(io::Error::new(io::ErrorKind::InvalidData, e))),
        Encoding::Latin1 => Ok(raw.iter().map(|&b| char::from(b)).collect()),
    }
}

impl FieldSet {
    /// Parse a record from a string.
    pub fn parse_str(text: &str, allow_multiple: bool, short_lived: bool) -> Result<FieldSet> {
        let options = ReadOptions {
            allow_multiple,
            short_lived,
            ..Default::default()
        };
        Reader::new(options).read(&mut StrLines::new(text))
    }

    /// Parse a record from a byte stream.
    pub fn read_from<R: Read>(input: R, options: &ReadOptions) -> Result<FieldSet> {
        let mut lines = BufReadLines::new(BufReader::new(input));
        Reader::new(options.clone()).read(&mut lines)
    }

    /// Parse a record from a file.
    pub fn read_file(path: impl AsRef<Path>, options: &ReadOptions) -> Result<FieldSet> {
        Self::read_from(File::open(path)?, options)
    }
}

impl FromStr for FieldSet {
    type Err = FieldSetError;

    /// Strict, single-valued, short-lived parse.
    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s, false, true)
    }
}
