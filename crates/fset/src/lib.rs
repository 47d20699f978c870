//! Hierarchical, ordered field sets.
//!
//! A [`FieldSet`] is a small embedded configuration document: string values
//! addressed by dotted keys (`a.b.c`), nested subsets, multi-valued fields
//! joined with `;`, and a line-oriented text format closed by an explicit
//! terminator line.
//!
//! ```text
//! key1=value1
//! key2.subkey=value2
//! key2.other=value3a;value3b
//! End
//! ```
//!
//! # Architecture
//!
//! - **Node**: ordered leaf values, ordered named children and an optional
//!   end marker, each node behind its own `RwLock`.
//! - **Path resolver**: routes a dotted key to the node it addresses,
//!   creating intermediate subsets on writes and pruning them on removal.
//! - **Reader**: classifies lines from a [`LineSource`] into pairs and the
//!   terminator, strict or tolerant.
//! - **Writer**: renders a tree in insertion order or sorted canonical order.
//! - **Key iterator**: lazily walks every fully qualified leaf key.
//!
//! # Modules
//!
//! - [`error`] -- [`FieldSetError`] and the [`Result`] alias
//! - [`node`] -- [`FieldSet`] and its get/put/remove/merge operations
//! - [`path`] -- separator characters and key routing
//! - [`typed`] -- numeric, char and boolean accessors
//! - [`reader`] -- [`Reader`], [`LineSource`] and tolerant-mode [`Diagnostics`]
//! - [`writer`] -- text serialization
//! - [`iter`] -- [`KeyIter`]
//! - [`snapshot`] -- owned [`Snapshot`] copies used for equality, merge and export
//! - [`intern`] -- opt-in [`InternPool`]
//! - [`config`] -- [`ReadOptions`], [`WriteOptions`] and [`Order`]

pub mod config;
pub mod error;
pub mod intern;
pub mod iter;
pub mod node;
pub mod path;
pub mod reader;
pub mod snapshot;
pub mod typed;
pub mod writer;

pub use config::{Encoding, Order, ReadOptions, WriteOptions};
pub use error::{FieldSetError, Result};
pub use intern::InternPool;
pub use iter::KeyIter;
pub use node::{FieldSet, PutMode};
pub use path::{
    DEFAULT_END_MARKER, KEY_VALUE_SEPARATOR, LEVEL_SEPARATOR, MULTI_VALUE_SEPARATOR,
};
pub use reader::{
    BufReadLines, Diagnostic, Diagnostics, LineSource, Reader, StrLines, TracingDiagnostics,
};
pub use snapshot::Snapshot;
pub use typed::{parse_bool, parse_bool_or};
