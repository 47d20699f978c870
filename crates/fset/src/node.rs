//! The field-set node and its dotted-path operations.
//!
//! A [`FieldSet`] is one level of the document: ordered leaf values, ordered
//! named children, and an optional end marker. Every node owns its own
//! `RwLock`; operations that descend the tree take the parent's lock and
//! then the child's, never the other way round.
//!
//! # Invariants
//!
//! - Values and keys never contain line terminators; keys never contain `=`.
//! - A subset is never attached under a name that already holds a value or
//!   a subset, and a value is never set over an empty subset placeholder.
//! - Removing the last entry below a child prunes that child, recursively.
//! - The tree is finite: a set cannot be attached below itself.

use std::ptr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{FieldSetError, Result};
use crate::intern::{share, InternPool};
use crate::path::{self, route, Route, DEFAULT_END_MARKER, MULTI_VALUE_SEPARATOR};

/// How a value put treats an existing value at the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutMode {
    /// Fail with [`FieldSetError::DuplicateKey`] if a value exists.
    Single,
    /// Join the new value onto the existing one with `;`.
    Append,
    /// Replace the existing value.
    Overwrite,
}

#[derive(Debug, Default)]
pub(crate) struct NodeState {
    pub(crate) values: IndexMap<Arc<str>, Arc<str>>,
    pub(crate) children: IndexMap<Arc<str>, Arc<FieldSet>>,
    pub(crate) end_marker: Option<String>,
}

/// One level of a hierarchical, insertion-ordered key-value document.
///
/// All operations take `&self`; a set is typically shared as
/// `Arc<FieldSet>` and may be read and written from several threads.
#[derive(Debug, Default)]
pub struct FieldSet {
    state: RwLock<NodeState>,
    pool: Option<Arc<InternPool>>,
}

impl FieldSet {
    /// Create an empty, short-lived set (no interning).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set backed by a fresh intern pool.
    pub fn interned() -> Self {
        Self::with_pool(Arc::new(InternPool::new()))
    }

    /// Create an empty set that interns through `pool`.
    pub fn with_pool(pool: Arc<InternPool>) -> Self {
        Self {
            state: RwLock::default(),
            pool: Some(pool),
        }
    }

    /// Create an empty set, interning unless `short_lived` is set.
    pub fn with_lifetime(short_lived: bool) -> Self {
        if short_lived {
            Self::new()
        } else {
            Self::interned()
        }
    }

    /// The intern pool this set writes through, if any.
    pub fn pool(&self) -> Option<&Arc<InternPool>> {
        self.pool.as_ref()
    }

    /// Returns `true` if keys and values are interned.
    pub fn is_interned(&self) -> bool {
        self.pool.is_some()
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, NodeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn share(&self, s: &str) -> Arc<str> {
        share(self.pool.as_deref(), s)
    }

    fn empty_child(&self) -> FieldSet {
        Self {
            state: RwLock::default(),
            pool: self.pool.clone(),
        }
    }

    /// Fetch the child named `segment`, creating it under the held guard.
    fn child_entry(&self, state: &mut NodeState, segment: &str) -> Arc<FieldSet> {
        if let Some(child) = state.children.get(segment) {
            return Arc::clone(child);
        }
        let child = Arc::new(self.empty_child());
        state
            .children
            .insert(self.share(segment), Arc::clone(&child));
        child
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// The value stored at a dotted key.
    pub fn get(&self, key: &str) -> Option<String> {
        match route(key) {
            Route::Here(name) => self.read().values.get(name).map(|v| v.to_string()),
            Route::Descend { segment, rest } => {
                let state = self.read();
                state.children.get(segment)?.get(rest)
            }
        }
    }

    /// The value at `key` split on the multi-value separator.
    pub fn get_all(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| path::split_values(&v))
    }

    /// The value at `key`, or [`FieldSetError::MissingKey`].
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key).ok_or_else(|| FieldSetError::MissingKey {
            key: key.to_string(),
        })
    }

    /// The subset at a dotted key.
    pub fn subset(&self, key: &str) -> Option<Arc<FieldSet>> {
        let state = self.read();
        match route(key) {
            Route::Here(name) => state.children.get(name).cloned(),
            Route::Descend { segment, rest } => state.children.get(segment)?.subset(rest),
        }
    }

    /// The subset at `key`, or [`FieldSetError::MissingSubset`].
    pub fn get_subset(&self, key: &str) -> Result<Arc<FieldSet>> {
        self.subset(key).ok_or_else(|| FieldSetError::MissingSubset {
            key: key.to_string(),
        })
    }

    /// Returns `true` if the set holds no values at any depth.
    pub fn is_empty(&self) -> bool {
        let state = self.read();
        state.values.is_empty() && state.children.values().all(|c| c.is_empty())
    }

    /// Number of leaf values in the whole tree.
    pub fn len(&self) -> usize {
        let state = self.read();
        state.values.len() + state.children.values().map(|c| c.len()).sum::<usize>()
    }

    /// Leaf keys of this level only, in insertion order.
    pub fn top_level_keys(&self) -> Vec<String> {
        self.read().values.keys().map(|k| k.to_string()).collect()
    }

    /// Names of the direct children, in insertion order.
    pub fn direct_subset_names(&self) -> Vec<String> {
        self.read().children.keys().map(|k| k.to_string()).collect()
    }

    /// Leaf keys and child handles of this level, taken under one read lock.
    pub(crate) fn level(&self) -> (Vec<Arc<str>>, Vec<(Arc<str>, Arc<FieldSet>)>) {
        let state = self.read();
        let keys = state.values.keys().cloned().collect();
        let children = state
            .children
            .iter()
            .map(|(name, child)| (Arc::clone(name), Arc::clone(child)))
            .collect();
        (keys, children)
    }

    /// The terminator written after this set; `"End"` unless one was set.
    pub fn end_marker(&self) -> String {
        self.read()
            .end_marker
            .clone()
            .unwrap_or_else(|| DEFAULT_END_MARKER.to_string())
    }

    /// The terminator captured at parse time or set explicitly, if any.
    pub fn raw_end_marker(&self) -> Option<String> {
        self.read().end_marker.clone()
    }

    /// Replace the terminator written after this set.
    pub fn set_end_marker(&self, marker: impl Into<String>) -> Result<()> {
        let marker = marker.into();
        path::check_end_marker(&marker)?;
        if marker.is_empty() {
            warn!("empty end marker: tolerant readers skip the blank terminator line");
        }
        self.write().end_marker = Some(marker);
        Ok(())
    }

    /// Forget the end marker so the default terminator is written.
    pub fn clear_end_marker(&self) {
        self.write().end_marker = None;
    }

    // ---------------------------------------------------------------
    // Value puts
    // ---------------------------------------------------------------

    /// Set `key` to `value`, failing if a value is already present.
    pub fn put_single(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value, PutMode::Single)
    }

    /// Set `key` to `value`, appending with `;` if a value is present.
    pub fn put_append(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value, PutMode::Append)
    }

    /// Set `key` to `value`, replacing any existing value.
    pub fn put_overwrite(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value, PutMode::Overwrite)
    }

    /// [`put_single`](Self::put_single) that ignores `None`.
    pub fn put_single_opt(&self, key: &str, value: Option<&str>) -> Result<()> {
        value.map_or(Ok(()), |v| self.put_single(key, v))
    }

    /// [`put_append`](Self::put_append) that ignores `None`.
    pub fn put_append_opt(&self, key: &str, value: Option<&str>) -> Result<()> {
        value.map_or(Ok(()), |v| self.put_append(key, v))
    }

    /// [`put_overwrite`](Self::put_overwrite) that ignores `None`.
    pub fn put_overwrite_opt(&self, key: &str, value: Option<&str>) -> Result<()> {
        value.map_or(Ok(()), |v| self.put_overwrite(key, v))
    }

    /// Replace `key` with `values` joined by `;`.
    pub fn put_overwrite_all<S: AsRef<str>>(&self, key: &str, values: &[S]) -> Result<()> {
        self.put_overwrite(key, &path::join_values(values))
    }

    /// Store a value at a dotted key, creating intermediate subsets.
    pub fn put(&self, key: &str, value: &str, mode: PutMode) -> Result<()> {
        path::check_key(key)?;
        path::check_value(key, value)?;
        self.put_at(key, key, value, mode)
    }

    fn put_at(&self, full_key: &str, key: &str, value: &str, mode: PutMode) -> Result<()> {
        let mut state = self.write();
        match route(key) {
            Route::Here(name) => {
                if state.children.get(name).is_some_and(|c| c.is_empty()) {
                    return Err(FieldSetError::conflict(
                        full_key,
                        "an empty subset already holds this name",
                    ));
                }
                if let Some(existing) = state.values.get_mut(name) {
                    match mode {
                        PutMode::Overwrite => *existing = self.share(value),
                        PutMode::Append => {
                            let joined = format!("{existing}{MULTI_VALUE_SEPARATOR}{value}");
                            *existing = self.share(&joined);
                        }
                        PutMode::Single => {
                            return Err(FieldSetError::DuplicateKey {
                                key: full_key.to_string(),
                            })
                        }
                    }
                    return Ok(());
                }
                let name = self.share(name);
                let value = self.share(value);
                state.values.insert(name, value);
                Ok(())
            }
            Route::Descend { segment, rest } => {
                let child = self.child_entry(&mut state, segment);
                let result = child.put_at(full_key, rest, value, mode);
                if result.is_err() && child.is_empty() {
                    state.children.shift_remove(segment);
                }
                result
            }
        }
    }

    // ---------------------------------------------------------------
    // Subset puts
    // ---------------------------------------------------------------

    /// Attach `set` as a subset at a dotted key.
    ///
    /// Fails with [`FieldSetError::Conflict`] if the name already holds a
    /// value or a subset, or if `set` is empty, and with
    /// [`FieldSetError::Cycle`] if `set` is or contains this set or any
    /// subset on the path to `key`.
    pub fn put_subset(&self, key: &str, set: impl Into<Arc<FieldSet>>) -> Result<()> {
        let set = set.into();
        path::check_key(key)?;
        if set.is_empty() {
            return Err(FieldSetError::conflict(key, "cannot attach an empty subset"));
        }
        self.attach_at(key, key, set)?;
        debug!(key, "attached subset");
        Ok(())
    }

    /// Tolerant [`put_subset`](Self::put_subset): an empty `set` is skipped.
    pub fn tput(&self, key: &str, set: impl Into<Arc<FieldSet>>) -> Result<()> {
        let set = set.into();
        if set.is_empty() {
            return Ok(());
        }
        self.put_subset(key, set)
    }

    fn attach_at(&self, full_key: &str, key: &str, set: Arc<FieldSet>) -> Result<()> {
        // Checked before locking: `set` may share nodes with this tree.
        if set.contains_node(self) {
            return Err(FieldSetError::Cycle {
                key: full_key.to_string(),
            });
        }
        let mut state = self.write();
        match route(key) {
            Route::Here(name) => {
                if state.values.contains_key(name) {
                    return Err(FieldSetError::conflict(full_key, "a value already holds this name"));
                }
                if state.children.contains_key(name) {
                    return Err(FieldSetError::conflict(full_key, "a subset already exists here"));
                }
                let name = self.share(name);
                state.children.insert(name, set);
                Ok(())
            }
            Route::Descend { segment, rest } => {
                let child = self.child_entry(&mut state, segment);
                let result = child.attach_at(full_key, rest, set);
                if result.is_err() && child.is_empty() {
                    state.children.shift_remove(segment);
                }
                result
            }
        }
    }

    fn contains_node(&self, target: &FieldSet) -> bool {
        if ptr::eq(self, target) {
            return true;
        }
        let (_, children) = self.level();
        children.iter().any(|(_, child)| child.contains_node(target))
    }

    // ---------------------------------------------------------------
    // Removal
    // ---------------------------------------------------------------

    /// Remove the value at a dotted key, pruning emptied subsets.
    pub fn remove_value(&self, key: &str) {
        let mut state = self.write();
        match route(key) {
            Route::Here(name) => {
                state.values.shift_remove(name);
            }
            Route::Descend { segment, rest } => {
                let Some(child) = state.children.get(segment).cloned() else {
                    return;
                };
                child.remove_value(rest);
                if child.is_empty() {
                    state.children.shift_remove(segment);
                }
            }
        }
    }

    /// Remove the subset at a dotted key, pruning emptied parents.
    ///
    /// With `foo=bar`, `foo.bar=x` and `foo.bar.baz=y`, removing the subset
    /// `foo` drops the last two lines and keeps `foo=bar`.
    pub fn remove_subset(&self, key: &str) {
        let mut state = self.write();
        match route(key) {
            Route::Here(name) => {
                state.children.shift_remove(name);
            }
            Route::Descend { segment, rest } => {
                let Some(child) = state.children.get(segment).cloned() else {
                    return;
                };
                child.remove_subset(rest);
                if child.is_empty() {
                    state.children.shift_remove(segment);
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Copies and merge
    // ---------------------------------------------------------------

    /// Copy the top-level maps, sharing the child nodes with `self`.
    pub fn shallow_copy(&self) -> FieldSet {
        let state = self.read();
        FieldSet {
            state: RwLock::new(NodeState {
                values: state.values.clone(),
                children: state.children.clone(),
                end_marker: state.end_marker.clone(),
            }),
            pool: self.pool.clone(),
        }
    }

    /// Copy the whole tree; the copy shares no nodes with `self`.
    pub fn deep_copy(&self) -> FieldSet {
        let state = self.read();
        let children = state
            .children
            .iter()
            .map(|(name, child)| (Arc::clone(name), Arc::new(child.deep_copy())))
            .collect();
        FieldSet {
            state: RwLock::new(NodeState {
                values: state.values.clone(),
                children,
                end_marker: state.end_marker.clone(),
            }),
            pool: self.pool.clone(),
        }
    }

    /// Merge `other` into this set, overwriting values on collision.
    ///
    /// Subsets are merged level by level: a same-named child is merged into,
    /// a missing one is created. `other` is snapshotted first so the two
    /// trees are never locked at the same time.
    pub fn put_all_overwrite(&self, other: &FieldSet) {
        if ptr::eq(self, other) {
            return;
        }
        let snapshot = other.snapshot();
        self.merge_snapshot(&snapshot);
        debug!(values = snapshot.len(), "merged field set");
    }

    pub(crate) fn merge_snapshot(&self, snapshot: &crate::snapshot::Snapshot) {
        let mut state = self.write();
        for (key, value) in &snapshot.values {
            let key = self.share(key);
            let value = self.share(value);
            state.values.insert(key, value);
        }
        for (name, sub) in &snapshot.children {
            if sub.is_empty() {
                continue;
            }
            let child = self.child_entry(&mut state, name);
            child.merge_snapshot(sub);
        }
    }
}

impl Clone for FieldSet {
    fn clone(&self) -> Self {
        self.deep_copy()
    }
}

impl PartialEq for FieldSet {
    /// Content equality: values, subset tree and effective end marker.
    /// Insertion order is not compared.
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other) || self.snapshot() == other.snapshot()
    }
}
