//! Owned, lock-free copies of a field-set tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::node::FieldSet;
use crate::path::DEFAULT_END_MARKER;

/// A plain-data copy of a [`FieldSet`] taken at one point in time.
///
/// Equality compares content only: map order is ignored and a missing end
/// marker equals the default `"End"`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub values: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub children: IndexMap<String, Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_marker: Option<String>,
}

impl Snapshot {
    /// Number of leaf values in the tree.
    pub fn len(&self) -> usize {
        self.values.len() + self.children.values().map(Snapshot::len).sum::<usize>()
    }

    /// Returns `true` if no value exists at any depth.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.values().all(Snapshot::is_empty)
    }

    fn effective_end_marker(&self) -> &str {
        self.end_marker.as_deref().unwrap_or(DEFAULT_END_MARKER)
    }

    /// Rebuild a live set from this snapshot.
    pub fn to_field_set(&self) -> FieldSet {
        let fs = FieldSet::new();
        fs.merge_snapshot(self);
        if let Some(marker) = &self.end_marker {
            fs.write().end_marker = Some(marker.clone());
        }
        fs
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
            && self.effective_end_marker() == other.effective_end_marker()
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .all(|(name, child)| other.children.get(name) == Some(child))
    }
}

impl FieldSet {
    /// Copy the tree into an owned [`Snapshot`].
    ///
    /// Each node is read under its own lock, parent before child. Empty
    /// placeholder subsets are left out.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.read();
        let values = state
            .values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let children = state
            .children
            .iter()
            .map(|(name, child)| (name.to_string(), child.snapshot()))
            .filter(|(_, child)| !child.is_empty())
            .collect();
        Snapshot {
            values,
            children,
            end_marker: state.end_marker.clone(),
        }
    }
}
