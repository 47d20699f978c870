//! Lazy depth-first enumeration of fully qualified keys.

use std::iter::FusedIterator;
use std::sync::Arc;
use std::vec;

use crate::node::FieldSet;
use crate::path;

struct Frame {
    prefix: String,
    keys: vec::IntoIter<Arc<str>>,
    children: vec::IntoIter<(Arc<str>, Arc<FieldSet>)>,
}

impl Frame {
    fn enter(prefix: String, node: &FieldSet) -> Self {
        let (keys, children) = node.level();
        Self {
            prefix,
            keys: keys.into_iter(),
            children: children.into_iter(),
        }
    }
}

/// Iterator over every leaf key below a set, as dotted paths.
///
/// A node's leaf keys come first, then each child subtree in map order.
/// A node is only read when the traversal reaches it, and the iterator keeps
/// `Arc` handles to the nodes it has yet to visit. Mutating the tree while
/// iterating is memory-safe but the keys produced are unspecified.
pub struct KeyIter {
    stack: Vec<Frame>,
}

impl KeyIter {
    pub(crate) fn new(root: &FieldSet, prefix: &str) -> Self {
        Self {
            stack: vec![Frame::enter(prefix.to_string(), root)],
        }
    }
}

impl Iterator for KeyIter {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let frame = self.stack.last_mut()?;
            if let Some(key) = frame.keys.next() {
                return Some(format!("{}{}", frame.prefix, key));
            }
            match frame.children.next() {
                Some((name, child)) => {
                    let prefix = path::join(&frame.prefix, &name);
                    self.stack.push(Frame::enter(prefix, &child));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl FusedIterator for KeyIter {}

impl FieldSet {
    /// Every leaf key in the tree, as dotted paths.
    pub fn keys(&self) -> KeyIter {
        KeyIter::new(self, "")
    }

    /// Every leaf key in the tree with `prefix` prepended verbatim.
    pub fn keys_with_prefix(&self, prefix: &str) -> KeyIter {
        KeyIter::new(self, prefix)
    }
}
