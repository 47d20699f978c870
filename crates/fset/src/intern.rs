//! Explicit string interning for long-lived field sets.
//!
//! Field sets that live for the whole process (translations, settings) tend
//! to repeat the same keys and values many times. An [`InternPool`] hands out
//! one shared `Arc<str>` per distinct string so repeated content is stored
//! once. Interning is opt-in and never changes behaviour.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// A thread-safe pool of shared strings.
#[derive(Debug, Default)]
pub struct InternPool {
    strings: Mutex<HashSet<Arc<str>>>,
}

impl InternPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pooled copy of `s`, inserting it on first sight.
    pub fn intern(&self, s: &str) -> Arc<str> {
        let mut strings = self.strings.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = strings.get(s) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(s);
        strings.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct strings held.
    pub fn len(&self) -> usize {
        self.strings.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Produce an `Arc<str>` for `s`, through `pool` when one is attached.
pub(crate) fn share(pool: Option<&InternPool>, s: &str) -> Arc<str> {
    match pool {
        Some(pool) => pool.intern(s),
        None => Arc::from(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_allocation() {
        let pool = InternPool::new();
        let a = pool.intern("title");
        let b = pool.intern(&String::from("title"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn distinct_content_distinct_entries() {
        let pool = InternPool::new();
        pool.intern("a");
        pool.intern("b");
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn share_without_pool_allocates() {
        let a = share(None, "x");
        let b = share(None, "x");
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
