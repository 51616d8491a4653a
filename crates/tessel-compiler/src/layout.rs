use std::{fmt, iter::FusedIterator, rc::Rc};

use buggy::{Bug, BugExt as _};
use tessel_ir::Idx;

/// The bindings in scope at some point, innermost first.
///
/// Extending a layout leaves the original untouched, so every
/// scope can hold on to its own.
#[derive(Clone, Debug)]
pub struct Layout<K> {
    head: Option<Rc<Entry<K>>>,
}

#[derive(Debug)]
struct Entry<K> {
    key: K,
    next: Option<Rc<Entry<K>>>,
}

impl<K> Layout<K> {
    /// An empty layout.
    pub const fn new() -> Self {
        Self { head: None }
    }

    /// Iterates over the keys in scope, innermost first.
    pub fn iter(&self) -> LayoutIter<'_, K> {
        LayoutIter {
            next: self.head.as_deref(),
        }
    }

    /// The number of keys in scope.
    pub fn depth(&self) -> usize {
        self.iter().count()
    }
}

impl<K> Layout<K>
where
    K: Copy + Eq,
{
    /// Returns a layout with `key` bound innermost.
    #[must_use]
    pub fn push(&self, key: K) -> Self {
        Self {
            head: Some(Rc::new(Entry {
                key,
                next: self.head.clone(),
            })),
        }
    }

    /// The index of the innermost binding of `key`.
    pub fn index_of(&self, key: K) -> Option<Idx> {
        self.iter().position(|k| *k == key).map(Idx)
    }

    /// The index of `key`, which must be in scope.
    pub fn lookup(&self, key: K) -> Result<Idx, Bug> {
        self.index_of(key)
            .assume("variable must be bound in the layout")
    }

    /// The key at `idx`.
    pub fn get(&self, idx: Idx) -> Option<K> {
        self.iter().nth(idx.0).copied()
    }
}

impl<K> Default for Layout<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Display> fmt::Display for Layout<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, k) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}")?;
        }
        f.write_str("]")
    }
}

/// Iterates over a [`Layout`], innermost first.
pub struct LayoutIter<'a, K> {
    next: Option<&'a Entry<K>>,
}

impl<'a, K> Iterator for LayoutIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.next?;
        self.next = entry.next.as_deref();
        Some(&entry.key)
    }
}

impl<K> FusedIterator for LayoutIter<'_, K> {}
