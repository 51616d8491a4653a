use std::hash::Hash;

use buggy::{Bug, BugExt as _};
use indexmap::IndexMap;
use tracing::debug;

use crate::identity::Identify;

/// How many times each non-trivial identity is reached from a
/// root, counting every path separately.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Occurrences<I: Hash + Eq> {
    counts: IndexMap<I, usize>,
}

impl<I> Occurrences<I>
where
    I: Copy + Hash + Eq,
{
    /// The count for `id`, if it was reached.
    pub fn get(&self, id: I) -> Option<usize> {
        self.counts.get(&id).copied()
    }

    /// The count for `id`, which must have been reached.
    pub fn count(&self, id: I) -> Result<usize, Bug> {
        self.get(id).assume("identity must have been counted")
    }

    /// The number of distinct identities reached.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Reports whether nothing was reached.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates over the counts in first-visit order.
    pub fn iter(&self) -> impl Iterator<Item = (I, usize)> + '_ {
        self.counts.iter().map(|(&id, &n)| (id, n))
    }

    /// The number of identities reached more than once.
    pub fn shared(&self) -> usize {
        self.counts.values().filter(|&&n| n > 1).count()
    }
}

/// Counts occurrences by walking the tree `view` describes,
/// fully unfolded.
///
/// The walk does not remember what it has seen, so its cost is
/// the size of the unfolded tree, which can be exponential in
/// the size of the graph.
pub fn count_occurrences<V>(view: &V, root: V::Id) -> Result<Occurrences<V::Id>, Bug>
where
    V: Identify,
{
    let mut counts = IndexMap::new();
    let mut stack = vec![view.identify(root)?];
    while let Some(id) = stack.pop() {
        if !view.is_trivial(id)? {
            let n = counts.entry(id).or_insert(0usize);
            *n = n.checked_add(1).assume("occurrence count must not overflow")?;
        }
        stack.extend(view.children(id)?.into_iter().rev());
    }
    let occ = Occurrences { counts };
    debug!(%root, reached = occ.len(), shared = occ.shared(), "counted occurrences");
    Ok(occ)
}
