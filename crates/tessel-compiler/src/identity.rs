//! Node identity.
//!
//! A node's identity is the arena key the builder handed out
//! for it, so identity never depends on a node's contents. The
//! [`Identify`] trait exposes a graph as a tree of identities
//! for one level of sharing recovery.

use std::{fmt, hash::Hash};

use buggy::{Bug, BugExt as _};
use tessel_ast::{AccId, ExpId, Graph};

/// A tree of identities over a [`Graph`].
pub trait Identify {
    /// The identity of a node.
    type Id: Copy + Ord + Hash + fmt::Debug + fmt::Display;

    /// Returns the identity of `id`, checking that it belongs
    /// to the underlying graph.
    fn identify(&self, id: Self::Id) -> Result<Self::Id, Bug>;

    /// Reports whether `a` and `b` are the same node.
    fn equal(&self, a: Self::Id, b: Self::Id) -> bool {
        a == b
    }

    /// The children of `id` in operand order, one entry per
    /// reference.
    fn children(&self, id: Self::Id) -> Result<Vec<Self::Id>, Bug>;

    /// Reports whether `id` is never worth sharing.
    fn is_trivial(&self, id: Self::Id) -> Result<bool, Bug>;
}

/// Array-level identities.
///
/// The children of an array operation are its array operands
/// followed by every array referenced from its embedded scalar
/// code, counted once per path through that code.
#[derive(Copy, Clone, Debug)]
pub struct AccView<'g> {
    graph: &'g Graph,
    share: bool,
}

impl<'g> AccView<'g> {
    /// Creates a view. With `share` unset every node is treated
    /// as trivial, so nothing is ever bound.
    pub fn new(graph: &'g Graph, share: bool) -> Self {
        Self { graph, share }
    }

    /// Arrays referenced from the scalar term rooted at `root`,
    /// in preorder.
    fn scalar_arrays(&self, root: ExpId, out: &mut Vec<AccId>) -> Result<(), Bug> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let exp = self
                .graph
                .exp(id)
                .assume("scalar node must belong to the graph")?;
            out.extend(exp.array());
            stack.extend(exp.children().into_iter().rev());
        }
        Ok(())
    }
}

impl Identify for AccView<'_> {
    type Id = AccId;

    fn identify(&self, id: AccId) -> Result<AccId, Bug> {
        self.graph
            .acc(id)
            .assume("array node must belong to the graph")?;
        Ok(id)
    }

    fn children(&self, id: AccId) -> Result<Vec<AccId>, Bug> {
        let acc = self
            .graph
            .acc(id)
            .assume("array node must belong to the graph")?;
        let mut out = acc.arrays();
        for root in acc.scalar_roots() {
            self.scalar_arrays(root, &mut out)?;
        }
        Ok(out)
    }

    fn is_trivial(&self, id: AccId) -> Result<bool, Bug> {
        self.identify(id)?;
        Ok(!self.share)
    }
}

/// Scalar-level identities within one scalar term.
///
/// Array references are leaves here; they belong to the array
/// level.
#[derive(Copy, Clone, Debug)]
pub struct ExpView<'g> {
    graph: &'g Graph,
    share: bool,
}

impl<'g> ExpView<'g> {
    /// Creates a view. With `share` unset every node is treated
    /// as trivial, so nothing is ever bound.
    pub fn new(graph: &'g Graph, share: bool) -> Self {
        Self { graph, share }
    }
}

impl Identify for ExpView<'_> {
    type Id = ExpId;

    fn identify(&self, id: ExpId) -> Result<ExpId, Bug> {
        self.graph
            .exp(id)
            .assume("scalar node must belong to the graph")?;
        Ok(id)
    }

    fn children(&self, id: ExpId) -> Result<Vec<ExpId>, Bug> {
        Ok(self
            .graph
            .exp(id)
            .assume("scalar node must belong to the graph")?
            .children())
    }

    fn is_trivial(&self, id: ExpId) -> Result<bool, Bug> {
        let exp = self
            .graph
            .exp(id)
            .assume("scalar node must belong to the graph")?;
        Ok(!self.share || exp.is_trivial())
    }
}
