use std::ops::Index;

use serde_derive::{Deserialize, Serialize};

use crate::{
    arena::Arena,
    node::{Acc, AccId, Exp, ExpId},
};

/// A surface program: every array-level and scalar-level node
/// allocated so far.
///
/// A node is referenced by the key it was allocated under.
/// Passing the same key to several constructors is how a
/// program shares a computation; nothing else records it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    accs: Arena<AccId, Acc>,
    exps: Arena<ExpId, Exp>,
}

impl Graph {
    /// Creates an empty graph.
    pub const fn new() -> Self {
        Self {
            accs: Arena::new(),
            exps: Arena::new(),
        }
    }

    /// Retrieves an array-level node.
    pub fn acc(&self, id: AccId) -> Option<&Acc> {
        self.accs.get(id)
    }

    /// Retrieves a scalar-level node.
    pub fn exp(&self, id: ExpId) -> Option<&Exp> {
        self.exps.get(id)
    }

    /// Iterates over the array-level nodes in allocation order.
    pub fn accs(&self) -> impl ExactSizeIterator<Item = (AccId, &Acc)> {
        self.accs.iter()
    }

    /// Iterates over the scalar-level nodes in allocation order.
    pub fn exps(&self) -> impl ExactSizeIterator<Item = (ExpId, &Exp)> {
        self.exps.iter()
    }

    /// Allocates an array-level node.
    pub fn insert_acc(&mut self, acc: Acc) -> AccId {
        self.accs.insert(acc)
    }

    /// Allocates a scalar-level node.
    pub fn insert_exp(&mut self, exp: Exp) -> ExpId {
        self.exps.insert(exp)
    }
}

impl Index<AccId> for Graph {
    type Output = Acc;

    fn index(&self, id: AccId) -> &Self::Output {
        &self.accs[id]
    }
}

impl Index<ExpId> for Graph {
    type Output = Exp;

    fn index(&self, id: ExpId) -> &Self::Output {
        &self.exps[id]
    }
}
