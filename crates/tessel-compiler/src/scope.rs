//! Places a binding for every shared node at the lowest scope
//! covering all of its occurrences.
//!
//! Resolution runs in two passes over the tree a view
//! describes. The first works bottom-up and wraps a node in an
//! [`Annotated::Binding`] once every occurrence of some shared
//! descendant has been seen below it. The second works top-down,
//! turning repeated visits of a bound node into
//! [`Annotated::Variable`] references and dropping bindings that
//! end up unused.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    hash::Hash,
    rc::Rc,
};

use buggy::{Bug, BugExt as _, bug};
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    identity::Identify,
    occurrence::{Occurrences, count_occurrences},
};

/// A tree with explicit sharing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Annotated<I>
where
    I: Hash + Eq,
{
    /// A reference to the nearest enclosing binding of the
    /// identity.
    Variable(I),
    /// Computes `bound` once and makes it visible in `body`.
    Binding {
        /// The bound identity.
        id: I,
        /// The node computing the value.
        bound: Rc<Annotated<I>>,
        /// The scope of the binding.
        body: Rc<Annotated<I>>,
    },
    /// The node `id` itself.
    Plain {
        /// The surface node.
        id: I,
        /// The resolved operands, keyed by identity.
        children: IndexMap<I, Rc<Annotated<I>>>,
    },
}

impl<I> Annotated<I>
where
    I: Copy + Ord + Hash,
{
    /// Inlines every binding, reproducing the tree `view`
    /// describes.
    pub fn expand<V>(&self, view: &V) -> Result<Unfolded<I>, Bug>
    where
        V: Identify<Id = I>,
    {
        self.expand_in(view, &BTreeMap::new())
    }

    fn expand_in<V>(&self, view: &V, env: &BTreeMap<I, Unfolded<I>>) -> Result<Unfolded<I>, Bug>
    where
        V: Identify<Id = I>,
    {
        match self {
            Self::Variable(id) => env
                .get(id)
                .cloned()
                .assume("variable must be bound by an enclosing binding"),
            Self::Binding { id, bound, body } => {
                let value = bound.expand_in(view, env)?;
                let mut env = env.clone();
                env.insert(*id, value);
                body.expand_in(view, &env)
            }
            Self::Plain { id, children } => {
                let children = view
                    .children(*id)?
                    .into_iter()
                    .map(|c| {
                        children
                            .get(&c)
                            .assume("every operand must be annotated")?
                            .expand_in(view, env)
                    })
                    .collect::<Result<_, Bug>>()?;
                Ok(Unfolded { id: *id, children })
            }
        }
    }
}

/// A fully unfolded tree of identities.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Unfolded<I> {
    /// The node.
    pub id: I,
    /// One entry per operand reference.
    pub children: Vec<Unfolded<I>>,
}

/// Unfolds the tree `view` describes from `root` without any
/// sharing.
pub fn unfold<V>(view: &V, root: V::Id) -> Result<Unfolded<V::Id>, Bug>
where
    V: Identify,
{
    let children = view
        .children(view.identify(root)?)?
        .into_iter()
        .map(|c| unfold(view, c))
        .collect::<Result<_, Bug>>()?;
    Ok(Unfolded { id: root, children })
}

/// Recovers the sharing of the tree rooted at `root`.
pub fn resolve<V>(view: &V, root: V::Id) -> Result<Rc<Annotated<V::Id>>, Bug>
where
    V: Identify,
{
    let occ = count_occurrences(view, root)?;
    let mut resolver = Resolver::new(view, &occ);
    let placed = resolver.place(root)?;
    if !placed.pending.is_empty() {
        bug!("every shared identity must be bound below the root");
    }
    let (node, live) = resolver.prune(&placed.node, None)?;
    if !live.is_empty() {
        bug!("the root must not reference unbound variables");
    }
    Ok(node)
}

/// The result of placing a subtree.
#[derive(Debug)]
struct Placed<I>
where
    I: Hash + Eq,
{
    node: Rc<Annotated<I>>,
    /// Shared identities below the node that are not yet bound,
    /// with the number of occurrences under one instance of the
    /// node, in the order they were found.
    pending: IndexMap<I, usize>,
}

/// Scope resolution state for one tree.
struct Resolver<'a, V>
where
    V: Identify,
{
    view: &'a V,
    occ: &'a Occurrences<V::Id>,
    memo: HashMap<V::Id, Rc<Placed<V::Id>>>,
}

impl<'a, V> Resolver<'a, V>
where
    V: Identify,
{
    fn new(view: &'a V, occ: &'a Occurrences<V::Id>) -> Self {
        Self {
            view,
            occ,
            memo: HashMap::new(),
        }
    }

    /// The number of times `id` occurs. Trivial nodes are never
    /// shared.
    fn multiplicity(&self, id: V::Id) -> Result<usize, Bug> {
        if self.view.is_trivial(id)? {
            Ok(1)
        } else {
            self.occ.count(id)
        }
    }

    /// Bottom-up pass: binds each shared identity at the first
    /// node whose instances cover all of its occurrences.
    ///
    /// An identity pending with `n` occurrences below one
    /// instance of a node that itself occurs `m` times is
    /// covered when `n * m` equals its total.
    fn place(&mut self, id: V::Id) -> Result<Rc<Placed<V::Id>>, Bug> {
        if let Some(placed) = self.memo.get(&id) {
            return Ok(Rc::clone(placed));
        }
        let count = self.multiplicity(id)?;

        let mut children = IndexMap::new();
        let mut pending = IndexMap::<V::Id, usize>::new();
        for child in self.view.children(id)? {
            let placed = self.place(child)?;
            children.insert(child, Rc::clone(&placed.node));
            for (&k, &n) in &placed.pending {
                let slot = pending.entry(k).or_insert(0);
                *slot = slot
                    .checked_add(n)
                    .assume("pending count must not overflow")?;
            }
        }

        let mut complete = Vec::new();
        for (&k, &n) in &pending {
            let total = self.occ.count(k)?;
            let reached = n
                .checked_mul(count)
                .assume("pending count must not overflow")?;
            if reached == total {
                complete.push(k);
            } else if reached > total {
                bug!("identity reached more often than counted");
            }
        }

        let mut node = Rc::new(Annotated::Plain { id, children });
        // Identities found later are nested inside earlier ones.
        for &k in complete.iter().rev() {
            pending.shift_remove(&k);
            let bound = Rc::clone(
                &self
                    .memo
                    .get(&k)
                    .assume("bound identity must already be placed")?
                    .node,
            );
            trace!(%k, at = %id, "placing binding");
            node = Rc::new(Annotated::Binding {
                id: k,
                bound,
                body: node,
            });
        }

        if count > 1 {
            pending.insert(id, 1);
        }

        let placed = Rc::new(Placed { node, pending });
        self.memo.insert(id, Rc::clone(&placed));
        Ok(placed)
    }

    /// Top-down pass: replaces operands that occur more often
    /// than the enclosing context with variables and drops
    /// unreferenced bindings.
    ///
    /// `ctx` is the multiplicity of the nearest enclosing node
    /// that starts a scope, unset at the root and at the start
    /// of each bound subtree. Returns the rewritten node with
    /// the identities it references but does not bind.
    fn prune(
        &self,
        node: &Rc<Annotated<V::Id>>,
        ctx: Option<usize>,
    ) -> Result<(Rc<Annotated<V::Id>>, BTreeSet<V::Id>), Bug> {
        match node.as_ref() {
            Annotated::Variable(id) => Ok((Rc::clone(node), BTreeSet::from([*id]))),
            Annotated::Binding { id, bound, body } => {
                let (body, mut live) = self.prune(body, ctx)?;
                if !live.remove(id) {
                    debug!(%id, "dropping unused binding");
                    return Ok((body, live));
                }
                let (bound, bound_live) = self.prune(bound, None)?;
                live.extend(bound_live);
                let node = Rc::new(Annotated::Binding {
                    id: *id,
                    bound,
                    body,
                });
                Ok((node, live))
            }
            Annotated::Plain { id, children } => {
                let m = match ctx {
                    Some(m) => m,
                    None => self.multiplicity(*id)?,
                };
                let mut live = BTreeSet::new();
                let mut pruned = IndexMap::with_capacity(children.len());
                for (&k, child) in children {
                    let child = if self.multiplicity(k)? > m {
                        live.insert(k);
                        Rc::new(Annotated::Variable(k))
                    } else {
                        let (child, child_live) = self.prune(child, Some(m))?;
                        live.extend(child_live);
                        child
                    };
                    pruned.insert(k, child);
                }
                let node = Rc::new(Annotated::Plain {
                    id: *id,
                    children: pruned,
                });
                Ok((node, live))
            }
        }
    }
}
