//! The surface graph of the Tessel array language.
//!
//! Programs are built by calling the constructors on [`Graph`].
//! Each constructor allocates one node and returns its key, so a
//! value used twice is simply a key passed twice. Closures are
//! applied once to fresh placeholders when the enclosing
//! operation is built.
//!
//! ```
//! use tessel_ast::{Array, Graph};
//!
//! let mut g = Graph::new();
//! let xs = g.use_array(Array::vector(vec![1i64.into(), 2i64.into()]));
//! let ys = g.map(|g, x| {
//!     let one = g.constant(1i64);
//!     g.add(x, one)
//! }, xs);
//! let zs = g.zip_with(|g, a, b| g.mul(a, b), ys, ys);
//! assert_eq!(g[zs].arrays(), vec![ys, ys]);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

mod arena;
mod builder;
mod graph;
mod node;
mod scalar;

pub use arena::{Arena, Key};
pub use graph::Graph;
pub use node::{
    Acc, AccId, Array, Boundary, Exp, ExpId, Fun, InvalidNeighbourhood, Neighbourhood, NodeId,
    ShapeMismatch, StencilFun,
};
pub use scalar::{PrimFun, Scalar};
