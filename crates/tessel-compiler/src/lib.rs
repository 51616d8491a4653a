//! Sharing recovery and environment lowering for Tessel.
//!
//! A [`Graph`][tessel_ast::Graph] says nothing about sharing
//! except through aliasing: the same node key used in several
//! places. [`Compiler`] recovers that sharing, binds each shared
//! node once at the innermost scope covering all of its uses and
//! emits [`tessel_ir`] terms with de Bruijn indexed variables.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(clippy::arithmetic_side_effects)]
#![warn(missing_docs)]

mod compile;
mod error;
pub mod identity;
mod layout;
mod lower;
pub mod occurrence;
pub mod scope;
mod stencil;
mod tests;

pub use compile::*;
pub use error::*;
pub use layout::{Layout, LayoutIter};
pub use stencil::*;
