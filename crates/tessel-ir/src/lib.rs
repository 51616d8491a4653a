//! The lowered form of a Tessel program.
//!
//! Every binding is explicit ([`OpenAcc::Alet`], [`OpenExp::Let`])
//! and every variable is a de Bruijn index ([`Idx`]) counting
//! binders outward from the use site. Array and scalar binders
//! live in separate environments.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

mod check;
mod ir;

pub use check::{EnvKind, IndexOutOfScope, check_scopes};
pub use ir::{Idx, OpenAcc, OpenExp, OpenFun};
pub use tessel_ast::{Array, Boundary, PrimFun, Scalar};
