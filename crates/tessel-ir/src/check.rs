use std::fmt;

use crate::ir::{Idx, OpenAcc, OpenExp, OpenFun};

/// Which environment a variable lives in.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EnvKind {
    /// Array variables, bound by [`OpenAcc::Alet`].
    Array,
    /// Scalar variables, bound by [`OpenExp::Let`] and
    /// [`OpenFun::Lam`].
    Scalar,
}

impl fmt::Display for EnvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => f.write_str("array"),
            Self::Scalar => f.write_str("scalar"),
        }
    }
}

/// A variable refers past the outermost binder of its
/// environment.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{env} variable {index} is out of scope at depth {depth}")]
pub struct IndexOutOfScope {
    /// The environment of the variable.
    pub env: EnvKind,
    /// The offending index.
    pub index: Idx,
    /// The number of binders in scope at the use site.
    pub depth: usize,
}

/// Checks that every variable in `acc` refers to a binder in
/// scope, starting from empty environments.
///
/// Each embedded scalar term starts from an empty scalar
/// environment; array terms inside scalar code see the array
/// environment of the enclosing array operation.
pub fn check_scopes(acc: &OpenAcc) -> Result<(), IndexOutOfScope> {
    check_acc(acc, 0)
}

fn var(env: EnvKind, index: Idx, depth: usize) -> Result<(), IndexOutOfScope> {
    if index.0 < depth {
        Ok(())
    } else {
        Err(IndexOutOfScope { env, index, depth })
    }
}

fn check_acc(acc: &OpenAcc, depth: usize) -> Result<(), IndexOutOfScope> {
    match acc {
        OpenAcc::Alet(bound, body) => {
            check_acc(bound, depth)?;
            check_acc(body, depth.saturating_add(1))
        }
        OpenAcc::Avar(idx) => var(EnvKind::Array, *idx, depth),
        OpenAcc::Use(_) => Ok(()),
        OpenAcc::Unit(e) => check_exp(e, depth, 0),
        OpenAcc::Generate(sh, f) => {
            check_exp(sh, depth, 0)?;
            check_fun(f, depth, 0)
        }
        OpenAcc::Reshape(sh, xs) => {
            check_exp(sh, depth, 0)?;
            check_acc(xs, depth)
        }
        OpenAcc::Map(f, xs) | OpenAcc::Fold1(f, xs) | OpenAcc::Stencil(f, _, xs) => {
            check_fun(f, depth, 0)?;
            check_acc(xs, depth)
        }
        OpenAcc::ZipWith(f, xs, ys) => {
            check_fun(f, depth, 0)?;
            check_acc(xs, depth)?;
            check_acc(ys, depth)
        }
        OpenAcc::Fold(f, z, xs) | OpenAcc::Scanl(f, z, xs) | OpenAcc::ScanlTotal(f, z, xs) => {
            check_fun(f, depth, 0)?;
            check_exp(z, depth, 0)?;
            check_acc(xs, depth)
        }
        OpenAcc::FoldSeg(f, z, xs, segs) => {
            check_fun(f, depth, 0)?;
            check_exp(z, depth, 0)?;
            check_acc(xs, depth)?;
            check_acc(segs, depth)
        }
        OpenAcc::Fst(xs) | OpenAcc::Snd(xs) => check_acc(xs, depth),
        OpenAcc::Permute(f, defaults, ix, src) => {
            check_fun(f, depth, 0)?;
            check_acc(defaults, depth)?;
            check_fun(ix, depth, 0)?;
            check_acc(src, depth)
        }
        OpenAcc::Backpermute(sh, ix, src) => {
            check_exp(sh, depth, 0)?;
            check_fun(ix, depth, 0)?;
            check_acc(src, depth)
        }
    }
}

fn check_fun(f: &OpenFun, adepth: usize, sdepth: usize) -> Result<(), IndexOutOfScope> {
    match f {
        OpenFun::Lam(inner) => check_fun(inner, adepth, sdepth.saturating_add(1)),
        OpenFun::Body(e) => check_exp(e, adepth, sdepth),
    }
}

fn check_exp(e: &OpenExp, adepth: usize, sdepth: usize) -> Result<(), IndexOutOfScope> {
    match e {
        OpenExp::Let(bound, body) => {
            check_exp(bound, adepth, sdepth)?;
            check_exp(body, adepth, sdepth.saturating_add(1))
        }
        OpenExp::Var(idx) => var(EnvKind::Scalar, *idx, sdepth),
        OpenExp::Const(_) => Ok(()),
        OpenExp::Tuple(es) | OpenExp::PrimApp(_, es) => es
            .iter()
            .try_for_each(|e| check_exp(e, adepth, sdepth)),
        OpenExp::Prj(_, e) => check_exp(e, adepth, sdepth),
        OpenExp::Cond(c, t, e) => {
            check_exp(c, adepth, sdepth)?;
            check_exp(t, adepth, sdepth)?;
            check_exp(e, adepth, sdepth)
        }
        OpenExp::Index(xs, ix) => {
            check_acc(xs, adepth)?;
            check_exp(ix, adepth, sdepth)
        }
        OpenExp::Shape(xs) | OpenExp::Size(xs) => check_acc(xs, adepth),
    }
}
