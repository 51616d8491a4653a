use std::{fmt, rc::Rc};

use serde_derive::{Deserialize, Serialize};
use tessel_ast::{Array, Boundary, PrimFun, Scalar};

/// A de Bruijn index: the number of enclosing binders of the
/// same environment between a use and its binding.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Idx(pub usize);

impl fmt::Display for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A lowered array-level term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OpenAcc {
    /// Computes the first term once and makes it the innermost
    /// array variable of the second.
    Alet(Box<OpenAcc>, Box<OpenAcc>),
    /// An array variable.
    Avar(Idx),
    /// A host array.
    Use(Rc<Array>),
    /// A singleton array.
    Unit(OpenExp),
    /// `generate(shape, f)`
    Generate(OpenExp, OpenFun),
    /// `reshape(shape, xs)`
    Reshape(OpenExp, Box<OpenAcc>),
    /// `map(f, xs)`
    Map(OpenFun, Box<OpenAcc>),
    /// `zip_with(f, xs, ys)`
    ZipWith(OpenFun, Box<OpenAcc>, Box<OpenAcc>),
    /// `fold(f, z, xs)`
    Fold(OpenFun, OpenExp, Box<OpenAcc>),
    /// `fold1(f, xs)`
    Fold1(OpenFun, Box<OpenAcc>),
    /// `fold_seg(f, z, xs, segs)`
    FoldSeg(OpenFun, OpenExp, Box<OpenAcc>, Box<OpenAcc>),
    /// `scanl(f, z, xs)`
    Scanl(OpenFun, OpenExp, Box<OpenAcc>),
    /// `scanl_total(f, z, xs)`, a pair of arrays.
    ScanlTotal(OpenFun, OpenExp, Box<OpenAcc>),
    /// The first array of a pair.
    Fst(Box<OpenAcc>),
    /// The second array of a pair.
    Snd(Box<OpenAcc>),
    /// `permute(combine, defaults, ix, src)`
    Permute(OpenFun, Box<OpenAcc>, OpenFun, Box<OpenAcc>),
    /// `backpermute(shape, ix, src)`
    Backpermute(OpenExp, OpenFun, Box<OpenAcc>),
    /// `stencil(f, boundary, xs)`; `f` takes the whole
    /// neighbourhood as one tuple.
    Stencil(OpenFun, Boundary, Box<OpenAcc>),
}

/// A lowered function: one [`OpenFun::Lam`] per parameter
/// around the body. Each `Lam` binds one scalar variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OpenFun {
    /// Binds one parameter.
    Lam(Box<OpenFun>),
    /// The body.
    Body(OpenExp),
}

impl OpenFun {
    /// Wraps `body` in `arity` binders.
    pub fn new(arity: usize, body: OpenExp) -> Self {
        (0..arity).fold(Self::Body(body), |f, _| Self::Lam(Box::new(f)))
    }

    /// The number of parameters.
    pub fn arity(&self) -> usize {
        let mut n = 0usize;
        let mut f = self;
        while let Self::Lam(inner) = f {
            n = n.saturating_add(1);
            f = inner;
        }
        n
    }

    /// The body under all binders.
    pub fn body(&self) -> &OpenExp {
        match self {
            Self::Lam(inner) => inner.body(),
            Self::Body(e) => e,
        }
    }
}

/// A lowered scalar-level term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OpenExp {
    /// Computes the first term once and makes it the innermost
    /// scalar variable of the second.
    Let(Box<OpenExp>, Box<OpenExp>),
    /// A scalar variable.
    Var(Idx),
    /// A constant.
    Const(Scalar),
    /// A tuple.
    Tuple(Vec<OpenExp>),
    /// Projects a tuple component.
    Prj(usize, Box<OpenExp>),
    /// A conditional.
    Cond(Box<OpenExp>, Box<OpenExp>, Box<OpenExp>),
    /// Applies a primitive.
    PrimApp(PrimFun, Vec<OpenExp>),
    /// Reads an element of an array term.
    Index(Box<OpenAcc>, Box<OpenExp>),
    /// The shape of an array term.
    Shape(Box<OpenAcc>),
    /// The number of elements of an array term.
    Size(Box<OpenAcc>),
}
