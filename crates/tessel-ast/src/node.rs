use std::{fmt, rc::Rc};

use serde_derive::{Deserialize, Serialize};

use crate::{
    arena::new_key_type,
    scalar::{PrimFun, Scalar},
};

new_key_type! {
    /// Identifies an array-level node in a [`Graph`][crate::Graph].
    pub struct AccId;
}

new_key_type! {
    /// Identifies a scalar-level node in a [`Graph`][crate::Graph].
    pub struct ExpId;
}

/// The identity of any surface node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// An array-level node.
    Acc(AccId),
    /// A scalar-level node.
    Exp(ExpId),
}

impl From<AccId> for NodeId {
    fn from(id: AccId) -> Self {
        Self::Acc(id)
    }
}

impl From<ExpId> for NodeId {
    fn from(id: ExpId) -> Self {
        Self::Exp(id)
    }
}

impl fmt::Display for AccId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

impl fmt::Display for ExpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// An array-level operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Acc {
    /// Embeds a host array.
    Use(Rc<Array>),
    /// A singleton array holding a scalar.
    Unit(ExpId),
    /// Builds an array of the given shape from an index function.
    Generate(ExpId, Fun),
    /// Changes the shape of an array without moving elements.
    Reshape(ExpId, AccId),
    /// Applies a unary function to every element.
    Map(Fun, AccId),
    /// Combines two arrays element-wise with a binary function.
    ZipWith(Fun, AccId, AccId),
    /// Reduces the innermost dimension with an initial value.
    Fold(Fun, ExpId, AccId),
    /// Reduces the innermost dimension of a non-empty array.
    Fold1(Fun, AccId),
    /// Segmented reduction: values then segment descriptor.
    FoldSeg(Fun, ExpId, AccId, AccId),
    /// Left-to-right prescan with an initial value.
    Scanl(Fun, ExpId, AccId),
    /// Prescan that also yields the total; a pair of arrays.
    ///
    /// Its results are read with [`Acc::Fst`] and [`Acc::Snd`].
    ScanlTotal(Fun, ExpId, AccId),
    /// The first array of a multi-result operation.
    Fst(AccId),
    /// The second array of a multi-result operation.
    Snd(AccId),
    /// Forward permutation: combination function, default
    /// values, index mapping, source values.
    Permute(Fun, AccId, Fun, AccId),
    /// Backward permutation: result shape, index mapping,
    /// source values.
    Backpermute(ExpId, Fun, AccId),
    /// Applies a function to the neighbourhood of every element.
    Stencil(StencilFun, Boundary, AccId),
}

impl Acc {
    /// The array operands, in operand order.
    pub fn arrays(&self) -> Vec<AccId> {
        match self {
            Self::Use(_) | Self::Unit(_) | Self::Generate(..) => Vec::new(),
            Self::Reshape(_, a)
            | Self::Map(_, a)
            | Self::Fold(_, _, a)
            | Self::Fold1(_, a)
            | Self::Scanl(_, _, a)
            | Self::ScanlTotal(_, _, a)
            | Self::Fst(a)
            | Self::Snd(a)
            | Self::Backpermute(_, _, a)
            | Self::Stencil(_, _, a) => vec![*a],
            Self::ZipWith(_, a, b) | Self::FoldSeg(_, _, a, b) | Self::Permute(_, a, _, b) => {
                vec![*a, *b]
            }
        }
    }

    /// The embedded scalar code, in operand order: scalar
    /// arguments and the bodies of closures.
    ///
    /// Each entry is the root of an independent scalar term.
    pub fn scalar_roots(&self) -> Vec<ExpId> {
        match self {
            Self::Use(_) | Self::Fst(_) | Self::Snd(_) => Vec::new(),
            Self::Unit(e) | Self::Reshape(e, _) => vec![*e],
            Self::Generate(e, f) | Self::Backpermute(e, f, _) => vec![*e, f.body],
            Self::Map(f, _) | Self::ZipWith(f, _, _) | Self::Fold1(f, _) => vec![f.body],
            Self::Fold(f, e, _)
            | Self::FoldSeg(f, e, _, _)
            | Self::Scanl(f, e, _)
            | Self::ScanlTotal(f, e, _) => vec![f.body, *e],
            Self::Permute(f, _, g, _) => vec![f.body, g.body],
            Self::Stencil(f, _, _) => vec![f.body],
        }
    }
}

/// A host closure, applied once to fresh [`Exp::Param`]
/// placeholders to obtain its body.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Fun {
    /// The parameter placeholders, outermost first.
    pub params: Box<[ExpId]>,
    /// The body.
    pub body: ExpId,
}

impl Fun {
    /// The number of parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A stencil closure.
///
/// The closure sees one placeholder per neighbour; after
/// lowering it takes a single tuple argument and each
/// neighbour is a projection out of it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StencilFun {
    /// The shape of the neighbourhood.
    pub neighbourhood: Neighbourhood,
    /// Placeholder for the whole neighbourhood tuple.
    pub arg: ExpId,
    /// Placeholders for each neighbour, row-major.
    pub neighbours: Box<[ExpId]>,
    /// The body.
    pub body: ExpId,
}

/// How a stencil reads outside the array.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Boundary {
    /// Use the nearest element.
    Clamp,
    /// Reflect at the edge.
    Mirror,
    /// Wrap around.
    Wrap,
    /// Use a constant.
    Constant(Scalar),
}

/// A stencil neighbourhood template: an odd extent per
/// dimension, outermost first.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Neighbourhood {
    extents: Vec<usize>,
}

/// Returned by [`Neighbourhood::new`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum InvalidNeighbourhood {
    /// The template has no dimensions.
    #[error("stencil neighbourhood must have at least one dimension")]
    Empty,
    /// An extent is not odd, so the neighbourhood has no centre.
    #[error("stencil extent {0} is not odd")]
    EvenExtent(usize),
    /// The neighbourhood has too many elements.
    #[error("stencil neighbourhood is too large")]
    TooLarge,
}

impl Neighbourhood {
    /// Creates a neighbourhood template.
    pub fn new(extents: impl Into<Vec<usize>>) -> Result<Self, InvalidNeighbourhood> {
        let extents = extents.into();
        if extents.is_empty() {
            return Err(InvalidNeighbourhood::Empty);
        }
        if let Some(&e) = extents.iter().find(|&&e| e % 2 == 0) {
            return Err(InvalidNeighbourhood::EvenExtent(e));
        }
        extents
            .iter()
            .try_fold(1usize, |acc, &e| acc.checked_mul(e))
            .ok_or(InvalidNeighbourhood::TooLarge)?;
        Ok(Self { extents })
    }

    /// The dimensionality.
    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    /// The extent of each dimension, outermost first.
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// The number of neighbours, including the centre.
    pub fn len(&self) -> usize {
        self.extents.iter().product()
    }

    /// Always false; a neighbourhood contains its centre.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A host array embedded with [`Acc::Use`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<Scalar>,
}

/// Returned by [`Array::new`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("array shape holds {expected} elements but {got} were given")]
pub struct ShapeMismatch {
    /// The number of elements the shape describes.
    pub expected: usize,
    /// The number of elements provided.
    pub got: usize,
}

impl Array {
    /// Creates an array, checking that `data` fills `shape`.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<Scalar>) -> Result<Self, ShapeMismatch> {
        let shape = shape.into();
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &e| acc.checked_mul(e))
            .ok_or(ShapeMismatch {
                expected: usize::MAX,
                got: data.len(),
            })?;
        if expected != data.len() {
            return Err(ShapeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// A one-dimensional array.
    pub fn vector(data: Vec<Scalar>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// The extent of each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The elements, row-major.
    pub fn data(&self) -> &[Scalar] {
        &self.data
    }
}

/// A scalar-level operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Exp {
    /// A closure parameter placeholder.
    Param,
    /// A constant.
    Const(Scalar),
    /// A tuple.
    Tuple(Box<[ExpId]>),
    /// Projects a tuple component.
    Prj(usize, ExpId),
    /// `if c { t } else { e }`
    Cond(ExpId, ExpId, ExpId),
    /// Applies a primitive.
    PrimApp(PrimFun, Box<[ExpId]>),
    /// Reads an array element.
    Index(AccId, ExpId),
    /// The shape of an array.
    Shape(AccId),
    /// The number of elements of an array.
    Size(AccId),
}

impl Exp {
    /// The scalar operands, in operand order.
    pub fn children(&self) -> Vec<ExpId> {
        match self {
            Self::Param | Self::Const(_) | Self::Shape(_) | Self::Size(_) => Vec::new(),
            Self::Tuple(es) | Self::PrimApp(_, es) => es.to_vec(),
            Self::Prj(_, e) | Self::Index(_, e) => vec![*e],
            Self::Cond(c, t, e) => vec![*c, *t, *e],
        }
    }

    /// The array this node reads, if any.
    pub fn array(&self) -> Option<AccId> {
        match self {
            Self::Index(a, _) | Self::Shape(a) | Self::Size(a) => Some(*a),
            _ => None,
        }
    }

    /// Reports whether the node is a leaf that is never worth
    /// binding: a placeholder or a constant.
    pub fn is_trivial(&self) -> bool {
        matches!(self, Self::Param | Self::Const(_))
    }
}
