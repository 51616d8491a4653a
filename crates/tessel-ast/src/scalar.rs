use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// A scalar constant.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// A signed integer.
    Int(i64),
    /// A double precision float.
    Float(f64),
    /// A boolean.
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// A primitive scalar operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PrimFun {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `-a`
    Neg,
    /// `|a|`
    Abs,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
    /// `a == b`
    Eq,
    /// `a < b`
    Lt,
    /// `a > b`
    Gt,
    /// `a && b`
    And,
    /// `a || b`
    Or,
    /// `!a`
    Not,
    /// `sin(a)`
    Sin,
    /// `cos(a)`
    Cos,
    /// `sqrt(a)`
    Sqrt,
}

impl PrimFun {
    /// The number of arguments the primitive takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Neg | Self::Abs | Self::Not | Self::Sin | Self::Cos | Self::Sqrt => 1,
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Min
            | Self::Max
            | Self::Eq
            | Self::Lt
            | Self::Gt
            | Self::And
            | Self::Or => 2,
        }
    }
}
