use buggy::Bug;
use tessel_ir::IndexOutOfScope;

/// Errors that can occur while lowering a program.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum LowerError {
    /// The stencil resolver did not return one projection per
    /// neighbour.
    #[error("stencil resolver returned {got} projections for {expected} neighbours")]
    StencilShape {
        /// The number of neighbours.
        expected: usize,
        /// The number of projections returned.
        got: usize,
    },
    /// The lowered program failed its scope check.
    #[error(transparent)]
    IndexOutOfScope(#[from] IndexOutOfScope),
    /// An implementation bug
    #[error("bug: {0}")]
    Bug(#[from] Bug),
}
