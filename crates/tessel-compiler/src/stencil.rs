use tessel_ast::Neighbourhood;

/// A path of tuple projections, outermost first.
pub type Projection = Vec<usize>;

/// Decides how a stencil's neighbourhood is laid out as the
/// single tuple argument of the lowered stencil function.
pub trait StencilShapes {
    /// Returns one projection path per neighbour, in row-major
    /// neighbour order, for a stencil over an array of rank
    /// `rank`.
    fn projections(&self, rank: usize, neighbourhood: &Neighbourhood) -> Vec<Projection>;
}

/// Lays a neighbourhood out as nested tuples with the outermost
/// dimension outermost, so the neighbour at offset `(i, j)` of a
/// 2-D stencil is `prj j (prj i arg)`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NestedTuples;

impl StencilShapes for NestedTuples {
    fn projections(&self, _rank: usize, neighbourhood: &Neighbourhood) -> Vec<Projection> {
        let extents = neighbourhood.extents();
        let mut digits = vec![0usize; extents.len()];
        let mut out = Vec::with_capacity(neighbourhood.len());
        for _ in 0..neighbourhood.len() {
            out.push(digits.clone());
            for (d, &e) in digits.iter_mut().zip(extents).rev() {
                *d = d.saturating_add(1);
                if *d < e {
                    break;
                }
                *d = 0;
            }
        }
        out
    }
}
