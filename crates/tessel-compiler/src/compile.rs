use std::rc::Rc;

use tessel_ast::{AccId, Graph};
use tessel_ir::{OpenAcc, check_scopes};
use tracing::debug;

use crate::{
    error::LowerError,
    identity::AccView,
    layout::Layout,
    lower::Lower,
    scope::{Annotated, resolve},
    stencil::{NestedTuples, StencilShapes},
};

/// Lowers programs built in a [`Graph`].
///
/// ```
/// use tessel_ast::{Array, Graph};
/// use tessel_compiler::Compiler;
/// use tessel_ir::OpenAcc;
///
/// let mut g = Graph::new();
/// let xs = g.use_array(Array::vector(vec![1i64.into(), 2i64.into()]));
/// let ys = g.map(|g, x| g.mul(x, x), xs);
/// let zs = g.zip_with(|g, a, b| g.add(a, b), ys, ys);
///
/// let lowered = Compiler::new(&g).lower(zs).unwrap();
/// assert!(matches!(lowered, OpenAcc::Alet(..)));
/// ```
pub struct Compiler<'a> {
    graph: &'a Graph,
    stencils: &'a dyn StencilShapes,
    recover_acc_sharing: bool,
    recover_exp_sharing: bool,
    is_debug: bool,
}

impl<'a> Compiler<'a> {
    /// Creates a new instance of [`Compiler`] over `graph`.
    pub fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            stencils: &NestedTuples,
            recover_acc_sharing: true,
            recover_exp_sharing: true,
            is_debug: cfg!(debug_assertions),
        }
    }

    /// Sets the stencil resolver.
    #[must_use]
    pub fn stencils(mut self, stencils: &'a dyn StencilShapes) -> Self {
        self.stencils = stencils;
        self
    }

    /// Enables or disables sharing recovery for array-level
    /// nodes. When disabled, every shared array is recomputed at
    /// each use.
    #[must_use]
    pub fn recover_acc_sharing(mut self, flag: bool) -> Self {
        self.recover_acc_sharing = flag;
        self
    }

    /// Enables or disables sharing recovery inside scalar code.
    #[must_use]
    pub fn recover_exp_sharing(mut self, flag: bool) -> Self {
        self.recover_exp_sharing = flag;
        self
    }

    /// Enables or disables debug mode, which checks the scoping
    /// of every lowered program.
    #[must_use]
    pub fn debug(mut self, is_debug: bool) -> Self {
        self.is_debug = is_debug;
        self
    }

    /// Recovers the array-level sharing of the program rooted at
    /// `root`.
    pub fn annotate(&self, root: AccId) -> Result<Rc<Annotated<AccId>>, LowerError> {
        let view = AccView::new(self.graph, self.recover_acc_sharing);
        Ok(resolve(&view, root)?)
    }

    /// Lowers the program rooted at `root`.
    pub fn lower(&self, root: AccId) -> Result<OpenAcc, LowerError> {
        let annotated = self.annotate(root)?;
        let lower = Lower {
            graph: self.graph,
            stencils: self.stencils,
            share_exp: self.recover_exp_sharing,
        };
        let acc = lower.acc(&annotated, &Layout::new())?;
        if self.is_debug {
            check_scopes(&acc)?;
        }
        debug!(%root, "lowered program");
        Ok(acc)
    }
}
