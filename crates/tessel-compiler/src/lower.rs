use std::{collections::BTreeMap, rc::Rc};

use buggy::BugExt as _;
use indexmap::IndexMap;
use tessel_ast::{Acc, AccId, Exp, ExpId, Fun, Graph, StencilFun};
use tessel_ir::{OpenAcc, OpenExp, OpenFun};
use tracing::trace;

use crate::{
    error::LowerError,
    identity::ExpView,
    layout::Layout,
    scope::{Annotated, resolve},
    stencil::{Projection, StencilShapes},
};

type Operands = IndexMap<AccId, Rc<Annotated<AccId>>>;

/// The array operation whose scalar code is being lowered.
#[derive(Copy, Clone)]
struct Site<'s> {
    aenv: &'s Layout<AccId>,
    /// The resolved array operands of the operation, including
    /// those referenced from its scalar code.
    operands: &'s Operands,
    /// In a stencil body, the tuple parameter and the path to
    /// each neighbour.
    stencil: Option<(ExpId, &'s BTreeMap<ExpId, Projection>)>,
}

impl Site<'_> {
    fn array(&self, lower: &Lower<'_>, id: AccId) -> Result<OpenAcc, LowerError> {
        let node = self
            .operands
            .get(&id)
            .assume("array operand must be annotated")?;
        lower.acc(node, self.aenv)
    }
}

/// Turns resolved trees into depth-indexed terms.
pub(crate) struct Lower<'a> {
    pub(crate) graph: &'a Graph,
    pub(crate) stencils: &'a dyn StencilShapes,
    pub(crate) share_exp: bool,
}

impl Lower<'_> {
    /// Lowers an array-level tree under the array bindings in
    /// `aenv`.
    pub(crate) fn acc(
        &self,
        node: &Annotated<AccId>,
        aenv: &Layout<AccId>,
    ) -> Result<OpenAcc, LowerError> {
        match node {
            Annotated::Variable(id) => Ok(OpenAcc::Avar(aenv.lookup(*id)?)),
            Annotated::Binding { id, bound, body } => {
                trace!(%id, depth = aenv.depth(), "lowering array binding");
                let bound = self.acc(bound, aenv)?;
                let body = self.acc(body, &aenv.push(*id))?;
                Ok(OpenAcc::Alet(Box::new(bound), Box::new(body)))
            }
            Annotated::Plain { id, children } => self.operation(*id, children, aenv),
        }
    }

    fn operation(
        &self,
        id: AccId,
        operands: &Operands,
        aenv: &Layout<AccId>,
    ) -> Result<OpenAcc, LowerError> {
        let site = Site {
            aenv,
            operands,
            stencil: None,
        };
        let arr = |k: AccId| site.array(self, k).map(Box::new);
        let exp = |e: ExpId| self.scalar(e, &Layout::new(), site);
        let fun = |f: &Fun| self.fun(f, site);

        let acc = self
            .graph
            .acc(id)
            .assume("array node must belong to the graph")?;
        let lowered = match acc {
            Acc::Use(a) => OpenAcc::Use(Rc::clone(a)),
            Acc::Unit(e) => OpenAcc::Unit(exp(*e)?),
            Acc::Generate(sh, f) => OpenAcc::Generate(exp(*sh)?, fun(f)?),
            Acc::Reshape(sh, xs) => OpenAcc::Reshape(exp(*sh)?, arr(*xs)?),
            Acc::Map(f, xs) => OpenAcc::Map(fun(f)?, arr(*xs)?),
            Acc::ZipWith(f, xs, ys) => OpenAcc::ZipWith(fun(f)?, arr(*xs)?, arr(*ys)?),
            Acc::Fold(f, z, xs) => OpenAcc::Fold(fun(f)?, exp(*z)?, arr(*xs)?),
            Acc::Fold1(f, xs) => OpenAcc::Fold1(fun(f)?, arr(*xs)?),
            Acc::FoldSeg(f, z, xs, segs) => {
                OpenAcc::FoldSeg(fun(f)?, exp(*z)?, arr(*xs)?, arr(*segs)?)
            }
            Acc::Scanl(f, z, xs) => OpenAcc::Scanl(fun(f)?, exp(*z)?, arr(*xs)?),
            Acc::ScanlTotal(f, z, xs) => OpenAcc::ScanlTotal(fun(f)?, exp(*z)?, arr(*xs)?),
            Acc::Fst(xs) => OpenAcc::Fst(arr(*xs)?),
            Acc::Snd(xs) => OpenAcc::Snd(arr(*xs)?),
            Acc::Permute(f, defaults, ix, src) => {
                OpenAcc::Permute(fun(f)?, arr(*defaults)?, fun(ix)?, arr(*src)?)
            }
            Acc::Backpermute(sh, ix, src) => {
                OpenAcc::Backpermute(exp(*sh)?, fun(ix)?, arr(*src)?)
            }
            Acc::Stencil(f, boundary, xs) => {
                OpenAcc::Stencil(self.stencil(f, site)?, *boundary, arr(*xs)?)
            }
        };
        Ok(lowered)
    }

    /// Lowers a closure: one scalar binder per parameter,
    /// outermost first.
    fn fun(&self, f: &Fun, site: Site<'_>) -> Result<OpenFun, LowerError> {
        let senv = f
            .params
            .iter()
            .fold(Layout::new(), |env, &p| env.push(p));
        let body = self.scalar(f.body, &senv, site)?;
        Ok(OpenFun::new(f.arity(), body))
    }

    /// Lowers a stencil closure to a function of one tuple.
    fn stencil(&self, f: &StencilFun, site: Site<'_>) -> Result<OpenFun, LowerError> {
        let nb = &f.neighbourhood;
        let paths = self.stencils.projections(nb.rank(), nb);
        if paths.len() != f.neighbours.len() {
            return Err(LowerError::StencilShape {
                expected: f.neighbours.len(),
                got: paths.len(),
            });
        }
        let paths = f
            .neighbours
            .iter()
            .copied()
            .zip(paths)
            .collect::<BTreeMap<_, _>>();
        let site = Site {
            aenv: site.aenv,
            operands: site.operands,
            stencil: Some((f.arg, &paths)),
        };
        let body = self.scalar(f.body, &Layout::new().push(f.arg), site)?;
        Ok(OpenFun::new(1, body))
    }

    /// Resolves the scalar term rooted at `root` on its own and
    /// lowers it under `senv`.
    fn scalar(
        &self,
        root: ExpId,
        senv: &Layout<ExpId>,
        site: Site<'_>,
    ) -> Result<OpenExp, LowerError> {
        let node = resolve(&ExpView::new(self.graph, self.share_exp), root)?;
        self.exp(&node, senv, site)
    }

    fn exp(
        &self,
        node: &Annotated<ExpId>,
        senv: &Layout<ExpId>,
        site: Site<'_>,
    ) -> Result<OpenExp, LowerError> {
        let (id, children) = match node {
            Annotated::Variable(id) => return Ok(OpenExp::Var(senv.lookup(*id)?)),
            Annotated::Binding { id, bound, body } => {
                trace!(%id, depth = senv.depth(), "lowering scalar binding");
                let bound = self.exp(bound, senv, site)?;
                let body = self.exp(body, &senv.push(*id), site)?;
                return Ok(OpenExp::Let(Box::new(bound), Box::new(body)));
            }
            Annotated::Plain { id, children } => (*id, children),
        };

        let child = |e: ExpId| -> Result<OpenExp, LowerError> {
            let node = children
                .get(&e)
                .assume("scalar operand must be annotated")?;
            self.exp(node, senv, site)
        };
        let all = |es: &[ExpId]| es.iter().map(|&e| child(e)).collect::<Result<Vec<_>, _>>();

        let exp = self
            .graph
            .exp(id)
            .assume("scalar node must belong to the graph")?;
        let lowered = match exp {
            Exp::Param => self.param(id, senv, site)?,
            Exp::Const(c) => OpenExp::Const(*c),
            Exp::Tuple(es) => OpenExp::Tuple(all(&es[..])?),
            Exp::Prj(i, e) => OpenExp::Prj(*i, Box::new(child(*e)?)),
            Exp::Cond(c, t, e) => OpenExp::Cond(
                Box::new(child(*c)?),
                Box::new(child(*t)?),
                Box::new(child(*e)?),
            ),
            Exp::PrimApp(f, es) => OpenExp::PrimApp(*f, all(&es[..])?),
            Exp::Index(xs, ix) => {
                OpenExp::Index(Box::new(site.array(self, *xs)?), Box::new(child(*ix)?))
            }
            Exp::Shape(xs) => OpenExp::Shape(Box::new(site.array(self, *xs)?)),
            Exp::Size(xs) => OpenExp::Size(Box::new(site.array(self, *xs)?)),
        };
        Ok(lowered)
    }

    /// A placeholder is either a closure parameter or, in a
    /// stencil body, a neighbour projected out of the tuple
    /// parameter.
    fn param(
        &self,
        id: ExpId,
        senv: &Layout<ExpId>,
        site: Site<'_>,
    ) -> Result<OpenExp, LowerError> {
        if let Some((arg, paths)) = site.stencil {
            if let Some(path) = paths.get(&id) {
                let base = OpenExp::Var(senv.lookup(arg)?);
                return Ok(path
                    .iter()
                    .fold(base, |e, &i| OpenExp::Prj(i, Box::new(e))));
            }
        }
        Ok(OpenExp::Var(senv.lookup(id)?))
    }
}
